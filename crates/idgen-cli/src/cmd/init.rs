use super::Options;
use crate::output::print_json;
use anyhow::Context;
use idgen_core::config::Config;
use idgen_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path, opts: &Options) -> anyhow::Result<()> {
    io::ensure_dir(&paths::idgen_dir(root)).context("failed to create .idgen/")?;

    let config_yaml = serde_yaml::to_string(&Config::default())?;
    let wrote_config = io::write_if_missing(&paths::config_path(root), config_yaml.as_bytes())
        .context("failed to write .idgen/config.yaml")?;
    io::ensure_gitignore_entry(root, paths::LOCK_GITIGNORE_ENTRY)
        .context("failed to update .gitignore")?;

    if opts.json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config_created": wrote_config,
        }))?;
    } else {
        println!("Initialized .idgen in {}", root.display());
        if !wrote_config {
            println!("Kept existing {}", paths::CONFIG_FILE);
        }
    }
    Ok(())
}
