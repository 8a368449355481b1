use super::Options;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use idgen_core::config::{Config, WarnLevel};
use idgen_core::Family;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Check the configuration for problems
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, opts: &Options) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .idgen/config.yaml")?;
    match subcmd {
        ConfigSubcommand::Show => show(&config, opts),
        ConfigSubcommand::Validate => validate(&config, opts),
    }
}

fn show(config: &Config, opts: &Options) -> anyhow::Result<()> {
    if opts.json {
        return print_json(config);
    }
    println!("lock timeout:   {}ms", config.lock.timeout_ms);
    println!("poll interval:  {}ms", config.lock.poll_interval_ms);
    println!(
        "feature store:  {}",
        serde_yaml::to_string(&config.feature_store)?.trim()
    );
    println!();
    print_table(
        &["FAMILY", "PREFIX", "ARTIFACT DIR", "RECURSIVE"],
        Family::all()
            .iter()
            .map(|&f| {
                let fc = config.family(f);
                vec![
                    f.to_string(),
                    f.prefix().to_string(),
                    fc.artifact_dir.display().to_string(),
                    fc.recursive.to_string(),
                ]
            })
            .collect(),
    );
    Ok(())
}

fn validate(config: &Config, opts: &Options) -> anyhow::Result<()> {
    let warnings = config.validate();
    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();

    if opts.json {
        print_json(&serde_json::json!({ "warnings": warnings, "errors": errors }))?;
    } else if warnings.is_empty() {
        println!("Config OK");
    } else {
        for w in &warnings {
            let tag = match w.level {
                WarnLevel::Error => "error",
                WarnLevel::Warning => "warning",
            };
            println!("{tag}: {}", w.message);
        }
    }

    if errors > 0 {
        anyhow::bail!("{errors} configuration error(s)");
    }
    Ok(())
}
