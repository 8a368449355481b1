use super::{open_generator, Options};
use crate::output::print_json;
use anyhow::{bail, Context};
use idgen_core::Family;
use std::path::Path;

pub fn run(root: &Path, family: Option<Family>, yes: bool, opts: &Options) -> anyhow::Result<()> {
    let target = family.map_or_else(|| "all counters".to_string(), |f| format!("the {f} counter"));
    if !yes {
        bail!("refusing to reset {target} without --yes (issued IDs may be reissued)");
    }

    let generator = open_generator(root, opts)?;
    generator
        .reset(family)
        .with_context(|| format!("failed to reset {target}"))?;

    if opts.json {
        print_json(&serde_json::json!({ "reset": family.map(|f| f.as_str()).unwrap_or("all") }))?;
    } else {
        println!("Reset {target}");
    }
    Ok(())
}
