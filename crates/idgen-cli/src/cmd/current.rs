use super::{open_generator, Options};
use crate::output::print_json;
use anyhow::Context;
use idgen_core::Family;
use std::path::Path;

pub fn run(root: &Path, family: Family, scope: Option<&str>, opts: &Options) -> anyhow::Result<()> {
    let generator = open_generator(root, opts)?;
    let value = generator
        .current(family, scope)
        .with_context(|| format!("failed to read {family} counter"))?;

    if opts.json {
        print_json(&serde_json::json!({
            "family": family,
            "scope": scope,
            "current": value,
        }))?;
    } else {
        println!("{value}");
    }
    Ok(())
}
