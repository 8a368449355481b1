use super::{open_generator, Options};
use crate::output::print_json;
use anyhow::Context;
use idgen_core::Family;
use std::path::Path;

pub fn run(root: &Path, family: Family, opts: &Options) -> anyhow::Result<()> {
    let generator = open_generator(root, opts)?;
    let value = generator
        .rebuild(family)
        .with_context(|| format!("failed to rebuild {family} counter"))?;

    if opts.json {
        print_json(&serde_json::json!({ "family": family, "current": value }))?;
    } else {
        println!("{value}");
    }
    Ok(())
}
