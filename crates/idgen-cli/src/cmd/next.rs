use super::{open_generator, Options};
use crate::output::print_json;
use anyhow::Context;
use idgen_core::Family;
use std::path::Path;

pub fn run(root: &Path, family: Family, scope: Option<&str>, opts: &Options) -> anyhow::Result<()> {
    let generator = open_generator(root, opts)?;
    let id = generator
        .next_id(family, scope)
        .with_context(|| format!("failed to issue {family} id"))?;

    if opts.json {
        print_json(&serde_json::json!({
            "family": family,
            "scope": scope,
            "id": id,
        }))?;
    } else {
        println!("{id}");
    }
    Ok(())
}
