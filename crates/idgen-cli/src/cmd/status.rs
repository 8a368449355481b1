use super::{open_generator, Options};
use crate::output::{print_json, print_table};
use anyhow::Context;
use idgen_core::Family;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CounterRow {
    family: String,
    scope: Option<String>,
    current: u64,
    next: String,
}

pub fn run(root: &Path, opts: &Options) -> anyhow::Result<()> {
    let generator = open_generator(root, opts)?;
    let snapshot = generator.snapshot().context("failed to read counter store")?;

    let mut rows = Vec::new();
    for &family in Family::all() {
        let current = generator
            .current(family, None)
            .with_context(|| format!("failed to read {family} counter"))?;
        rows.push(CounterRow {
            family: family.to_string(),
            scope: None,
            current,
            next: next_or_dash(current, |n| family.format(n)),
        });
    }
    for (scope, &current) in &snapshot.service_counters {
        rows.push(CounterRow {
            family: Family::Task.to_string(),
            scope: Some(scope.clone()),
            current,
            next: next_or_dash(current, |n| Family::Task.format_scoped(scope, n)),
        });
    }

    if opts.json {
        print_json(&serde_json::json!({
            "counters": rows,
            "issued": snapshot.used_ids.len(),
            "last_updated": snapshot.last_updated,
        }))?;
        return Ok(());
    }

    print_table(
        &["FAMILY", "SCOPE", "CURRENT", "NEXT"],
        rows.into_iter()
            .map(|r| {
                vec![
                    r.family,
                    r.scope.unwrap_or_else(|| "-".to_string()),
                    r.current.to_string(),
                    r.next,
                ]
            })
            .collect(),
    );
    println!();
    println!("{} IDs issued", snapshot.used_ids.len());
    Ok(())
}

/// `-` when the counter cannot advance.
fn next_or_dash(current: u64, format: impl Fn(u64) -> String) -> String {
    current
        .checked_add(1)
        .map(format)
        .unwrap_or_else(|| "-".to_string())
}
