pub mod config;
pub mod current;
pub mod init;
pub mod next;
pub mod rebuild;
pub mod reset;
pub mod status;

use anyhow::Context;
use idgen_core::config::{Config, WarnLevel};
use idgen_core::IdGenerator;
use std::path::Path;
use std::time::Duration;

/// Global flags shared by every subcommand.
pub struct Options {
    pub json: bool,
    pub lock_timeout_ms: Option<u64>,
}

/// Load the project config, apply flag overrides, and build a generator.
pub fn open_generator(root: &Path, opts: &Options) -> anyhow::Result<IdGenerator> {
    let mut config = Config::load(root).context("failed to load .idgen/config.yaml")?;
    if let Some(ms) = opts.lock_timeout_ms {
        config = config.with_lock_timeout(Duration::from_millis(ms));
    }
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
        }
    }
    Ok(IdGenerator::with_config(root, config))
}
