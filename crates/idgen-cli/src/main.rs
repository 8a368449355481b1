mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use idgen_core::{Family, IdError};
use std::path::PathBuf;

/// Exit status for retry-worthy failures (EX_TEMPFAIL).
const EXIT_RETRYABLE: i32 = 75;

#[derive(Parser)]
#[command(
    name = "idgen",
    about = "Issue unique, sequential IDs for features, specs, plans, tasks, and decisions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .idgen/ or .git/)
    #[arg(long, global = true, env = "IDGEN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Give up waiting for the counter lock after this many milliseconds
    #[arg(long, global = true, env = "IDGEN_LOCK_TIMEOUT_MS")]
    lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .idgen/ with a default config
    Init,

    /// Issue the next ID for a family
    Next {
        family: Family,
        /// Service scope for task IDs (uppercase letters, e.g. AUTH)
        #[arg(long)]
        scope: Option<String>,
    },

    /// Show the last issued value without incrementing
    Current {
        family: Family,
        #[arg(long)]
        scope: Option<String>,
    },

    /// Re-derive a family's counter from artifacts on disk
    Rebuild { family: Family },

    /// Reset one family, or every counter (maintenance only)
    Reset {
        family: Option<Family>,
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show every counter and service scope
    Status,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let opts = cmd::Options {
        json: cli.json,
        lock_timeout_ms: cli.lock_timeout_ms,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, &opts),
        Commands::Next { family, scope } => cmd::next::run(&root, family, scope.as_deref(), &opts),
        Commands::Current { family, scope } => {
            cmd::current::run(&root, family, scope.as_deref(), &opts)
        }
        Commands::Rebuild { family } => cmd::rebuild::run(&root, family, &opts),
        Commands::Reset { family, yes } => cmd::reset::run(&root, family, yes, &opts),
        Commands::Status => cmd::status::run(&root, &opts),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, &opts),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        let retryable = e
            .downcast_ref::<IdError>()
            .is_some_and(IdError::is_retryable);
        std::process::exit(if retryable { EXIT_RETRYABLE } else { 1 });
    }
}
