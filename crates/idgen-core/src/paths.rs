use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const IDGEN_DIR: &str = ".idgen";

pub const CONFIG_FILE: &str = ".idgen/config.yaml";
pub const STATE_FILE: &str = ".idgen/ids.yaml";
pub const STATE_LOCK_FILE: &str = ".idgen/ids.lock";
pub const FEATURE_COUNTER_FILE: &str = ".idgen/feature.counter";
pub const FEATURE_COUNTER_LOCK_FILE: &str = ".idgen/feature.counter.lock";

pub const SPECS_DIR: &str = "specs";
pub const DECISIONS_DIR: &str = ".ai/decisions";
pub const PATTERNS_DIR: &str = ".ai/patterns";
pub const CONSTRAINTS_DIR: &str = ".ai/constraints";
pub const CHECKPOINTS_DIR: &str = ".ai/checkpoints";

/// Glob added to `.gitignore` by `idgen init`; lock files carry no data.
pub const LOCK_GITIGNORE_ENTRY: &str = ".idgen/*.lock";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn idgen_dir(root: &Path) -> PathBuf {
    root.join(IDGEN_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn state_lock_path(root: &Path) -> PathBuf {
    root.join(STATE_LOCK_FILE)
}

pub fn feature_counter_path(root: &Path) -> PathBuf {
    root.join(FEATURE_COUNTER_FILE)
}

pub fn feature_counter_lock_path(root: &Path) -> PathBuf {
    root.join(FEATURE_COUNTER_LOCK_FILE)
}

/// Resolve a configured artifact directory against the project root.
/// Absolute paths are used as-is.
pub fn artifact_dir(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
