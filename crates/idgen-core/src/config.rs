use crate::error::Result;
use crate::family::Family;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LockConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureStore
// ---------------------------------------------------------------------------

/// Which store issues feature IDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStore {
    /// Shared `ids.yaml` alongside every other family.
    #[default]
    Aggregate,
    /// Dedicated bare-integer `feature.counter` with its own lock.
    CounterFile,
}

// ---------------------------------------------------------------------------
// FamilyConfig
// ---------------------------------------------------------------------------

/// Where recovery looks for a family's existing artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub artifact_dir: PathBuf,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl FamilyConfig {
    pub fn default_for(family: Family) -> Self {
        let (dir, recursive) = match family {
            Family::Feature => (paths::SPECS_DIR, false),
            Family::Specification | Family::Plan | Family::Task => (paths::SPECS_DIR, true),
            Family::Decision => (paths::DECISIONS_DIR, true),
            Family::Pattern => (paths::PATTERNS_DIR, true),
            Family::Constraint => (paths::CONSTRAINTS_DIR, true),
            Family::Checkpoint => (paths::CHECKPOINTS_DIR, true),
        };
        Self {
            artifact_dir: PathBuf::from(dir),
            recursive,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub feature_store: FeatureStore,
    /// Per-family overrides; families not listed use [`FamilyConfig::default_for`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub families: BTreeMap<Family, FamilyConfig>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            lock: LockConfig::default(),
            feature_store: FeatureStore::default(),
            families: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `.idgen/config.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock.poll_interval_ms)
    }

    pub fn family(&self, family: Family) -> FamilyConfig {
        self.families
            .get(&family)
            .cloned()
            .unwrap_or_else(|| FamilyConfig::default_for(family))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.lock.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.lock.timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "lock.timeout_ms is 0: every contended lock attempt fails immediately"
                    .to_string(),
            });
        }
        if self.lock.poll_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "lock.poll_interval_ms is 0: waiting processes will spin".to_string(),
            });
        }
        if self.lock.timeout_ms > 0 && self.lock.poll_interval_ms > self.lock.timeout_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "lock.poll_interval_ms ({}) exceeds lock.timeout_ms ({})",
                    self.lock.poll_interval_ms, self.lock.timeout_ms
                ),
            });
        }
        for (family, fc) in &self.families {
            if fc.artifact_dir.is_absolute() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "families.{family}.artifact_dir is absolute ({}); recovery will not follow the project if it moves",
                        fc.artifact_dir.display()
                    ),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.lock_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
        assert_eq!(cfg.feature_store, FeatureStore::Aggregate);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".idgen")).unwrap();
        std::fs::write(
            dir.path().join(".idgen/config.yaml"),
            "lock:\n  timeout_ms: 250\nfamilies:\n  decision:\n    artifact_dir: docs/adr\n",
        )
        .unwrap();

        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.lock.timeout_ms, 250);
        assert_eq!(cfg.lock.poll_interval_ms, 100);
        let decision = cfg.family(Family::Decision);
        assert_eq!(decision.artifact_dir, PathBuf::from("docs/adr"));
        assert!(decision.recursive);
        assert_eq!(cfg.family(Family::Feature), FamilyConfig::default_for(Family::Feature));
    }

    #[test]
    fn config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default().with_lock_timeout(Duration::from_millis(1500));
        cfg.feature_store = FeatureStore::CounterFile;
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.lock.timeout_ms, 1500);
        assert_eq!(loaded.feature_store, FeatureStore::CounterFile);
    }

    #[test]
    fn validate_flags_bad_lock_settings() {
        let cfg = Config::default()
            .with_lock_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(200));
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);

        let cfg = Config::default().with_lock_timeout(Duration::ZERO);
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("timeout_ms is 0")));
    }
}
