use crate::error::Result;
use crate::family::{parse_scoped_task, Family};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const STATE_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Loaded
// ---------------------------------------------------------------------------

/// Outcome of reading a counter store.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Valid(T),
    /// Nothing on disk yet.
    Absent,
    /// Present but unparseable; carries the reason for logging.
    Corrupt(String),
}

impl<T> Loaded<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            Loaded::Valid(v) => Some(v),
            Loaded::Absent | Loaded::Corrupt(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// IdState
// ---------------------------------------------------------------------------

/// The aggregate persisted counter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub counters: BTreeMap<Family, u64>,
    #[serde(default)]
    pub service_counters: BTreeMap<String, u64>,
    #[serde(default)]
    pub used_ids: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> String {
    STATE_VERSION.to_string()
}

impl Default for IdState {
    fn default() -> Self {
        Self {
            version: default_version(),
            counters: BTreeMap::new(),
            service_counters: BTreeMap::new(),
            used_ids: BTreeSet::new(),
            last_updated: Utc::now(),
        }
    }
}

impl IdState {
    /// Current value of a family counter, or of a scoped task counter when
    /// `scope` is given. Missing entries read as zero.
    pub fn counter(&self, family: Family, scope: Option<&str>) -> u64 {
        match scope {
            Some(scope) => self.service_counters.get(scope).copied().unwrap_or(0),
            None => self.counters.get(&family).copied().unwrap_or(0),
        }
    }

    pub fn set_counter(&mut self, family: Family, scope: Option<&str>, value: u64) {
        match scope {
            Some(scope) => {
                self.service_counters.insert(scope.to_string(), value);
            }
            None => {
                self.counters.insert(family, value);
            }
        }
        self.touch();
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used_ids.contains(id)
    }

    /// Returns false if `id` was already present.
    pub fn mark_used(&mut self, id: impl Into<String>) -> bool {
        let inserted = self.used_ids.insert(id.into());
        self.touch();
        inserted
    }

    /// Drop a family's counter and every issued ID that belongs to it.
    /// For tasks this also drops all service-scoped counters and IDs.
    pub fn forget_family(&mut self, family: Family) {
        self.counters.remove(&family);
        self.used_ids.retain(|id| family.parse_id(id).is_none());
        if family.supports_scope() {
            self.service_counters.clear();
            self.used_ids.retain(|id| parse_scoped_task(id).is_none());
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// File-backed store for [`IdState`]. Callers serialize access with the
/// cross-process lock; this type only guarantees whole-file reads and writes.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Loaded<IdState>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Absent),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "state file is not valid UTF-8");
                return Ok(Loaded::Corrupt(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            warn!(path = %self.path.display(), "state file is empty");
            return Ok(Loaded::Corrupt("empty file".to_string()));
        }
        match serde_yaml::from_str::<IdState>(&data) {
            Ok(state) => Ok(Loaded::Valid(state)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file failed to parse");
                Ok(Loaded::Corrupt(e.to_string()))
            }
        }
    }

    pub fn write(&self, state: &IdState) -> Result<()> {
        let data = serde_yaml::to_string(state)?;
        crate::io::atomic_write(&self.path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
