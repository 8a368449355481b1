//! Rebuild counter baselines from artifacts already on disk.
//!
//! Only names that follow a family's canonical pattern are seen: `001-auth`
//! for features, `spec-007.md` for specifications, `AUTH-T003-login.md` for
//! scoped tasks, and so on. Artifacts named any other way are invisible here.

use crate::config::{Config, FamilyConfig};
use crate::error::{IdError, Result};
use crate::family::{Family, DIGIT_WIDTH, SCOPED_TASK_MARKER};
use crate::paths;
use crate::state::IdState;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Directory depth limit for recursive scans.
const MAX_SCAN_DEPTH: usize = 8;

/// Artifact name patterns and the directories they are looked up in.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    config: Config,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Every number found on artifacts of `family`, sorted and deduplicated.
    pub fn scan(&self, family: Family) -> Result<Vec<u64>> {
        let re = family_pattern(family);
        let mut found = Vec::new();
        self.walk(family, |name| {
            if let Some(n) = re
                .captures(name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
            {
                found.push(n);
            }
        })?;
        found.sort_unstable();
        found.dedup();
        Ok(found)
    }

    /// Highest number in use for `family`, or 0 when there are no artifacts.
    pub fn rebuild(&self, family: Family) -> Result<u64> {
        let max = self.scan(family)?.last().copied().unwrap_or(0);
        info!(family = %family, baseline = max, "rebuilt counter from artifacts");
        Ok(max)
    }

    /// Highest number in use per service scope, from `SCOPE-T###` names.
    pub fn scan_scoped(&self) -> Result<BTreeMap<String, u64>> {
        Ok(self
            .scan_scoped_numbers()?
            .into_iter()
            .filter_map(|(scope, numbers)| {
                let max = numbers.last().copied()?;
                Some((scope, max))
            })
            .collect())
    }

    /// Every number found per service scope.
    pub(crate) fn scan_scoped_numbers(&self) -> Result<BTreeMap<String, BTreeSet<u64>>> {
        let re = scoped_task_pattern();
        let mut found: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
        self.walk(Family::Task, |name| {
            let Some(caps) = re.captures(name) else {
                return;
            };
            let (Some(scope), Some(n)) = (
                caps.get(1),
                caps.get(2).and_then(|m| m.as_str().parse::<u64>().ok()),
            ) else {
                return;
            };
            found.entry(scope.as_str().to_string()).or_default().insert(n);
        })?;
        Ok(found)
    }

    /// Whether an artifact carrying `value` already exists for `family`.
    pub fn exists(&self, family: Family, value: u64) -> Result<bool> {
        Ok(self.scan(family)?.binary_search(&value).is_ok())
    }

    /// Reconstruct a complete [`IdState`]: every family baseline, every scope
    /// baseline, and the issued-ID set seeded with each discovered ID.
    pub fn rebuild_state(&self) -> Result<IdState> {
        let mut state = IdState::default();
        for &family in Family::all() {
            let numbers = self.scan(family)?;
            if let Some(&max) = numbers.last() {
                state.counters.insert(family, max);
            }
            state
                .used_ids
                .extend(numbers.iter().map(|&n| family.format(n)));
        }
        for (scope, numbers) in self.scan_scoped_numbers()? {
            state
                .used_ids
                .extend(numbers.iter().map(|&n| Family::Task.format_scoped(&scope, n)));
            if let Some(&max) = numbers.last() {
                state.service_counters.insert(scope, max);
            }
        }
        info!(
            families = state.counters.len(),
            scopes = state.service_counters.len(),
            ids = state.used_ids.len(),
            "rebuilt id state from artifacts"
        );
        Ok(state)
    }

    fn family_config(&self, family: Family) -> FamilyConfig {
        self.config.family(family)
    }

    fn walk(&self, family: Family, mut visit: impl FnMut(&str)) -> Result<()> {
        let fc = self.family_config(family);
        let dir = paths::artifact_dir(&self.root, &fc.artifact_dir);
        if !dir.exists() {
            debug!(family = %family, dir = %dir.display(), "artifact directory missing; treating as empty");
            return Ok(());
        }
        let depth = if fc.recursive { MAX_SCAN_DEPTH } else { 1 };
        walk_dir(&dir, depth, &mut visit)
    }
}

fn walk_dir(dir: &Path, depth: usize, visit: &mut impl FnMut(&str)) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| unrecoverable(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| unrecoverable(dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        visit(&name);

        // file_type() does not follow symlinks, so link cycles are never entered.
        let is_dir = entry
            .file_type()
            .map_err(|e| unrecoverable(dir, e))?
            .is_dir();
        if is_dir && depth > 1 && !name.starts_with('.') {
            walk_dir(&entry.path(), depth - 1, visit)?;
        }
    }
    Ok(())
}

fn unrecoverable(dir: &Path, e: std::io::Error) -> IdError {
    IdError::StoreUnrecoverable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    }
}

static FAMILY_PATTERNS: OnceLock<BTreeMap<Family, Regex>> = OnceLock::new();
static SCOPED_TASK_RE: OnceLock<Regex> = OnceLock::new();

/// `^<prefix>(\d{3,})` followed by a non-digit or the end of the name.
fn family_pattern(family: Family) -> &'static Regex {
    let patterns = FAMILY_PATTERNS.get_or_init(|| {
        Family::all()
            .iter()
            .map(|&f| (f, Regex::new(&family_pattern_source(f)).unwrap()))
            .collect()
    });
    &patterns[&family]
}

fn family_pattern_source(family: Family) -> String {
    if family.prefix().is_empty() {
        format!(r"^(\d{{{DIGIT_WIDTH},}})(?:-|$)")
    } else {
        format!(
            r"^{}(\d{{{DIGIT_WIDTH},}})(?:\D|$)",
            regex::escape(family.prefix())
        )
    }
}

fn scoped_task_pattern() -> &'static Regex {
    SCOPED_TASK_RE.get_or_init(|| {
        Regex::new(&format!(
            r"^([A-Z]+){}(\d{{{DIGIT_WIDTH},}})(?:\D|$)",
            regex::escape(SCOPED_TASK_MARKER)
        ))
        .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
