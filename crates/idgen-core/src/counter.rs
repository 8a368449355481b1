//! Single-family store: one bare decimal integer in `.idgen/feature.counter`,
//! guarded by its own lock file.

use crate::config::Config;
use crate::error::{IdError, Result};
use crate::family::Family;
use crate::generator::exhausted;
use crate::lock::FileLock;
use crate::paths;
use crate::recovery::Scanner;
use crate::state::Loaded;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// CounterFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CounterFile {
    path: PathBuf,
}

impl CounterFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Surrounding whitespace is tolerated; anything but a decimal integer
    /// is reported as corrupt.
    pub fn read(&self) -> Result<Loaded<u64>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Absent),
            Err(e) => return Err(e.into()),
        };
        let text = match std::str::from_utf8(&data) {
            Ok(text) => text.trim(),
            Err(e) => return Ok(Loaded::Corrupt(e.to_string())),
        };
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Loaded::Corrupt(format!("not a decimal integer: {text:?}")));
        }
        match text.parse::<u64>() {
            Ok(n) => Ok(Loaded::Valid(n)),
            Err(e) => Ok(Loaded::Corrupt(e.to_string())),
        }
    }

    pub fn write(&self, value: u64) -> Result<()> {
        crate::io::atomic_write(&self.path, value.to_string().as_bytes())
    }
}

// ---------------------------------------------------------------------------
// FeatureCounter
// ---------------------------------------------------------------------------

/// Feature-ID issuance backed by [`CounterFile`].
///
/// There is no issued-ID set here; the conflict check instead looks for an
/// existing feature artifact carrying the number about to be issued.
#[derive(Debug, Clone)]
pub struct FeatureCounter {
    file: CounterFile,
    lock_path: PathBuf,
    config: Config,
    scanner: Scanner,
}

impl FeatureCounter {
    pub fn new(root: &Path, config: Config) -> Self {
        Self {
            file: CounterFile::new(paths::feature_counter_path(root)),
            lock_path: paths::feature_counter_lock_path(root),
            scanner: Scanner::new(root, config.clone()),
            config,
        }
    }

    pub fn counter_file(&self) -> &CounterFile {
        &self.file
    }

    pub fn next_id(&self) -> Result<String> {
        let lock = self.lock()?;
        let result = self.issue();
        lock.release();
        result
    }

    fn issue(&self) -> Result<String> {
        let current = self.load_or_recover()?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| exhausted(self.file.path(), Family::Feature.as_str()))?;
        let id = Family::Feature.format(next);
        if Family::Feature.exceeds_width(next) {
            warn!(id = %id, "feature number exceeds {} digits", Family::Feature.digit_width());
        }
        if self.scanner.exists(Family::Feature, next)? {
            return Err(IdError::IdConflict(id));
        }
        self.file.write(next)?;
        debug!(id = %id, "issued feature id");
        Ok(id)
    }

    /// Stored value, or the artifact baseline when the file is absent or
    /// corrupt. Never writes.
    pub fn current(&self) -> Result<u64> {
        match self.file.read()? {
            Loaded::Valid(n) => Ok(n),
            Loaded::Absent | Loaded::Corrupt(_) => self.scanner.rebuild(Family::Feature),
        }
    }

    /// Raise the counter to the highest feature number on disk. A valid
    /// stored value above the scan is kept.
    pub fn rebuild(&self) -> Result<u64> {
        let lock = self.lock()?;
        let result = self.rebuild_locked();
        lock.release();
        result
    }

    fn rebuild_locked(&self) -> Result<u64> {
        let existing = self.file.read()?.valid().unwrap_or(0);
        let value = existing.max(self.scanner.rebuild(Family::Feature)?);
        self.file.write(value)?;
        Ok(value)
    }

    pub fn reset(&self) -> Result<()> {
        let lock = self.lock()?;
        let result = self.file.write(0);
        lock.release();
        result
    }

    fn load_or_recover(&self) -> Result<u64> {
        match self.file.read()? {
            Loaded::Valid(n) => Ok(n),
            Loaded::Absent => self.scanner.rebuild(Family::Feature),
            Loaded::Corrupt(reason) => {
                warn!(path = %self.file.path().display(), reason = %reason, "feature counter unreadable; rebuilding");
                self.scanner.rebuild(Family::Feature)
            }
        }
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(
            &self.lock_path,
            self.config.lock_timeout(),
            self.config.poll_interval(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn counter(dir: &TempDir) -> FeatureCounter {
        let cfg = Config::default().with_poll_interval(Duration::from_millis(10));
        FeatureCounter::new(dir.path(), cfg)
    }

    #[test]
    fn counter_file_parsing() {
        let dir = TempDir::new().unwrap();
        let file = CounterFile::new(dir.path().join("feature.counter"));
        assert_eq!(file.read().unwrap(), Loaded::Absent);

        std::fs::write(file.path(), "12\n").unwrap();
        assert_eq!(file.read().unwrap(), Loaded::Valid(12));

        for junk in ["", "abc", "-3", "1.5", "7 8"] {
            std::fs::write(file.path(), junk).unwrap();
            assert!(matches!(file.read().unwrap(), Loaded::Corrupt(_)), "{junk:?}");
        }
    }

    #[test]
    fn counter_file_has_no_newline() {
        let dir = TempDir::new().unwrap();
        let file = CounterFile::new(dir.path().join("feature.counter"));
        file.write(42).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "42");
    }

    #[test]
    fn fresh_project_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let c = counter(&dir);
        assert_eq!(c.next_id().unwrap(), "001");
        assert_eq!(c.next_id().unwrap(), "002");
        assert_eq!(c.current().unwrap(), 2);
    }

    #[test]
    fn corrupt_counter_recovers_to_one() {
        let dir = TempDir::new().unwrap();
        let c = counter(&dir);
        std::fs::create_dir_all(dir.path().join(".idgen")).unwrap();
        std::fs::write(c.counter_file().path(), "not a number").unwrap();
        assert_eq!(c.next_id().unwrap(), "001");
    }

    #[test]
    fn corrupt_counter_recovers_from_artifacts() {
        let dir = TempDir::new().unwrap();
        for name in ["specs/001-auth", "specs/002-payment", "specs/005-dashboard"] {
            std::fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        let c = counter(&dir);
        std::fs::create_dir_all(dir.path().join(".idgen")).unwrap();
        std::fs::write(c.counter_file().path(), "garbage").unwrap();
        assert_eq!(c.next_id().unwrap(), "006");
        assert_eq!(c.counter_file().read().unwrap(), Loaded::Valid(6));
    }

    #[test]
    fn manual_artifact_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let c = counter(&dir);
        assert_eq!(c.next_id().unwrap(), "001");
        std::fs::create_dir_all(dir.path().join("specs/002-handmade")).unwrap();

        let err = c.next_id().unwrap_err();
        assert!(matches!(err, IdError::IdConflict(ref id) if id == "002"));
        assert_eq!(c.counter_file().read().unwrap(), Loaded::Valid(1));
    }

    #[test]
    fn rebuild_never_lowers_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("specs/003-x")).unwrap();
        let c = counter(&dir);
        assert_eq!(c.rebuild().unwrap(), 3);
        assert_eq!(c.rebuild().unwrap(), 3);

        c.counter_file().write(9).unwrap();
        assert_eq!(c.rebuild().unwrap(), 9);
    }

    #[test]
    fn counter_at_max_is_unrecoverable() {
        let dir = TempDir::new().unwrap();
        let c = counter(&dir);
        std::fs::create_dir_all(dir.path().join(".idgen")).unwrap();
        c.counter_file().write(u64::MAX).unwrap();

        let err = c.next_id().unwrap_err();
        assert!(
            matches!(err, IdError::StoreUnrecoverable { ref path, .. } if path == c.counter_file().path()),
            "{err}"
        );
        assert_eq!(c.counter_file().read().unwrap(), Loaded::Valid(u64::MAX));
    }

    #[test]
    fn reset_zeroes_counter() {
        let dir = TempDir::new().unwrap();
        let c = counter(&dir);
        c.next_id().unwrap();
        c.reset().unwrap();
        assert_eq!(c.counter_file().read().unwrap(), Loaded::Valid(0));
    }
}
