//! Cross-process mutual exclusion backed by an OS file lock.
//!
//! The lock file itself is only a target: exclusivity comes from the
//! `flock`/`LockFileEx` lock held on its open handle, which the OS drops when
//! the handle closes or the process dies. A lock file left on disk is inert.

use crate::error::{IdError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// An exclusive lock on a lock file, held until released or dropped.
#[derive(Debug)]
pub struct FileLock {
    file: Option<File>,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, retrying every `poll_interval` until `timeout` elapses.
    ///
    /// The file is opened with create + write and no truncation, so racing
    /// openers all end up on the same inode and contend only on the OS lock.
    pub fn acquire(path: &Path, timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let started = Instant::now();
        let deadline = started + timeout;
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(
                        path = %path.display(),
                        attempts,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "lock acquired"
                    );
                    return Ok(Self {
                        file: Some(file),
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(IdError::Io(e)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(IdError::LockTimeout {
                    path: path.to_path_buf(),
                    timeout,
                });
            }
            std::thread::sleep(poll_interval.min(deadline - now));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock. Failures are logged, not returned: the OS releases
    /// the lock anyway once the handle is closed below.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        if let Err(e) = FileExt::unlock(&file) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock; closing handle");
        } else {
            debug!(path = %self.path.display(), "lock released");
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || (e.raw_os_error().is_some()
            && e.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn acquire_creates_lock_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".idgen/ids.lock");
        let lock = FileLock::acquire(&path, Duration::from_secs(1), POLL).unwrap();
        assert!(path.exists());
        assert_eq!(lock.path(), path);
        lock.release();
        assert!(path.exists(), "lock file stays behind after release");
    }

    #[test]
    fn second_holder_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.lock");
        let _held = FileLock::acquire(&path, Duration::from_secs(1), POLL).unwrap();

        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = FileLock::acquire(&path, timeout, POLL).unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, IdError::LockTimeout { timeout: t, .. } if t == timeout));
        assert!(err.is_retryable());
        assert!(elapsed >= Duration::from_millis(180), "gave up too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "waited too long: {elapsed:?}");
    }

    #[test]
    fn release_lets_next_holder_in() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.lock");
        let first = FileLock::acquire(&path, Duration::from_secs(1), POLL).unwrap();
        first.release();
        let second = FileLock::acquire(&path, Duration::from_millis(50), POLL);
        assert!(second.is_ok());
    }

    #[test]
    fn drop_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.lock");
        {
            let _lock = FileLock::acquire(&path, Duration::from_secs(1), POLL).unwrap();
        }
        assert!(FileLock::acquire(&path, Duration::from_millis(50), POLL).is_ok());
    }

    #[test]
    fn waiter_gets_lock_once_holder_releases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.lock");
        let held = FileLock::acquire(&path, Duration::from_secs(1), POLL).unwrap();

        let waiter_path = path.clone();
        let waiter = std::thread::spawn(move || {
            FileLock::acquire(&waiter_path, Duration::from_secs(5), POLL).map(|_| ())
        });
        std::thread::sleep(Duration::from_millis(100));
        held.release();

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn existing_lock_file_content_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.lock");
        std::fs::write(&path, "stale garbage from a crashed process").unwrap();
        let lock = FileLock::acquire(&path, Duration::from_millis(100), POLL).unwrap();
        lock.release();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "stale garbage from a crashed process"
        );
    }
}
