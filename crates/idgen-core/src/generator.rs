use crate::config::{Config, FeatureStore};
use crate::counter::FeatureCounter;
use crate::error::{IdError, Result};
use crate::family::Family;
use crate::lock::FileLock;
use crate::paths;
use crate::recovery::Scanner;
use crate::state::{IdState, Loaded, StateStore};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Issues IDs for one project root.
///
/// Holds no counter values in memory: every call re-reads the store inside
/// the file lock, so any number of generators (in any number of processes)
/// can share a root.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    root: PathBuf,
    config: Config,
    store: StateStore,
    lock_path: PathBuf,
    scanner: Scanner,
    features: FeatureCounter,
}

impl IdGenerator {
    /// Open a generator using `.idgen/config.yaml` (or defaults).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = Config::load(&root)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        Self {
            store: StateStore::new(paths::state_path(&root)),
            lock_path: paths::state_lock_path(&root),
            scanner: Scanner::new(root.clone(), config.clone()),
            features: FeatureCounter::new(&root, config.clone()),
            config,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    // ---------------------------------------------------------------------------
    // Issuance
    // ---------------------------------------------------------------------------

    /// Issue the next ID for `family`, or for the service-scoped task counter
    /// when `scope` is given.
    ///
    /// Scope validation happens before the lock is requested. Everything
    /// else (load, recover, increment, conflict check, persist) runs inside
    /// one lock bracket, and the store is only written on success.
    pub fn next_id(&self, family: Family, scope: Option<&str>) -> Result<String> {
        family.validate_scope(scope)?;
        if self.uses_counter_file(family, scope) {
            return self.features.next_id();
        }

        let lock = self.lock()?;
        let result = self.issue(family, scope);
        lock.release();
        result
    }

    fn issue(&self, family: Family, scope: Option<&str>) -> Result<String> {
        let mut state = self.load_or_recover()?;

        let next = state
            .counter(family, scope)
            .checked_add(1)
            .ok_or_else(|| exhausted(self.store.path(), family.as_str()))?;
        let id = match scope {
            Some(scope) => family.format_scoped(scope, next),
            None => family.format(next),
        };
        if family.exceeds_width(next) {
            warn!(id = %id, width = family.digit_width(), "id exceeds its padding width");
        }
        if state.is_used(&id) {
            return Err(IdError::IdConflict(id));
        }

        state.set_counter(family, scope, next);
        state.mark_used(id.clone());
        self.store.write(&state)?;

        debug!(family = %family, scope = scope.unwrap_or(""), id = %id, "issued id");
        Ok(id)
    }

    // ---------------------------------------------------------------------------
    // Queries and administration
    // ---------------------------------------------------------------------------

    /// The last issued value, without incrementing or locking.
    ///
    /// When the store is absent or corrupt this reports the baseline recovery
    /// would produce, but does not write it.
    pub fn current(&self, family: Family, scope: Option<&str>) -> Result<u64> {
        family.validate_scope(scope)?;
        if self.uses_counter_file(family, scope) {
            return self.features.current();
        }

        match self.store.read()? {
            Loaded::Valid(state) => Ok(state.counter(family, scope)),
            Loaded::Absent | Loaded::Corrupt(_) => match scope {
                Some(scope) => Ok(self
                    .scanner
                    .scan_scoped()?
                    .get(scope)
                    .copied()
                    .unwrap_or(0)),
                None => self.scanner.rebuild(family),
            },
        }
    }

    /// Full state as a caller would see it right now. Not persisted when it
    /// had to be reconstructed.
    pub fn snapshot(&self) -> Result<IdState> {
        match self.store.read()? {
            Loaded::Valid(state) => Ok(state),
            Loaded::Absent | Loaded::Corrupt(_) => self.scanner.rebuild_state(),
        }
    }

    /// Re-derive `family`'s counter from artifacts on disk.
    ///
    /// The counter becomes the larger of its current valid value and the
    /// highest artifact number, so this never lowers it; discovered IDs join
    /// the issued-ID set. For tasks, scoped counters are rebuilt the same way.
    pub fn rebuild(&self, family: Family) -> Result<u64> {
        if self.uses_counter_file(family, None) {
            return self.features.rebuild();
        }

        let lock = self.lock()?;
        let result = self.rebuild_locked(family);
        lock.release();
        result
    }

    fn rebuild_locked(&self, family: Family) -> Result<u64> {
        let mut state = self.load_or_recover()?;

        let numbers = self.scanner.scan(family)?;
        let baseline = numbers.last().copied().unwrap_or(0);
        let value = state.counter(family, None).max(baseline);
        state.set_counter(family, None, value);
        for n in numbers {
            state.mark_used(family.format(n));
        }

        if family.supports_scope() {
            for (scope, numbers) in self.scanner.scan_scoped_numbers()? {
                let max = numbers.last().copied().unwrap_or(0);
                let value = state.counter(family, Some(&scope)).max(max);
                state.set_counter(family, Some(&scope), value);
                for n in numbers {
                    state.mark_used(family.format_scoped(&scope, n));
                }
            }
        }

        self.store.write(&state)?;
        info!(family = %family, baseline, value, "counter rebuilt");
        Ok(value)
    }

    /// Administrative reset. With a family, zeroes that family's counter and
    /// forgets its issued IDs (for tasks, all service scopes too); without
    /// one, replaces the whole store with an empty state.
    ///
    /// Issued IDs are not re-checked against artifacts afterwards, so a reset
    /// can reissue numbers that still exist on disk.
    pub fn reset(&self, family: Option<Family>) -> Result<()> {
        match family {
            Some(family) if self.uses_counter_file(family, None) => self.features.reset(),
            Some(family) => {
                let lock = self.lock()?;
                let result = self.load_or_recover().and_then(|mut state| {
                    state.forget_family(family);
                    self.store.write(&state)
                });
                lock.release();
                result?;
                info!(family = %family, "counter reset");
                Ok(())
            }
            None => {
                if self.config.feature_store == FeatureStore::CounterFile {
                    self.features.reset()?;
                }
                let lock = self.lock()?;
                let result = self.store.write(&IdState::default());
                lock.release();
                result?;
                info!("all counters reset");
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------------

    fn uses_counter_file(&self, family: Family, scope: Option<&str>) -> bool {
        family == Family::Feature
            && scope.is_none()
            && self.config.feature_store == FeatureStore::CounterFile
    }

    /// Must be called with the lock held: a reconstructed state is only
    /// persisted by the caller's write in the same critical section.
    fn load_or_recover(&self) -> Result<IdState> {
        match self.store.read()? {
            Loaded::Valid(state) => Ok(state),
            Loaded::Absent => {
                debug!(path = %self.store.path().display(), "no state file; initializing from artifacts");
                self.scanner.rebuild_state()
            }
            Loaded::Corrupt(reason) => {
                warn!(path = %self.store.path().display(), reason = %reason, "state file unreadable; rebuilding from artifacts");
                self.scanner.rebuild_state()
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

/// A counter already at `u64::MAX` cannot advance without wrapping.
pub(crate) fn exhausted(store: &Path, counter: &str) -> IdError {
    IdError::StoreUnrecoverable {
        path: store.to_path_buf(),
        reason: format!("{counter} counter is at its maximum value"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
