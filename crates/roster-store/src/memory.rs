//! In-memory store for tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{LedgerState, LedgerStore, StoreError, StoreResult};

/// Keeps the last saved ledger in memory.
///
/// Saves can be made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<LedgerState>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing ledger, as if it had been loaded from disk
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            snapshot: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Make every following save fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of what was last saved
    pub fn snapshot(&self) -> StoreResult<LedgerState> {
        self.load()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> StoreResult<LedgerState> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, state: &LedgerState) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".into()));
        }

        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *guard = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.fail_saves.load(Ordering::SeqCst) && !self.snapshot.is_poisoned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_util::{Timestamp, UserId};

    #[test]
    fn starts_empty() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.save_count(), 0);
        assert!(store.is_healthy());
    }

    #[test]
    fn save_replaces_snapshot() {
        let store = MemoryStore::new();
        let mut state = LedgerState::default();
        state
            .active
            .insert(UserId::new("1"), Timestamp::from_secs(10.0));

        store.save(&state).unwrap();
        assert_eq!(store.snapshot().unwrap(), state);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn failing_saves_keep_old_snapshot() {
        let mut initial = LedgerState::default();
        initial
            .active
            .insert(UserId::new("1"), Timestamp::from_secs(10.0));
        let store = MemoryStore::with_state(initial.clone());

        store.set_fail_saves(true);
        assert!(!store.is_healthy());
        let err = store.save(&LedgerState::default()).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.load().unwrap(), initial);

        store.set_fail_saves(false);
        store.save(&LedgerState::default()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
