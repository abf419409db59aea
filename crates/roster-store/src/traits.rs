//! Store trait definitions

use roster_api::SessionRecord;
use roster_util::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::StoreResult;

/// Whole-ledger persistence.
///
/// The ledger is small and always rewritten in full: there is no partial
/// update and no append log.
pub trait LedgerStore: Send + Sync {
    /// Load the ledger; a missing backing store yields an empty ledger
    fn load(&self) -> StoreResult<LedgerState>;

    /// Replace the persisted ledger with `state`
    fn save(&self, state: &LedgerState) -> StoreResult<()>;

    /// Check if the store can currently be written
    fn is_healthy(&self) -> bool;
}

/// Everything the ledger persists.
///
/// A user id appears in `active` at most once; absence means off duty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Open shifts: user -> start time
    #[serde(default)]
    pub active: BTreeMap<UserId, Timestamp>,

    /// Closed shifts in the order they were recorded
    #[serde(default)]
    pub history: Vec<SessionRecord>,
}

impl LedgerState {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.history.is_empty()
    }
}
