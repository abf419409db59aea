//! Shift ledger and access policy for rosterd
//!
//! This crate is the heart of rosterd, containing:
//! - The per-member duty state machine (off duty -> on duty -> off duty)
//! - The shift ledger: start/stop, accrual, admin corrections, wipe
//! - Role-based access checks for every command
//! - Ledger events handed to the notification layer

mod access;
mod events;
mod ledger;
mod session;

pub use access::*;
pub use events::*;
pub use ledger::*;
pub use session::*;

use roster_store::StoreError;
use roster_util::{RosterError, Timestamp, UserId};
use thiserror::Error;

/// Ledger operation failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{user_id} is already on duty")]
    AlreadyOnDuty { user_id: UserId, since: Timestamp },

    #[error("{user_id} is not on duty")]
    NotOnDuty { user_id: UserId },

    #[error("No single shift of {user_id} is long enough to remove {minutes} minutes")]
    NoSuitableShift { user_id: UserId, minutes: i64 },

    #[error(transparent)]
    InvalidInput(#[from] RosterError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Expected failures are reported back to the member; only storage
    /// failures are treated as faults.
    pub fn is_expected(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
