//! Events emitted by ledger mutations

use roster_api::{EventPayload, RemovalOutcome, SessionRecord};
use roster_util::{Timestamp, UserId};

use crate::WipeSummary;

/// A committed ledger change
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    ShiftStarted {
        user_id: UserId,
        started_at: Timestamp,
    },

    ShiftEnded {
        record: SessionRecord,
    },

    TimeAdded {
        record: SessionRecord,
    },

    TimeRemoved(RemovalOutcome),

    Wiped(WipeSummary),
}

impl LedgerEvent {
    /// Wire form for subscribers, attributed to `actor`
    pub fn into_payload(self, actor: UserId) -> EventPayload {
        match self {
            LedgerEvent::ShiftStarted {
                user_id,
                started_at,
            } => EventPayload::ShiftStarted {
                user_id,
                actor,
                started_at,
            },
            LedgerEvent::ShiftEnded { record } => EventPayload::ShiftEnded { actor, record },
            LedgerEvent::TimeAdded { record } => EventPayload::TimeAdded { actor, record },
            LedgerEvent::TimeRemoved(outcome) => EventPayload::TimeRemoved {
                user_id: outcome.user_id,
                actor,
                removed_seconds: outcome.removed_seconds,
            },
            LedgerEvent::Wiped(summary) => EventPayload::LedgerWiped {
                actor,
                active_cleared: summary.active_cleared,
                history_cleared: summary.history_cleared,
            },
        }
    }
}
