//! Event types for rosterd -> client streaming

use chrono::{DateTime, Local};
use roster_util::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, SessionRecord};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: roster_util::now(),
            payload,
        }
    }
}

/// Ledger changes pushed to subscribed clients, so the chat front end can
/// post notices without polling. `actor` is whoever issued the command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    ShiftStarted {
        user_id: UserId,
        actor: UserId,
        started_at: Timestamp,
    },

    ShiftEnded {
        actor: UserId,
        record: SessionRecord,
    },

    TimeAdded {
        actor: UserId,
        record: SessionRecord,
    },

    TimeRemoved {
        user_id: UserId,
        actor: UserId,
        removed_seconds: f64,
    },

    LedgerWiped {
        actor: UserId,
        active_cleared: usize,
        history_cleared: usize,
    },
}
