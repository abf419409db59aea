//! Command types for the rosterd protocol

use roster_util::{ClientId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::{
    API_VERSION, ActiveShift, Caller, HealthStatus, LeaderboardEntry, RemovalOutcome,
    SessionRecord, ShiftStatus,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Member the request is made for; required by every ledger command
    #[serde(default)]
    pub caller: Option<Caller>,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            caller: None,
            command,
        }
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidInput,
    AlreadyOnDuty,
    NotOnDuty,
    NoSuitableShift,
    PermissionDenied,
    UntrustedClient,
    StorageError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Go on duty
    StartShift { user_id: UserId },

    /// Go off duty, closing the current shift
    StopShift { user_id: UserId },

    /// On/off duty, current shift start and accrued total
    ShiftStatus { user_id: UserId },

    /// Sum of closed shifts
    TotalDutyTime { user_id: UserId },

    /// Most recent closed shifts, oldest first
    RecentHistory {
        user_id: UserId,
        /// Defaults to the configured history window
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Members ranked by accrued time
    Leaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Everyone currently on duty (staff only)
    ActiveShifts,

    // Admin commands

    /// Credit a member with a synthesized shift
    AdminAddTime { user_id: UserId, minutes: i64 },

    /// Take time off a member's most recent shift long enough to absorb it
    AdminRemoveTime { user_id: UserId, minutes: i64 },

    /// Erase the whole ledger; `confirm` must be set
    Wipe {
        #[serde(default)]
        confirm: bool,
    },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Stable name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartShift { .. } => "start_shift",
            Command::StopShift { .. } => "stop_shift",
            Command::ShiftStatus { .. } => "shift_status",
            Command::TotalDutyTime { .. } => "total_duty_time",
            Command::RecentHistory { .. } => "recent_history",
            Command::Leaderboard { .. } => "leaderboard",
            Command::ActiveShifts => "active_shifts",
            Command::AdminAddTime { .. } => "admin_add_time",
            Command::AdminRemoveTime { .. } => "admin_remove_time",
            Command::Wipe { .. } => "wipe",
            Command::SubscribeEvents => "subscribe_events",
            Command::UnsubscribeEvents => "unsubscribe_events",
            Command::GetHealth => "get_health",
            Command::Ping => "ping",
        }
    }

    /// Whether the command reads or writes the ledger
    pub fn touches_ledger(&self) -> bool {
        !matches!(
            self,
            Command::SubscribeEvents
                | Command::UnsubscribeEvents
                | Command::GetHealth
                | Command::Ping
        )
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    ShiftStarted {
        user_id: UserId,
        started_at: Timestamp,
        total_seconds: f64,
    },
    ShiftStopped {
        record: SessionRecord,
        total_seconds: f64,
    },
    Status(ShiftStatus),
    TotalDutyTime {
        user_id: UserId,
        total_seconds: f64,
    },
    History {
        user_id: UserId,
        records: Vec<SessionRecord>,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    ActiveShifts {
        shifts: Vec<ActiveShift>,
    },
    TimeAdded {
        record: SessionRecord,
    },
    TimeRemoved(RemovalOutcome),
    Wiped {
        active_cleared: usize,
        history_cleared: usize,
    },
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let caller = Caller::new(UserId::new("1001"));
        let req = Request::new(
            1,
            Command::AdminAddTime {
                user_id: UserId::new("1002"),
                minutes: 30,
            },
        )
        .with_caller(caller.clone());

        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert_eq!(parsed.caller, Some(caller));
        assert!(matches!(
            parsed.command,
            Command::AdminAddTime { minutes: 30, .. }
        ));
    }

    #[test]
    fn command_wire_format() {
        let json = r#"{"request_id": 7, "api_version": 1, "command": {"type": "recent_history", "user_id": "55"}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(parsed.caller.is_none());
        match parsed.command {
            Command::RecentHistory { user_id, limit } => {
                assert_eq!(user_id.as_str(), "55");
                assert_eq!(limit, None);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let wipe: Command = serde_json::from_str(r#"{"type": "wipe"}"#).unwrap();
        assert!(matches!(wipe, Command::Wipe { confirm: false }));
    }

    #[test]
    fn response_serialization() {
        let resp = Response::error(
            3,
            ErrorInfo::new(ErrorCode::AlreadyOnDuty, "You are already on duty."),
        );

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("already_on_duty"));
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 3);
        assert!(matches!(
            parsed.result,
            ResponseResult::Err(ErrorInfo {
                code: ErrorCode::AlreadyOnDuty,
                ..
            })
        ));
    }

    #[test]
    fn ledger_commands_are_flagged() {
        assert!(Command::ActiveShifts.touches_ledger());
        assert!(Command::Wipe { confirm: true }.touches_ledger());
        assert!(!Command::Ping.touches_ledger());
        assert!(!Command::GetHealth.touches_ledger());
    }
}
