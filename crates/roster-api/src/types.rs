//! Shared types for the rosterd API

use roster_util::{ClientId, RoleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// One on-duty interval.
///
/// Closed records carry `end` and `duration`. Older ledger files contain
/// records without them; those are treated as still ongoing and contribute
/// nothing to totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub start: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    /// Seconds; may diverge from `end - start` only through admin corrections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl SessionRecord {
    /// A closed record spanning `start..end`
    pub fn closed(user_id: UserId, start: Timestamp, end: Timestamp) -> Self {
        Self {
            user_id,
            start,
            end: Some(end),
            duration: Some(end.seconds_since(start)),
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.end.is_none() || self.duration.is_none()
    }

    /// Accrued seconds; zero for ongoing records
    pub fn duration_secs(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }
}

/// Access level an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Caller must be the target user
    SelfService,
    /// Caller must hold a staff or admin role
    Staff,
    /// Caller must hold an admin role
    Admin,
}

/// The member on whose behalf a request is made.
///
/// Roles are resolved by the chat-platform collaborator before the request
/// reaches rosterd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Caller {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }
}

/// Duty state of a single member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftStatus {
    pub user_id: UserId,
    pub on_duty: bool,
    /// Start of the current shift, when on duty
    pub started_at: Option<Timestamp>,
    /// Seconds into the current shift, when on duty
    pub current_elapsed: Option<f64>,
    /// Closed-history total; excludes the current shift
    pub total_seconds: f64,
}

/// An open shift as listed for staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveShift {
    pub user_id: UserId,
    pub started_at: Timestamp,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub user_id: UserId,
    pub total_seconds: f64,
}

/// Result of an admin time removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    pub user_id: UserId,
    pub removed_seconds: f64,
    /// The shortened record, or `None` if it was used up and deleted
    pub adjusted: Option<SessionRecord>,
}

/// Whether a connected client may act on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientTrust {
    /// Same uid as the daemon, or root
    Trusted,
    /// Any other local peer: health checks only
    Untrusted,
}

impl ClientTrust {
    pub fn can_use_ledger(&self) -> bool {
        matches!(self, ClientTrust::Trusted)
    }
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub trust: ClientTrust,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(trust: ClientTrust) -> Self {
        Self {
            client_id: ClientId::new(),
            trust,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub on_duty_count: usize,
    pub history_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_record_duration_matches_span() {
        let record = SessionRecord::closed(
            UserId::new("1"),
            Timestamp::from_secs(0.0),
            Timestamp::from_secs(3600.0),
        );
        assert_eq!(record.duration, Some(3600.0));
        assert!(!record.is_ongoing());
    }

    #[test]
    fn legacy_record_without_end_is_ongoing() {
        let json = r#"{"user_id": "42", "start": 1700000000.5}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_ongoing());
        assert_eq!(record.duration_secs(), 0.0);

        let out = serde_json::to_string(&record).unwrap();
        assert!(!out.contains("end"));
        assert!(!out.contains("duration"));
    }

    #[test]
    fn caller_roles() {
        let admin = RoleId::new("900");
        let caller = Caller::new(UserId::new("1")).with_roles([admin.clone()]);
        assert!(caller.has_role(&admin));
        assert!(!caller.has_role(&RoleId::new("901")));
    }

    #[test]
    fn caller_roles_default_to_empty() {
        let caller: Caller = serde_json::from_str(r#"{"user_id": "7"}"#).unwrap();
        assert!(caller.roles.is_empty());
    }
}
