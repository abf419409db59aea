//! Strongly-typed identifiers for rosterd

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Result, RosterError};

/// Longest decimal snowflake the chat platform hands out (u64::MAX has 20 digits)
const MAX_SNOWFLAKE_LEN: usize = 20;

fn check_snowflake(kind: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.len() > MAX_SNOWFLAKE_LEN {
        "too long"
    } else if !value.bytes().all(|b| b.is_ascii_digit()) {
        "must contain only decimal digits"
    } else {
        return Ok(());
    };

    Err(RosterError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason,
    })
}

/// Chat-platform user identifier, carried as a decimal string.
///
/// Deserialization does not validate, so legacy ledger files always load.
/// Anything arriving from outside the daemon goes through [`UserId::parse`]
/// or [`UserId::validate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse and validate a user id
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        check_snowflake("user id", id)?;
        Ok(Self(id.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        check_snowflake("user id", &self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Chat-platform role identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        check_snowflake("role id", id)?;
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parse_accepts_snowflakes() {
        let id = UserId::parse(" 1384466481831608381 ").unwrap();
        assert_eq!(id.as_str(), "1384466481831608381");
    }

    #[test]
    fn user_id_parse_rejects_garbage() {
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("abc").is_err());
        assert!(UserId::parse("12-34").is_err());
        assert!(UserId::parse("123456789012345678901").is_err());

        let err = UserId::parse("x1").unwrap_err();
        assert!(matches!(err, RosterError::InvalidIdentifier { kind: "user id", .. }));
    }

    #[test]
    fn unchecked_ids_validate_later() {
        assert!(UserId::new("42").validate().is_ok());
        assert!(UserId::new("not-a-user").validate().is_err());
    }

    #[test]
    fn role_id_parse() {
        assert!(RoleId::parse("1385160436046893168").is_ok());
        assert!(RoleId::parse("admin").is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UserId::new("1001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1001\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);

        let client = ClientId::new();
        let json = serde_json::to_string(&client).unwrap();
        let parsed: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, client);
    }

    #[test]
    fn client_id_uniqueness() {
        assert_ne!(ClientId::new(), ClientId::new());
    }
}
