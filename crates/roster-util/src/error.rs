//! Error types shared across rosterd crates

use thiserror::Error;

/// Errors raised while validating identifiers and user-supplied arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RosterError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
