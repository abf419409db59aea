//! Configuration validation

use crate::schema::RawConfig;
use roster_util::RoleId;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Inclusive bounds for history window and leaderboard size
pub const MIN_QUERY_LIMIT: usize = 1;
pub const MAX_QUERY_LIMIT: usize = 100;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("No admin roles configured; admin commands would be unreachable")]
    NoAdminRoles,

    #[error("Invalid {list} entry '{value}': {message}")]
    InvalidRoleId {
        list: &'static str,
        value: String,
        message: String,
    },

    #[error("Role '{0}' listed more than once")]
    DuplicateRole(String),

    #[error("Role '{0}' is listed as both staff and admin")]
    RoleInBothLists(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    #[error("ledger_file '{0}' must be a plain file name")]
    InvalidLedgerFile(String),
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.access.admin_roles.is_empty() {
        errors.push(ValidationError::NoAdminRoles);
    }

    errors.extend(validate_role_list("staff_roles", &config.access.staff_roles));
    errors.extend(validate_role_list("admin_roles", &config.access.admin_roles));

    let admins: HashSet<&str> = config
        .access
        .admin_roles
        .iter()
        .map(|r| r.trim())
        .collect();
    let mut reported = HashSet::new();
    for role in &config.access.staff_roles {
        let role = role.trim();
        if admins.contains(role) && reported.insert(role) {
            errors.push(ValidationError::RoleInBothLists(role.to_string()));
        }
    }

    if let Some(window) = config.ledger.history_window {
        errors.extend(check_range("history_window", window));
    }
    if let Some(size) = config.ledger.leaderboard_size {
        errors.extend(check_range("leaderboard_size", size));
    }

    if let Some(file) = &config.service.ledger_file
        && !is_plain_file_name(file)
    {
        errors.push(ValidationError::InvalidLedgerFile(file.clone()));
    }

    errors
}

fn validate_role_list(list: &'static str, roles: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for role in roles {
        if let Err(e) = RoleId::parse(role) {
            errors.push(ValidationError::InvalidRoleId {
                list,
                value: role.clone(),
                message: e.to_string(),
            });
            continue;
        }
        if !seen.insert(role.trim()) {
            errors.push(ValidationError::DuplicateRole(role.trim().to_string()));
        }
    }

    errors
}

fn check_range(field: &'static str, value: usize) -> Option<ValidationError> {
    if (MIN_QUERY_LIMIT..=MAX_QUERY_LIMIT).contains(&value) {
        None
    } else {
        Some(ValidationError::OutOfRange {
            field,
            value,
            min: MIN_QUERY_LIMIT,
            max: MAX_QUERY_LIMIT,
        })
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path.file_name().map(|f| f == path.as_os_str()).unwrap_or(false)
        && name != "."
        && name != ".."
}
