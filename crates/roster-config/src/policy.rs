//! Validated configuration structures

use crate::schema::{RawAccess, RawConfig, RawLedger, RawServiceConfig};
use roster_util::{DEFAULT_LEDGER_FILE, RoleId, data_dir_without_env, socket_path_without_env};
use std::path::PathBuf;

/// Default number of shifts returned by a history query
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Default number of members on the leaderboard
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,
    pub access: AccessConfig,
    pub ledger: LedgerSettings,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            access: AccessConfig::from_raw(raw.access),
            ledger: LedgerSettings::from_raw(raw.ledger),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub ledger_file: String,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let defaults = Self::default();
        Self {
            socket_path: raw.socket_path.unwrap_or(defaults.socket_path),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            ledger_file: raw.ledger_file.unwrap_or(defaults.ledger_file),
        }
    }

    /// Full path of the ledger file
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: socket_path_without_env(),
            data_dir: data_dir_without_env(),
            ledger_file: DEFAULT_LEDGER_FILE.to_string(),
        }
    }
}

/// Which roles unlock staff and admin commands
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    pub staff_roles: Vec<RoleId>,
    pub admin_roles: Vec<RoleId>,
}

impl AccessConfig {
    fn from_raw(raw: RawAccess) -> Self {
        Self {
            staff_roles: convert_roles(raw.staff_roles),
            admin_roles: convert_roles(raw.admin_roles),
        }
    }
}

/// Validation has already rejected malformed ids
fn convert_roles(raw: Vec<String>) -> Vec<RoleId> {
    raw.iter().filter_map(|r| RoleId::parse(r).ok()).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    pub history_window: usize,
    pub leaderboard_size: usize,
}

impl LedgerSettings {
    fn from_raw(raw: RawLedger) -> Self {
        Self {
            history_window: raw.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW),
            leaderboard_size: raw.leaderboard_size.unwrap_or(DEFAULT_LEADERBOARD_SIZE),
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}
