//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Role ids that unlock staff and admin commands
    #[serde(default)]
    pub access: RawAccess,

    /// Query defaults
    #[serde(default)]
    pub ledger: RawLedger,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Directory holding the ledger file
    pub data_dir: Option<PathBuf>,

    /// Ledger file name inside `data_dir` (default: shifts.json)
    pub ledger_file: Option<String>,
}

/// Role configuration. Ids are strings because snowflakes do not survive
/// a round trip through TOML floats in every tool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAccess {
    #[serde(default)]
    pub staff_roles: Vec<String>,

    #[serde(default)]
    pub admin_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLedger {
    /// Shifts shown by a history query when no limit is given
    pub history_window: Option<usize>,

    /// Members shown on the leaderboard when no limit is given
    pub leaderboard_size: Option<usize>,
}
