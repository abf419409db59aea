//! Default paths for rosterd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/rosterd/rosterd.sock` or `/tmp/rosterd-$USER/rosterd.sock`
//! - Data: `$XDG_DATA_HOME/rosterd` or `~/.local/share/rosterd`
//! - Config: `$XDG_CONFIG_HOME/rosterd/config.toml` or `~/.config/rosterd/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const ROSTER_SOCKET_ENV: &str = "ROSTER_SOCKET";

/// Environment variable for overriding the data directory
pub const ROSTER_DATA_DIR_ENV: &str = "ROSTER_DATA_DIR";

/// Environment variable for overriding the config file
pub const ROSTER_CONFIG_ENV: &str = "ROSTER_CONFIG";

/// Default ledger file name inside the data directory
pub const DEFAULT_LEDGER_FILE: &str = "shifts.json";

const SOCKET_FILENAME: &str = "rosterd.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "rosterd";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$ROSTER_SOCKET`
/// 2. `$XDG_RUNTIME_DIR/rosterd/rosterd.sock`
/// 3. `/tmp/rosterd-$USER/rosterd.sock`
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(ROSTER_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Socket path ignoring `$ROSTER_SOCKET`, for config defaults where the
/// variable is handled by the argument parser.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$ROSTER_DATA_DIR`
/// 2. `$XDG_DATA_HOME/rosterd`
/// 3. `~/.local/share/rosterd`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(ROSTER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$ROSTER_CONFIG`
/// 2. `$XDG_CONFIG_HOME/rosterd/config.toml`
/// 3. `~/.config/rosterd/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ROSTER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
