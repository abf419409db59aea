//! Shared utilities for rosterd
//!
//! This crate provides:
//! - ID types (UserId, RoleId, ClientId)
//! - Clock and timestamp utilities (non-decreasing wall clock, duration formatting)
//! - Error types
//! - Default paths for socket, data, and config

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
