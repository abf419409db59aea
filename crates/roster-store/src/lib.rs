//! Persistence layer for rosterd
//!
//! Provides:
//! - The ledger state (open shifts plus closed shift history)
//! - The `LedgerStore` trait: whole-state load and save
//! - A JSON file store that replaces the file atomically on every save
//! - An in-memory store for tests

mod json;
mod memory;
mod traits;

pub use json::*;
pub use memory::*;
pub use traits::*;

use std::path::PathBuf;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Ledger file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
