//! Protocol types for rosterd IPC
//!
//! This crate defines the stable API between rosterd and its clients
//! (the chat-platform bot and `rosterctl`):
//! - Commands (requests from clients, each carrying the acting caller)
//! - Responses
//! - Events (daemon -> subscribed clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
