//! rosterd internals shared by the daemon binary and its integration tests

pub mod handler;

pub use handler::{Handler, Outcome};
