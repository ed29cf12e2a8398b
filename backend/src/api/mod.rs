//! HTTP API module.
//!
//! The transform service: multipart CSV in, normalized records and run report out.

pub mod server;
pub mod types;

pub use server::{router, start_server, AppState};
pub use types::*;
