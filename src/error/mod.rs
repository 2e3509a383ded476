//! Error handling
//!
//! Defines error types and handling for the file manager.

pub mod handlers;
pub mod types;

pub use handlers::{error_to_status, handle_error};
pub use types::*;
