//! File system storage management
//!
//! Handles path sandboxing and the file operations built on it.

pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

// Re-export commonly used validation items
pub use validation::{Sandbox, validate_filename};
