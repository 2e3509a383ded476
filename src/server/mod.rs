//! Server core functionality
//!
//! This module contains the HTTP server bootstrap and its routes.

pub mod core;
pub mod routes;

pub use self::core::Server;
pub use routes::{AppState, router};
