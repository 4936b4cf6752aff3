//! Gatehouse Core Library
//!
//! Shared functionality for Gatehouse components:
//! - Token configuration and duration parsing
//! - SQLite pool helpers and database errors
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::TokenConfig;
pub use error::{Error, Result};
