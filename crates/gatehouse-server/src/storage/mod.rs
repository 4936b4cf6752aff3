//! SQLite storage for Gatehouse.
//!
//! Provides persistence for users (the credential store) and refresh-token
//! sessions (the session store).

mod db;
mod models;
mod sessions;
mod users;


pub use db::{AuthDatabase, DatabaseError};
pub use models::*;
