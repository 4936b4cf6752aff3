//! The `AuthDatabase` handle over the users and sessions tables.

pub use gatehouse_core::db::DatabaseError;

gatehouse_core::define_database!(AuthDatabase, "auth");
