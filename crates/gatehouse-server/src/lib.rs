//! Gatehouse Auth Server Library
//!
//! Core functionality for the Gatehouse auth service:
//! - SQLite storage for users and refresh-token sessions
//! - JWT token pairs and argon2id password hashing
//! - The auth orchestrator (register, login, refresh rotation, logout)
//! - REST transport over axum

pub mod auth;
pub mod http;
pub mod service;
pub mod storage;
