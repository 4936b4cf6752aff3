//! Authentication primitives for Gatehouse.
//!
//! Provides JWT token pairs, refresh-token session hashing and password
//! hashing. Nothing here touches storage.

pub mod claims;
pub mod issuer;
pub mod password;

pub use claims::{Claims, TokenPayload, TokenType};
pub use issuer::{TokenError, TokenIssuer, TokenPair};
