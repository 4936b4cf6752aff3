//! REST transport for the auth service.

mod error;
mod extract;
mod handlers;
mod routes;
mod validation;

pub use error::ApiError;
pub use routes::{AppState, build_router};
