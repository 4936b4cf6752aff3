//! The auth orchestrator: registration, login, refresh rotation and logout
//! on top of the credential store, session store and token issuer.

mod auth_svc;
mod error;


pub use auth_svc::{AuthResponse, AuthService, UserProfile};
pub use error::{AuthError, UNAUTHORIZED};
