//! Authentication for the declaration form
//!
//! Provides:
//! - Shared-password verification against the configured secret
//! - Session cookie issuing and checking

pub mod gate;
pub mod session;

pub use gate::{PasswordGate, DEFAULT_SESSION_DAYS, MAX_SESSION_DAYS};
pub use session::{cookie_value, is_authenticated, SessionCookie, SESSION_COOKIE};
