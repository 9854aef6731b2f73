//! HTTP route handlers
//!
//! Handlers take the collected `Request<Bytes>` and return a finished
//! response; `server::route` does the dispatch.

pub mod auth;
pub mod form;
pub mod health;
pub mod response;

pub use auth::{check_auth, verify_password};
pub use health::{health_check, version_info};
pub use response::{
    apply_cors, error_response, json_response, not_found_response, preflight_response, BoxBody,
};
