//! Health check endpoints
//!
//! - /health, /healthz - Liveness probe, 200 while the process serves requests
//! - /version          - Build information for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::response::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    /// Whether a form password is configured
    #[serde(rename = "passwordConfigured")]
    pub password_configured: bool,
    #[serde(rename = "requireAuth")]
    pub require_auth: bool,
    #[serde(rename = "signatureUpload")]
    pub signature_upload: bool,
    #[serde(rename = "exportsRunning")]
    pub exports_running: usize,
}

/// Handle liveness probe (/health, /healthz)
///
/// A gate without a secret still reports healthy; the form is served but
/// password checks answer 500 until FORM_PASSWORD is set.
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let response = HealthResponse {
        healthy: true,
        status: if state.gate.is_configured() || !state.options.require_auth {
            "online"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        password_configured: state.gate.is_configured(),
        require_auth: state.options.require_auth,
        signature_upload: state.options.allow_signature_upload,
        exports_running: state.exports.running(),
    };
    json_response(StatusCode::OK, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "declaration-desk",
    };
    json_response(StatusCode::OK, &response)
}
