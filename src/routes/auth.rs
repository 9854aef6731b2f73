//! Password gate and auth check endpoints
//!
//! - POST /api/verify-password: `{password}` → `{success, message?}` + session cookie
//! - GET  /api/check-auth:      `{authenticated}` from the session cookie

use bytes::Bytes;
use chrono::Utc;
use hyper::{header, Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::response::{json_response, BoxBody};
use crate::auth::{is_authenticated, PasswordGate};
use crate::types::FormError;

#[derive(Debug, Default, Deserialize)]
struct PasswordRequest {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
}

fn failure(status: StatusCode, message: &str) -> Response<BoxBody> {
    json_response(
        status,
        &VerifyResponse {
            success: false,
            message: Some(message.to_string()),
        },
    )
}

/// Handle POST /api/verify-password
pub fn verify_password(gate: &PasswordGate, req: &Request<Bytes>) -> Response<BoxBody> {
    if req.method() != Method::POST {
        return failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    // An unreadable body counts as a missing password
    let body: PasswordRequest = serde_json::from_slice(req.body()).unwrap_or_default();

    match gate.verify(body.password.as_deref(), Utc::now()) {
        Ok(cookie) => {
            info!(expires = %cookie.expires, "Password accepted");
            let mut response = json_response(
                StatusCode::OK,
                &VerifyResponse {
                    success: true,
                    message: None,
                },
            );
            if let Ok(value) = cookie.header_value().parse() {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        Err(FormError::Configuration(detail)) => {
            warn!(%detail, "Password check attempted without a configured secret");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error")
        }
        Err(e) => {
            if matches!(e, FormError::Authentication) {
                warn!("Incorrect password submitted");
            }
            failure(e.status_code(), &e.to_string())
        }
    }
}

/// Handle GET /api/check-auth
pub fn check_auth(req: &Request<Bytes>) -> Response<BoxBody> {
    if req.method() != Method::GET {
        return json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &CheckAuthResponse {
                authenticated: false,
            },
        );
    }
    json_response(
        StatusCode::OK,
        &CheckAuthResponse {
            authenticated: is_authenticated(req.headers()),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DEFAULT_SESSION_DAYS;

    fn post(body: &'static str) -> Request<Bytes> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/verify-password")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    fn gate() -> PasswordGate {
        PasswordGate::new(Some("abc123".into()), DEFAULT_SESSION_DAYS)
    }

    #[test]
    fn test_unparseable_body_is_missing_password() {
        let response = verify_password(&gate(), &post("not json"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cookie_set_on_match() {
        let response = verify_password(&gate(), &post(r#"{"password":"abc123"}"#));
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("form_authenticated=true;"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn test_check_auth_rejects_post() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/check-auth")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(check_auth(&req).status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
