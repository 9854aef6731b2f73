//! Response builders shared by the route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;

use crate::types::FormError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Error body used by the page and export routes
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(full_body(json))
        .unwrap()
}

pub fn html_response(status: StatusCode, html: String) -> Response<BoxBody> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Cache-Control", "no-store")
        .body(full_body(html))
        .unwrap()
}

/// Redirect after a POST
pub fn see_other(location: &str) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header("Location", location)
        .body(empty_body())
        .unwrap()
}

pub fn error_response(err: &FormError) -> Response<BoxBody> {
    let code = match err {
        FormError::Validation(_) => "VALIDATION_ERROR",
        FormError::Authentication => "AUTHENTICATION_ERROR",
        FormError::Configuration(_) => "CONFIGURATION_ERROR",
        FormError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        FormError::ExportFailure(_) => "EXPORT_FAILED",
        FormError::ExportInFlight => "EXPORT_IN_FLIGHT",
        FormError::NotPreviewing => "NOT_PREVIEWING",
        FormError::UploadDisabled => "UPLOAD_DISABLED",
        FormError::SignatureDecode(_) => "INVALID_SIGNATURE",
        FormError::Http(_) => "BAD_REQUEST",
        FormError::Io(_) => "INTERNAL_ERROR",
    };
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code,
        },
    )
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

/// CORS preflight; the allowed origin is attached by `apply_cors`
pub fn preflight_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

/// Whether a request origin is one of the configured development origins
///
/// Entries may be full origins or bare host names.
pub fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    let host = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    allowed
        .iter()
        .any(|entry| entry == origin || entry.as_str() == host)
}

/// Echo an allowed request origin back in the CORS headers
pub fn apply_cors(response: &mut Response<BoxBody>, request_headers: &HeaderMap, allowed: &[String]) {
    let Some(origin) = request_headers.get(header::ORIGIN) else {
        return;
    };
    let Ok(origin_str) = origin.to_str() else {
        return;
    };
    if !origin_allowed(origin_str, allowed) {
        return;
    }
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_matching() {
        let allowed = vec!["https://a.example".to_string(), "x.replit.dev".to_string()];
        assert!(origin_allowed("https://a.example", &allowed));
        assert!(origin_allowed("https://x.replit.dev", &allowed));
        assert!(!origin_allowed("https://evil.example", &allowed));
        assert!(!origin_allowed("http://a.example", &allowed));
    }

    #[test]
    fn test_apply_cors_echoes_allowed_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://x.replit.dev"));
        let allowed = vec!["x.replit.dev".to_string()];

        let mut response = preflight_response();
        apply_cors(&mut response, &headers, &allowed);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://x.replit.dev"
        );

        let mut response = preflight_response();
        apply_cors(&mut response, &headers, &[]);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_error_response_status() {
        let response = error_response(&FormError::ExportInFlight);
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
