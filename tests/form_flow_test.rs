//! Form round-trip integration tests
//!
//! Edit → Preview → Edit → Export over the HTTP routes, with both signature
//! sources.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use clap::Parser;
use http_body_util::BodyExt;
use hyper::{header, Method, Request, Response, StatusCode};
use image::{ImageOutputFormat, Rgba, RgbaImage};
use lopdf::{Document, Object};
use std::io::Cursor;

use declaration_desk::auth::{PasswordGate, DEFAULT_SESSION_DAYS};
use declaration_desk::config::Args;
use declaration_desk::form::PageOptions;
use declaration_desk::routes::BoxBody;
use declaration_desk::server::{route, AppState};
use declaration_desk::signature::MAX_POINTS;

// ============================================================================
// Helpers
// ============================================================================

const STROKES: &str = r#"[[{"x":10,"y":80},{"x":60,"y":20},{"x":120,"y":70},{"x":230,"y":30}]]"#;
const PAGE: &str = "5f0c6a2e-8d1b-4c3a-9e7f-2b4d6a8c0e1f";

fn state_with(options: PageOptions) -> AppState {
    let args = Args::try_parse_from(["declaration-desk"]).unwrap();
    let mut state = AppState::new(args);
    state.gate = PasswordGate::new(Some("abc123".into()), DEFAULT_SESSION_DAYS);
    state.options = options;
    state
}

fn state() -> AppState {
    state_with(PageOptions::default())
}

fn filled_fields() -> Vec<(&'static str, String)> {
    vec![
        ("hofName", "Asha Rao".to_string()),
        ("hofAddress1", "12 Lake View Road".to_string()),
        ("hofAddress2", "Pune 411001".to_string()),
        ("hofAadhaar", "1234 5678 9012".to_string()),
        ("residentName", "Ravi Rao".to_string()),
        ("residentAadhaar", "2345 6789 0123".to_string()),
        ("relationship", "Son".to_string()),
        ("residentName2", "Ravi Rao".to_string()),
        ("residentName3", "Ravi Rao".to_string()),
        ("date", "2024-03-05".to_string()),
    ]
}

fn post(path: &str, pairs: &[(&str, String)]) -> Request<Bytes> {
    let body = serde_urlencoded::to_string(pairs).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::COOKIE, "form_authenticated=true")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from(body))
        .unwrap()
}

fn with_signature(mut pairs: Vec<(&'static str, String)>, strokes: &str, upload: &str) -> Vec<(&'static str, String)> {
    pairs.push(("strokes", strokes.to_string()));
    pairs.push(("upload", upload.to_string()));
    pairs
}

async fn text(response: Response<BoxBody>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn png_data_url() -> String {
    let mut img = RgbaImage::from_pixel(120, 40, Rgba([0, 0, 0, 0]));
    for x in 10..110 {
        img.put_pixel(x, 20, Rgba([20, 20, 200, 255]));
    }
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageOutputFormat::Png).unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner()))
}

// ============================================================================
// Mode transitions
// ============================================================================

#[tokio::test]
async fn test_preview_renders_static_values() {
    let pairs = with_signature(filled_fields(), "[]", "");
    let response = route(&state(), post("/form/preview", &pairs)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = text(response).await;
    assert!(html.contains("data-field=\"hofName\""));
    assert!(html.contains(">Asha Rao</span>"));
    assert!(html.contains(">05/03/2024</span>"));
    assert!(html.contains("Download as PDF"));
    assert!(!html.contains("<canvas id=\"signature-pad\""));
    // raw values carried for the next request
    assert!(html.contains("<input type=\"hidden\" name=\"date\" value=\"2024-03-05\">"));
}

#[tokio::test]
async fn test_empty_preview_fields_use_nbsp() {
    let response = route(&state(), post("/form/preview", &[])).await;
    let html = text(response).await;
    assert!(html.contains("data-field=\"residentName\" style=\"min-width:200px\">\u{00A0}</span>"));
}

#[tokio::test]
async fn test_edit_keeps_values() {
    let pairs = with_signature(filled_fields(), STROKES, "");
    let html = text(route(&state(), post("/form/edit", &pairs)).await).await;

    assert!(html.contains("name=\"hofName\" value=\"Asha Rao\""));
    assert!(html.contains("type=\"date\""));
    assert!(html.contains("value=\"2024-03-05\""));
    assert!(html.contains("<canvas id=\"signature-pad\""));
    assert!(html.contains("Preview Form"));
}

#[tokio::test]
async fn test_markup_in_values_is_escaped() {
    let mut pairs = filled_fields();
    pairs[0].1 = "<script>alert(1)</script>".to_string();
    let html = text(route(&state(), post("/form/preview", &pairs)).await).await;
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn test_page_token_survives_round_trip() {
    let mut pairs = filled_fields();
    pairs.push(("page", PAGE.to_string()));
    let html = text(route(&state(), post("/form/preview", &pairs)).await).await;
    assert!(html.contains(&format!("<input type=\"hidden\" name=\"page\" value=\"{PAGE}\">")));
}

#[tokio::test]
async fn test_oversized_field_rejected() {
    let mut pairs = filled_fields();
    pairs[1].1 = "ab ".repeat(350_000);
    for path in ["/form/preview", "/form/export"] {
        let response = route(&state(), post(path, &pairs)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    }
}

#[tokio::test]
async fn test_malformed_strokes_rejected() {
    let pairs = with_signature(filled_fields(), "[[{", "");
    let response = route(&state(), post("/form/preview", &pairs)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Signature sources
// ============================================================================

#[tokio::test]
async fn test_freehand_signature_appears_in_preview() {
    let pairs = with_signature(filled_fields(), STROKES, "");
    let html = text(route(&state(), post("/form/preview", &pairs)).await).await;
    assert!(html.contains("<img class=\"signature\" alt=\"Signature\" src=\"data:image/png;base64,"));
}

#[tokio::test]
async fn test_oversized_drawing_rejected() {
    let point = r#"{"x":5,"y":5}"#;
    let strokes = format!("[[{}]]", vec![point; MAX_POINTS + 1].join(","));
    let pairs = with_signature(filled_fields(), &strokes, "");
    let response = route(&state(), post("/form/preview", &pairs)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preview_without_signature_shows_nothing() {
    let pairs = with_signature(filled_fields(), "[]", "");
    let html = text(route(&state(), post("/form/preview", &pairs)).await).await;
    assert!(!html.contains("<img class=\"signature\""));
}

#[tokio::test]
async fn test_uploaded_signature_replaces_pad() {
    let pairs = with_signature(filled_fields(), STROKES, &png_data_url());
    let html = text(route(&state(), post("/form/edit", &pairs)).await).await;

    assert!(html.contains("signature-upload-preview"));
    assert!(!html.contains("<canvas"));
    // strokes are dropped once the upload wins
    assert!(html.contains("id=\"signature-strokes\" value=\"[]\""));
}

#[tokio::test]
async fn test_upload_rejected_when_disabled() {
    let state = state_with(PageOptions {
        require_auth: true,
        allow_signature_upload: false,
    });
    let pairs = with_signature(filled_fields(), "", &png_data_url());
    let response = route(&state, post("/form/preview", &pairs)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_undecodable_upload_rejected() {
    let bogus = format!("data:image/png;base64,{}", STANDARD.encode(b"definitely not a png"));
    let pairs = with_signature(filled_fields(), "", &bogus);
    let response = route(&state(), post("/form/preview", &pairs)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_returns_single_page_pdf() {
    let pairs = with_signature(filled_fields(), STROKES, "");
    let response = route(&state(), post("/form/export", &pairs)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"self-declaration-form.pdf\""
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF-"));

    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let widths: Vec<i64> = doc
        .objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        })
        .filter(|dict| matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(n) if n == b"Image"))
        .filter_map(|dict| dict.get(b"Width").and_then(Object::as_i64).ok())
        .collect();
    // 21 cm sheet at 96 dpi, doubled
    assert_eq!(widths, vec![794 * 2]);
}

#[tokio::test]
async fn test_export_with_uploaded_signature() {
    let pairs = with_signature(filled_fields(), "", &png_data_url());
    let response = route(&state(), post("/form/export", &pairs)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_exports_of_one_page_admit_one() {
    let state = state();
    let mut pairs = with_signature(filled_fields(), "", "");
    pairs.push(("page", PAGE.to_string()));

    let (first, second) = tokio::join!(
        route(&state, post("/form/export", &pairs)),
        route(&state, post("/form/export", &pairs)),
    );
    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(state.exports.running(), 0);

    // the guard is released once the first export finishes
    let again = route(&state, post("/form/export", &pairs)).await;
    assert_eq!(again.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_export_rejected_while_page_export_running() {
    let state = state();
    let mut pairs = filled_fields();
    pairs.push(("page", PAGE.to_string()));

    let held = state.exports.try_begin(PAGE).unwrap();
    let response = route(&state, post("/form/export", &pairs)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut other = filled_fields();
    other.push(("page", "0b7e3c1a-4f2d-4e6b-8a9c-1d3f5b7d9e2a".to_string()));
    let response = route(&state, post("/form/export", &other)).await;
    assert_eq!(response.status(), StatusCode::OK);

    drop(held);
}
