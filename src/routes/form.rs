//! Form page and export endpoints
//!
//! Every POST carries the whole page state (fields, stroke JSON, uploaded
//! image, page token) and a fresh `FormSession` is rebuilt from it. The only
//! server-side state is the export guard in `AppState`, keyed by page token.

use bytes::Bytes;
use hyper::{header, Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use super::response::{error_response, full_body, html_response, see_other, BoxBody};
use crate::auth::is_authenticated;
use crate::form::{FormSession, FormSubmission, Mode};
use crate::render::html;
use crate::server::AppState;
use crate::types::{FormError, Result};

static FORM_SCRIPT: &str = include_str!("../../assets/form.js");

fn new_session(state: &AppState) -> FormSession {
    FormSession::new(state.options).with_upload_limit(state.args.max_upload_bytes)
}

fn gate_passed(state: &AppState, req: &Request<Bytes>) -> bool {
    !state.options.require_auth || is_authenticated(req.headers())
}

/// Handle GET /
pub fn index(state: &AppState, req: &Request<Bytes>) -> Response<BoxBody> {
    if !gate_passed(state, req) {
        return html_response(StatusCode::OK, html::password_page(None));
    }
    html_response(StatusCode::OK, html::form_page(&new_session(state)))
}

/// Handle GET /assets/form.js
pub fn script() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/javascript; charset=utf-8")
        .header("Cache-Control", "no-cache")
        .body(full_body(FORM_SCRIPT))
        .unwrap()
}

/// Rebuild the posted page state, or the response that ends the request
async fn posted_session(
    state: &AppState,
    req: &Request<Bytes>,
) -> std::result::Result<FormSession, Response<BoxBody>> {
    if req.method() != Method::POST {
        return Err(error_response(&FormError::MethodNotAllowed));
    }
    if !gate_passed(state, req) {
        debug!(path = %req.uri().path(), "Form post without session cookie");
        return Err(see_other("/"));
    }

    let submission: FormSubmission = serde_urlencoded::from_bytes(req.body())
        .map_err(|e| error_response(&FormError::Http(format!("Invalid form body: {e}"))))?;

    let mut session = new_session(state);
    session
        .apply_submission(submission)
        .await
        .map_err(|e| {
            warn!(error = %e, "Rejected form submission");
            error_response(&e)
        })?;
    Ok(session)
}

/// Handle POST /form/preview
pub async fn preview(state: &AppState, req: &Request<Bytes>) -> Response<BoxBody> {
    match posted_session(state, req).await {
        Ok(mut session) => {
            session.set_mode(Mode::Preview).await;
            html_response(StatusCode::OK, html::form_page(&session))
        }
        Err(response) => response,
    }
}

/// Handle POST /form/edit
pub async fn edit(state: &AppState, req: &Request<Bytes>) -> Response<BoxBody> {
    match posted_session(state, req).await {
        Ok(mut session) => {
            session.set_mode(Mode::Edit).await;
            html_response(StatusCode::OK, html::form_page(&session))
        }
        Err(response) => response,
    }
}

async fn export_session(state: &AppState, mut session: FormSession) -> Result<Response<BoxBody>> {
    session.set_mode(Mode::Preview).await;
    let pdf = session.export(&state.exports).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", pdf.file_name),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(full_body(pdf.bytes))
        .unwrap())
}

/// Handle POST /form/export
pub async fn export(state: &AppState, req: &Request<Bytes>) -> Response<BoxBody> {
    match posted_session(state, req).await {
        Ok(session) => export_session(state, session)
            .await
            .unwrap_or_else(|e| error_response(&e)),
        Err(response) => response,
    }
}
