//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Bodies are collected
//! once under a size cap and routes see a plain `Request<Bytes>`.

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::PasswordGate;
use crate::config::Args;
use crate::export::ExportPipeline;
use crate::form::PageOptions;
use crate::routes::{self, form, BoxBody};
use crate::types::FormError;

/// Room for form fields and stroke JSON on top of an encoded upload
const BODY_OVERHEAD: usize = 256 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub gate: PasswordGate,
    pub options: PageOptions,
    /// Origins echoed in CORS headers
    pub dev_origins: Vec<String>,
    /// Running exports, shared by every request
    pub exports: ExportPipeline,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args) -> Self {
        Self {
            gate: args.password_gate(),
            options: args.page_options(),
            dev_origins: args.dev_origin_list(),
            exports: ExportPipeline::new(),
            started_at: Instant::now(),
            args,
        }
    }

    /// Largest request body accepted
    ///
    /// An upload arrives base64-encoded inside a urlencoded body, which can
    /// roughly double its size.
    pub fn body_limit(&self) -> usize {
        self.args
            .max_upload_bytes
            .saturating_mul(2)
            .saturating_add(BODY_OVERHEAD)
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), FormError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Declaration desk listening on {}", state.args.listen);

    if !state.options.require_auth {
        warn!("Password gate disabled - the form is open to anyone");
    } else if !state.gate.is_configured() {
        warn!("FORM_PASSWORD not set - password checks will fail with a configuration error");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let bytes = match Limited::new(body, state.body_limit()).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("[{}] Rejected request body: {}", addr, e);
            let mut response = routes::json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &routes::response::ErrorResponse {
                    error: "Request body too large or unreadable".to_string(),
                    code: "BODY_REJECTED",
                },
            );
            routes::apply_cors(&mut response, &parts.headers, &state.dev_origins);
            return Ok(response);
        }
    };

    Ok(route(&state, Request::from_parts(parts, bytes)).await)
}

/// Dispatch a collected request
pub async fn route(state: &AppState, req: Request<Bytes>) -> Response<BoxBody> {
    let path = req.uri().path().to_string();

    let mut response = match (req.method().clone(), path.as_str()) {
        (Method::OPTIONS, _) => routes::preflight_response(),

        // JSON API; the handlers answer 405 for other verbs themselves
        (_, "/api/check-auth") => routes::check_auth(&req),
        (_, "/api/verify-password") => routes::verify_password(&state.gate, &req),

        (Method::GET, "/") => form::index(state, &req),
        (_, "/form/preview") => form::preview(state, &req).await,
        (_, "/form/edit") => form::edit(state, &req).await,
        (_, "/form/export") => form::export(state, &req).await,
        (Method::GET, "/assets/form.js") => form::script(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),
        (Method::GET, "/version") => routes::version_info(),

        _ => routes::not_found_response(&path),
    };

    routes::apply_cors(&mut response, req.headers(), &state.dev_origins);
    response
}
