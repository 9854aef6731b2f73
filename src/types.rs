//! Shared error type for the declaration service

use hyper::StatusCode;

/// Errors surfaced by the gate, the form session and the export pipeline
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// Required input was missing or empty
    #[error("{0}")]
    Validation(String),

    /// Submitted password did not match
    #[error("Incorrect password")]
    Authentication,

    /// Server is missing required configuration
    #[error("Server configuration error: {0}")]
    Configuration(String),

    /// Endpoint called with the wrong HTTP verb
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Rasterization or PDF assembly failed
    #[error("Export failed: {0}")]
    ExportFailure(String),

    /// Another export for this form is still running
    #[error("An export is already in progress")]
    ExportInFlight,

    /// Export requested outside of preview mode
    #[error("Export is only available in preview mode")]
    NotPreviewing,

    /// Signature upload is switched off for this page
    #[error("Signature upload is disabled")]
    UploadDisabled,

    /// Signature payload could not be decoded as an image
    #[error("Invalid signature image: {0}")]
    SignatureDecode(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            FormError::Validation(_) => StatusCode::BAD_REQUEST,
            FormError::Authentication => StatusCode::UNAUTHORIZED,
            FormError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            FormError::ExportFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormError::ExportInFlight => StatusCode::CONFLICT,
            FormError::NotPreviewing => StatusCode::CONFLICT,
            FormError::UploadDisabled => StatusCode::FORBIDDEN,
            FormError::SignatureDecode(_) => StatusCode::BAD_REQUEST,
            FormError::Http(_) => StatusCode::BAD_REQUEST,
            FormError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<lopdf::Error> for FormError {
    fn from(e: lopdf::Error) -> Self {
        FormError::ExportFailure(format!("PDF assembly: {e}"))
    }
}

impl From<image::ImageError> for FormError {
    fn from(e: image::ImageError) -> Self {
        FormError::SignatureDecode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FormError>;
