//! Form state: field values, mode and signature

use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::fields::{FieldName, FormFields};
use crate::export::{ExportPipeline, ExportedPdf};
use crate::render::{self, RenderedDocument};
use crate::signature::{decode_data_url, parse_strokes, SignatureCapture, Stroke};
use crate::types::{FormError, Result};

/// Default cap on an uploaded signature file
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Flags selecting the page variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub require_auth: bool,
    pub allow_signature_upload: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            require_auth: true,
            allow_signature_upload: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Edit,
    Preview,
}

/// Page state as posted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormSubmission {
    #[serde(flatten)]
    pub fields: FormFields,
    /// JSON stroke list from the drawing pad
    pub strokes: String,
    /// Data URL of an uploaded signature image
    pub upload: String,
    /// Token naming this page across its posts
    pub page: String,
}

/// One user's form
#[derive(Debug)]
pub struct FormSession {
    page_id: String,
    fields: FormFields,
    mode: Mode,
    signature: SignatureCapture,
    options: PageOptions,
    max_upload_bytes: usize,
}

impl FormSession {
    pub fn new(options: PageOptions) -> Self {
        Self {
            page_id: Uuid::new_v4().to_string(),
            fields: FormFields::default(),
            mode: Mode::Edit,
            signature: SignatureCapture::new(),
            options,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Token carried by the page; one export per token runs at a time
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn field(&self, name: FieldName) -> &str {
        self.fields.get(name)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> PageOptions {
        self.options
    }

    pub fn signature(&self) -> &SignatureCapture {
        &self.signature
    }

    pub fn replace_field(&mut self, name: FieldName, value: impl Into<String>) {
        self.fields.replace(name, value);
    }

    /// Switch mode; entering preview captures the pad if nothing is captured yet
    pub async fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Preview && self.mode != Mode::Preview {
            self.signature.capture_for_preview().await;
        }
        debug!(from = ?self.mode, to = ?mode, "Form mode change");
        self.mode = mode;
    }

    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.signature.add_stroke(stroke);
    }

    pub fn clear_signature(&mut self) {
        self.signature.clear();
    }

    /// Use an uploaded image as the signature
    pub async fn upload_signature(&mut self, bytes: Vec<u8>) -> Result<()> {
        if !self.options.allow_signature_upload {
            return Err(FormError::UploadDisabled);
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(FormError::Validation(format!(
                "Signature image exceeds {} bytes",
                self.max_upload_bytes
            )));
        }
        self.signature.upload(bytes).await
    }

    /// Apply the full page state posted by the browser
    ///
    /// An upload wins over strokes, matching what the page shows. A missing
    /// or malformed page token is replaced with a fresh one.
    pub async fn apply_submission(&mut self, submission: FormSubmission) -> Result<()> {
        let FormSubmission {
            fields,
            strokes,
            upload,
            page,
        } = submission;

        fields.check_lengths()?;
        self.fields = fields;
        if let Ok(token) = Uuid::parse_str(page.trim()) {
            self.page_id = token.to_string();
        }

        self.signature.clear();
        if !upload.trim().is_empty() {
            let bytes = decode_data_url(&upload)?;
            self.upload_signature(bytes).await?;
        } else {
            for stroke in parse_strokes(&strokes)? {
                self.signature.add_stroke(stroke);
            }
        }
        Ok(())
    }

    /// Visual tree for the current state
    pub fn render(&self) -> RenderedDocument {
        render::render(&self.fields, self.mode, &self.signature, self.options)
    }

    /// Export the preview as a PDF
    ///
    /// Rejected outside preview mode and while another export of this page is
    /// running in `pipeline`. Leaves fields and mode untouched either way.
    pub async fn export(&self, pipeline: &ExportPipeline) -> Result<ExportedPdf> {
        if self.mode != Mode::Preview {
            return Err(FormError::NotPreviewing);
        }
        let document = self.render();
        let pdf = pipeline.export(&self.page_id, &document).await?;
        info!(bytes = pdf.bytes.len(), file = pdf.file_name, "Declaration exported");
        Ok(pdf)
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new(PageOptions::default())
    }
}
