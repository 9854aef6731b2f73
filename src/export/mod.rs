//! Export pipeline
//!
//! Rasterizes a rendered preview at 2× density and wraps the bitmap in a
//! single A4 page. The pipeline lives in shared state and runs at most one
//! export per page token at a time.

pub mod pdf;
pub mod raster;

use dashmap::DashMap;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::form::Mode;
use crate::render::RenderedDocument;
use crate::types::{FormError, Result};

/// Name of the downloaded file
pub const FILE_NAME: &str = "self-declaration-form.pdf";

/// A finished export
#[derive(Clone)]
pub struct ExportedPdf {
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ExportedPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedPdf")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Export runner with an in-flight guard per page
#[derive(Default)]
pub struct ExportPipeline {
    /// Start time of each running export by page token
    in_flight: DashMap<String, Instant>,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("running", &self.running())
            .finish()
    }
}

/// Held while an export runs; releases the page on drop
#[derive(Debug)]
pub struct ExportTicket<'a> {
    pipeline: &'a ExportPipeline,
    page: String,
}

impl Drop for ExportTicket<'_> {
    fn drop(&mut self) {
        self.pipeline.in_flight.remove(&self.page);
    }
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `page`, or `None` if an export of it is already running
    pub fn try_begin(&self, page: &str) -> Option<ExportTicket<'_>> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(page.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(ExportTicket {
                    pipeline: self,
                    page: page.to_string(),
                })
            }
        }
    }

    pub fn is_busy(&self, page: &str) -> bool {
        self.in_flight.contains_key(page)
    }

    /// Exports currently running across all pages
    pub fn running(&self) -> usize {
        self.in_flight.len()
    }

    /// Rasterize and assemble the PDF on the blocking pool
    pub async fn export(&self, page: &str, document: &RenderedDocument) -> Result<ExportedPdf> {
        if document.mode != Mode::Preview {
            return Err(FormError::NotPreviewing);
        }
        let Some(_ticket) = self.try_begin(page) else {
            warn!(page, "Export already running for this page");
            return Err(FormError::ExportInFlight);
        };

        let export_id = Uuid::new_v4();
        let document = document.clone();
        info!(%export_id, page, "Export started");

        let result = tokio::task::spawn_blocking(move || {
            let bitmap = raster::rasterize(&document)?;
            pdf::assemble(&bitmap)
        })
        .await
        .map_err(|e| FormError::ExportFailure(format!("export task failed: {e}")))
        .and_then(|inner| inner);

        match result {
            Ok(bytes) => {
                info!(%export_id, bytes = bytes.len(), "Export finished");
                Ok(ExportedPdf {
                    file_name: FILE_NAME,
                    bytes,
                })
            }
            Err(e) => {
                error!(%export_id, error = %e, "Export failed");
                Err(e)
            }
        }
    }
}
