//! Signature capture
//!
//! Two producers share a single image slot: the freehand pad and an uploaded
//! image. Only one source is live at a time; switching to one discards the
//! other.

pub mod encoded;
pub mod pad;

pub use encoded::{decode_data_url, SignatureImage};
pub use pad::{
    parse_strokes, render_strokes, Point, Stroke, MAX_POINTS, MAX_STROKES, PAD_HEIGHT, PAD_WIDTH,
};

use tracing::{debug, warn};

use crate::types::{FormError, Result};

/// Where the live signature comes from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SignatureSource {
    #[default]
    None,
    Freehand(Vec<Stroke>),
    Uploaded(SignatureImage),
}

/// What the edit view should show in the signature area
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presented<'a> {
    Uploaded(&'a SignatureImage),
    Pad(&'a [Stroke]),
}

/// Signature state of one form
#[derive(Debug, Clone, Default)]
pub struct SignatureCapture {
    source: SignatureSource,
    image: Option<SignatureImage>,
}

impl SignatureCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> &SignatureSource {
        &self.source
    }

    /// Signature image used by the preview, if any
    pub fn image(&self) -> Option<&SignatureImage> {
        self.image.as_ref()
    }

    pub fn strokes(&self) -> &[Stroke] {
        match &self.source {
            SignatureSource::Freehand(strokes) => strokes,
            _ => &[],
        }
    }

    /// Whether the pad holds any stroke
    pub fn is_empty(&self) -> bool {
        self.strokes().is_empty()
    }

    /// Append a pen stroke
    ///
    /// Drawing replaces a live upload and invalidates any earlier snapshot so
    /// the next preview captures the new drawing.
    pub fn add_stroke(&mut self, stroke: Stroke) {
        if stroke.is_empty() {
            return;
        }
        match &mut self.source {
            SignatureSource::Freehand(strokes) => strokes.push(stroke),
            _ => self.source = SignatureSource::Freehand(vec![stroke]),
        }
        self.image = None;
    }

    /// Rasterize the current strokes
    pub fn snapshot(&self) -> Result<SignatureImage> {
        if self.is_empty() {
            return Err(FormError::Validation("Signature pad is empty".into()));
        }
        render_strokes(self.strokes())
    }

    /// Erase strokes, drop any upload and reset the stored image
    pub fn clear(&mut self) {
        self.source = SignatureSource::None;
        self.image = None;
    }

    /// Decode an uploaded file and make it the live signature
    ///
    /// Decoding runs on the blocking pool. On failure the previous state is kept.
    pub async fn upload(&mut self, bytes: Vec<u8>) -> Result<()> {
        let image = tokio::task::spawn_blocking(move || SignatureImage::decode(&bytes))
            .await
            .map_err(|e| FormError::SignatureDecode(format!("decoder task failed: {e}")))??;

        debug!(dimensions = ?image.dimensions(), "Signature upload decoded");
        self.source = SignatureSource::Uploaded(image.clone());
        self.image = Some(image);
        Ok(())
    }

    /// Best-effort capture of the pad before entering preview
    ///
    /// Does nothing when an image is already set or the pad is empty. The
    /// strokes are rasterized on the blocking pool.
    pub async fn capture_for_preview(&mut self) {
        if self.image.is_some() || self.is_empty() {
            return;
        }
        let strokes = self.strokes().to_vec();
        let snapshot = tokio::task::spawn_blocking(move || render_strokes(&strokes))
            .await
            .map_err(|e| FormError::ExportFailure(format!("snapshot task failed: {e}")))
            .and_then(|inner| inner);
        match snapshot {
            Ok(image) => self.image = Some(image),
            Err(e) => warn!(error = %e, "Signature snapshot failed, previewing without it"),
        }
    }

    pub fn presented(&self) -> Presented<'_> {
        match &self.source {
            SignatureSource::Uploaded(image) => Presented::Uploaded(image),
            _ => Presented::Pad(self.strokes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn stroke() -> Stroke {
        Stroke::new(vec![Point { x: 5.0, y: 5.0 }, Point { x: 60.0, y: 40.0 }])
    }

    fn png_file(color: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 12, Rgba(color)))
            .write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn test_upload_supersedes_freehand() {
        let mut capture = SignatureCapture::new();
        capture.add_stroke(stroke());
        capture.capture_for_preview().await;
        let freehand = capture.image().cloned().unwrap();

        let file = png_file([200, 0, 0, 255]);
        capture.upload(file.clone()).await.unwrap();

        assert!(capture.is_empty());
        let expected = SignatureImage::decode(&file).unwrap();
        assert_eq!(capture.image(), Some(&expected));
        assert_ne!(capture.image(), Some(&freehand));
        assert!(matches!(capture.presented(), Presented::Uploaded(_)));
    }

    #[tokio::test]
    async fn test_drawing_after_upload_drops_upload() {
        let mut capture = SignatureCapture::new();
        capture.upload(png_file([0, 0, 0, 255])).await.unwrap();

        capture.add_stroke(stroke());

        assert!(matches!(capture.source(), SignatureSource::Freehand(s) if s.len() == 1));
        assert!(capture.image().is_none());
        assert!(matches!(capture.presented(), Presented::Pad(_)));
    }

    #[tokio::test]
    async fn test_clear_removes_upload_and_strokes() {
        let mut capture = SignatureCapture::new();
        capture.add_stroke(stroke());
        capture.upload(png_file([0, 0, 0, 255])).await.unwrap();

        capture.clear();

        assert!(capture.is_empty());
        assert!(capture.image().is_none());
        assert_eq!(capture.source(), &SignatureSource::None);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_state() {
        let mut capture = SignatureCapture::new();
        capture.add_stroke(stroke());

        let err = capture.upload(b"nope".to_vec()).await.unwrap_err();

        assert!(matches!(err, FormError::SignatureDecode(_)));
        assert!(!capture.is_empty());
    }

    #[tokio::test]
    async fn test_capture_only_when_unset_and_non_empty() {
        let mut capture = SignatureCapture::new();
        capture.capture_for_preview().await;
        assert!(capture.image().is_none());

        capture.add_stroke(stroke());
        capture.capture_for_preview().await;
        let first = capture.image().cloned().unwrap();
        assert_eq!(Some(&first), capture.snapshot().ok().as_ref());

        capture.capture_for_preview().await;
        assert_eq!(capture.image(), Some(&first));
    }

    #[tokio::test]
    async fn test_new_stroke_invalidates_snapshot() {
        let mut capture = SignatureCapture::new();
        capture.add_stroke(stroke());
        capture.capture_for_preview().await;
        assert!(capture.image().is_some());

        capture.add_stroke(Stroke::new(vec![Point { x: 100.0, y: 80.0 }]));
        assert!(capture.image().is_none());
        assert_eq!(capture.strokes().len(), 2);
    }

    #[test]
    fn test_empty_stroke_is_ignored() {
        let mut capture = SignatureCapture::new();
        capture.add_stroke(Stroke::default());
        assert_eq!(capture.source(), &SignatureSource::None);
    }
}
