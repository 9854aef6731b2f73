//! Encoded signature raster

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::io::{Limits, Reader};
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use std::io::Cursor;

use crate::types::{FormError, Result};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Largest upload accepted on either side, in pixels
pub const MAX_UPLOAD_DIMENSION: u32 = 4096;
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_UPLOAD_DIMENSION);
    limits.max_image_height = Some(MAX_UPLOAD_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// A signature image held as PNG bytes
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_len", &self.png.len())
            .finish()
    }
}

impl SignatureImage {
    /// Encode an in-memory raster as PNG
    pub fn from_rgba(raster: RgbaImage) -> Result<Self> {
        let (width, height) = raster.dimensions();
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(raster).write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
        Ok(Self { png, width, height })
    }

    /// Decode any supported image format and normalize it to PNG
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(FormError::SignatureDecode("empty image".into()));
        }
        let mut reader = Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| FormError::SignatureDecode(format!("unreadable image: {e}")))?;
        reader.limits(decode_limits());
        let decoded = reader.decode()?;
        Self::from_rgba(decoded.to_rgba8())
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        Self::decode(&decode_data_url(url)?)
    }

    pub fn to_data_url(&self) -> String {
        format!("{}{}", PNG_DATA_URL_PREFIX, B64.encode(&self.png))
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode back to pixels for compositing
    pub fn to_rgba(&self) -> Result<RgbaImage> {
        Ok(image::load_from_memory(&self.png)?.to_rgba8())
    }
}

/// Payload bytes of a base64 data URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| FormError::SignatureDecode("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FormError::SignatureDecode("data URL has no payload".into()))?;
    if !meta.ends_with(";base64") {
        return Err(FormError::SignatureDecode("data URL is not base64 encoded".into()));
    }
    if !meta.starts_with("image/") {
        return Err(FormError::SignatureDecode(format!("unsupported media type {meta}")));
    }
    B64.decode(payload.trim())
        .map_err(|e| FormError::SignatureDecode(format!("base64: {e}")))
}
