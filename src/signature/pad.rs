//! Freehand drawing pad

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

use super::SignatureImage;
use crate::types::{FormError, Result};

/// Pad size in CSS pixels
pub const PAD_WIDTH: u32 = 250;
pub const PAD_HEIGHT: u32 = 100;

/// Blue ink on a transparent background
const PEN_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const PEN_RADIUS: i32 = 1;

/// Distance between stamped pen dots along a segment
const STEP: f32 = 0.5;

/// Limits on a posted drawing
pub const MAX_STROKES: usize = 200;
pub const MAX_POINTS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One continuous pen movement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parse the stroke list posted by the page (`[[{"x":..,"y":..}, ..], ..]`)
///
/// At most `MAX_STROKES` non-empty strokes holding `MAX_POINTS` points in total.
pub fn parse_strokes(json: &str) -> Result<Vec<Stroke>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let strokes: Vec<Stroke> = serde_json::from_str(json)
        .map_err(|e| FormError::Validation(format!("Invalid signature strokes: {e}")))?;
    let strokes: Vec<Stroke> = strokes.into_iter().filter(|s| !s.is_empty()).collect();

    if strokes.len() > MAX_STROKES {
        return Err(FormError::Validation(format!(
            "Signature has more than {MAX_STROKES} strokes"
        )));
    }
    let points: usize = strokes.iter().map(|s| s.points.len()).sum();
    if points > MAX_POINTS {
        return Err(FormError::Validation(format!(
            "Signature has more than {MAX_POINTS} points"
        )));
    }
    Ok(strokes)
}

/// Rasterize strokes onto a transparent pad-sized PNG
pub fn render_strokes(strokes: &[Stroke]) -> Result<SignatureImage> {
    let mut pad = RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, Rgba([0, 0, 0, 0]));

    for stroke in strokes {
        let mut points = stroke.points.iter().map(|p| clamp(*p));
        let Some(first) = points.next() else { continue };
        stamp(&mut pad, first);

        let mut prev = first;
        for next in points {
            let dx = next.x - prev.x;
            let dy = next.y - prev.y;
            let steps = ((dx * dx + dy * dy).sqrt() / STEP).ceil().max(1.0) as usize;
            for i in 1..=steps {
                let t = i as f32 / steps as f32;
                stamp(
                    &mut pad,
                    Point {
                        x: prev.x + dx * t,
                        y: prev.y + dy * t,
                    },
                );
            }
            prev = next;
        }
    }

    SignatureImage::from_rgba(pad)
}

fn clamp(p: Point) -> Point {
    Point {
        x: p.x.clamp(0.0, (PAD_WIDTH - 1) as f32),
        y: p.y.clamp(0.0, (PAD_HEIGHT - 1) as f32),
    }
}

fn stamp(pad: &mut RgbaImage, p: Point) {
    draw_filled_circle_mut(pad, (p.x.round() as i32, p.y.round() as i32), PEN_RADIUS, PEN_COLOR);
}
