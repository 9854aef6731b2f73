//! Preview rasterization
//!
//! Lays the rendered document out on a 21 cm sheet (CSS pixels at 96 dpi) and
//! paints it onto an opaque white bitmap at `PIXEL_RATIO` density. Layout and
//! painting are separate passes because the sheet grows with its content.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rusttype::{point, Font, Scale};

use crate::render::{
    Block, FieldSlot, FieldWidth, Inline, Paragraph, RenderedDocument, SignatureArea, Signoff,
};
use crate::types::{FormError, Result};

static SERIF_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSerif.ttf");
static SERIF_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSerif-Bold.ttf");
static SERIF_ITALIC: &[u8] = include_bytes!("../../assets/fonts/DejaVuSerif-Italic.ttf");

pub const PIXEL_RATIO: f32 = 2.0;

/// 21 cm × 29.7 cm in CSS pixels
pub const SHEET_WIDTH: f32 = 794.0;
pub const SHEET_MIN_HEIGHT: f32 = 1123.0;
/// Tallest sheet painted; anything past the first 29.7 cm is clipped anyway
pub const SHEET_MAX_HEIGHT: f32 = SHEET_MIN_HEIGHT * 3.0;
const PADDING: f32 = 75.6;

const BODY_SIZE: f32 = 16.0;
const BODY_LINE: f32 = BODY_SIZE * 1.8;
const NORMAL_LINE: f32 = BODY_SIZE * 1.2;
const BANNER_SIZE: f32 = 17.6;
const BANNER_LINE_HEIGHT: f32 = 1.4;
const BANNER_PADDING: f32 = 10.0;
const NOTE_SIZE: f32 = 13.6;
const NOTE_LINE: f32 = NOTE_SIZE * 1.2;

const CLAUSE_INDENT: f32 = 30.0;
const MARKER_WIDTH: f32 = 20.0;
const FIELD_PADDING: f32 = 4.0;
const BLOCK_FIELD_MARGIN: f32 = 5.0;
const PARAGRAPH_GAP: f32 = 10.0;
const SECTION_GAP: f32 = 15.0;
const BANNER_GAP: f32 = 20.0;
const SIGNOFF_GAP: f32 = 50.0;
const NOTES_GAP: f32 = 40.0;
const SIGNATURE_MAX_WIDTH: f32 = 250.0;
const SIGNATURE_MAX_HEIGHT: f32 = 125.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const BRAND_RED: Rgb<u8> = Rgb([0xe3, 0x06, 0x13]);
const BORDER_GREY: Rgb<u8> = Rgb([0xcc, 0xcc, 0xcc]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
}

/// Embedded serif family used for every export
pub struct Fonts {
    regular: Font<'static>,
    bold: Font<'static>,
    italic: Font<'static>,
}

impl Fonts {
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            regular: load_font(SERIF_REGULAR, "regular")?,
            bold: load_font(SERIF_BOLD, "bold")?,
            italic: load_font(SERIF_ITALIC, "italic")?,
        })
    }

    fn face(&self, face: Face) -> &Font<'static> {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
        }
    }

    /// Advance width of `text` at `size` pixels
    pub fn measure(&self, face: Face, size: f32, text: &str) -> f32 {
        self.face(face)
            .layout(text, Scale::uniform(size), point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

fn load_font(bytes: &'static [u8], name: &str) -> Result<Font<'static>> {
    Font::try_from_bytes(bytes)
        .ok_or_else(|| FormError::ExportFailure(format!("embedded {name} font is unreadable")))
}

/// Painting instruction in CSS pixels
#[derive(Debug, Clone)]
enum DrawOp {
    Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb<u8>,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        color: Rgb<u8>,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: RgbaImage,
    },
}

/// Positioned sheet content
pub struct Layout {
    pub width: f32,
    pub height: f32,
    ops: Vec<DrawOp>,
}

/// Rasterized sheet plus the CSS size it was laid out at
pub struct Bitmap {
    pub image: RgbImage,
    pub node_width: u32,
    pub node_height: u32,
}

/// Lay out and paint a preview document
pub fn rasterize(document: &RenderedDocument) -> Result<Bitmap> {
    let fonts = Fonts::embedded()?;
    let layout = layout(document, &fonts)?;
    Ok(paint(&layout, &fonts, PIXEL_RATIO))
}

pub fn layout(document: &RenderedDocument, fonts: &Fonts) -> Result<Layout> {
    let mut ops = Vec::new();
    let mut y = PADDING;

    for block in &document.blocks {
        match block {
            Block::Banner(lines) => y = banner(&mut ops, fonts, lines),
            Block::Paragraph(p) => y = paragraph(&mut ops, fonts, p, y) + SECTION_GAP,
            Block::Signoff(s) => y = signoff(&mut ops, fonts, s, y + SIGNOFF_GAP)?,
            Block::Notes { heading, items } => y = notes(&mut ops, fonts, heading, items, y + NOTES_GAP),
        }
        if y + PADDING > SHEET_MAX_HEIGHT {
            return Err(FormError::ExportFailure(format!(
                "form content runs past {SHEET_MAX_HEIGHT} px"
            )));
        }
    }

    Ok(Layout {
        width: SHEET_WIDTH,
        height: (y + PADDING).max(SHEET_MIN_HEIGHT).ceil(),
        ops,
    })
}

fn banner(ops: &mut Vec<DrawOp>, fonts: &Fonts, lines: &[&str]) -> f32 {
    let widest = lines
        .iter()
        .map(|l| fonts.measure(Face::Bold, BANNER_SIZE, l))
        .fold(0.0f32, f32::max);
    let room = SHEET_WIDTH - 2.0 * BANNER_PADDING;
    let size = if widest > room {
        BANNER_SIZE * room / widest
    } else {
        BANNER_SIZE
    };
    let line = size * BANNER_LINE_HEIGHT;
    let band = 2.0 * BANNER_PADDING + line * lines.len() as f32;

    ops.push(DrawOp::Fill {
        x: 0.0,
        y: 0.0,
        w: SHEET_WIDTH,
        h: band,
        color: BRAND_RED,
    });
    for (i, text) in lines.iter().enumerate() {
        let w = fonts.measure(Face::Bold, size, text);
        ops.push(DrawOp::Text {
            x: (SHEET_WIDTH - w) / 2.0,
            y: BANNER_PADDING + line * i as f32 + (line - size) / 2.0,
            size,
            face: Face::Bold,
            color: WHITE,
            text: text.to_string(),
        });
    }
    band + BANNER_GAP
}

/// Word-wrapping line builder for one text column
struct Flow<'a> {
    fonts: &'a Fonts,
    ops: &'a mut Vec<DrawOp>,
    left: f32,
    right: f32,
    x: f32,
    y: f32,
    size: f32,
    line: f32,
    line_used: bool,
    space_pending: bool,
}

impl<'a> Flow<'a> {
    fn new(
        fonts: &'a Fonts,
        ops: &'a mut Vec<DrawOp>,
        left: f32,
        right: f32,
        y: f32,
        size: f32,
        line: f32,
    ) -> Self {
        Self {
            fonts,
            ops,
            left,
            right,
            x: left,
            y,
            size,
            line,
            line_used: false,
            space_pending: false,
        }
    }

    fn newline(&mut self) {
        self.y += self.line;
        self.x = self.left;
        self.line_used = false;
        self.space_pending = false;
    }

    /// Finish the current line if it holds anything; returns the next free y
    fn finish(mut self) -> f32 {
        if self.line_used {
            self.newline();
        }
        self.y
    }

    fn text_top(&self) -> f32 {
        self.y + (self.line - self.size) / 2.0
    }

    fn leading_space(&self) -> f32 {
        if self.line_used && self.space_pending {
            self.fonts.measure(Face::Regular, self.size, " ")
        } else {
            0.0
        }
    }

    /// Reserve `width` on the current line, wrapping first if it does not fit
    fn place(&mut self, width: f32) -> f32 {
        let space = self.leading_space();
        if self.line_used && self.x + space + width > self.right {
            self.newline();
        } else {
            self.x += space;
        }
        let at = self.x;
        self.x += width;
        self.line_used = true;
        self.space_pending = false;
        at
    }

    fn text(&mut self, text: &str, face: Face) {
        if text.starts_with(char::is_whitespace) {
            self.space_pending = true;
        }
        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            let w = self.fonts.measure(face, self.size, word);
            let x = self.place(w);
            self.ops.push(DrawOp::Text {
                x,
                y: self.text_top(),
                size: self.size,
                face,
                color: BLACK,
                text: word.to_string(),
            });
            self.space_pending = words.peek().is_some();
        }
        if text.ends_with(char::is_whitespace) {
            self.space_pending = true;
        }
    }

    fn underline(&mut self, x: f32, width: f32) {
        self.ops.push(DrawOp::Fill {
            x,
            y: self.text_top() + self.size * 1.2,
            w: width,
            h: 1.0,
            color: BLACK,
        });
    }

    fn field(&mut self, slot: &FieldSlot) {
        let shown = slot.content.shown();
        match slot.width {
            FieldWidth::Min(min) => {
                let text_w = self.fonts.measure(Face::Regular, self.size, shown);
                let width = (text_w + 2.0 * FIELD_PADDING).max(min);
                if width > self.right - self.left {
                    self.block_field(shown);
                    return;
                }
                let x = self.place(width);
                self.ops.push(DrawOp::Text {
                    x: x + FIELD_PADDING,
                    y: self.text_top(),
                    size: self.size,
                    face: Face::Regular,
                    color: BLACK,
                    text: shown.to_string(),
                });
                self.underline(x, width);
            }
            FieldWidth::Full => self.block_field(shown),
        }
    }

    /// Field on lines of its own, underlined across the column
    fn block_field(&mut self, shown: &str) {
        if self.line_used {
            self.newline();
        }
        self.y += BLOCK_FIELD_MARGIN;
        self.x = self.left + FIELD_PADDING;
        self.text(shown, Face::Regular);
        let (left, width) = (self.left, self.right - self.left);
        self.underline(left, width);
        self.newline();
        self.y += BLOCK_FIELD_MARGIN;
    }
}

fn paragraph(ops: &mut Vec<DrawOp>, fonts: &Fonts, p: &Paragraph, y: f32) -> f32 {
    let left = PADDING + if p.marker.is_some() { CLAUSE_INDENT } else { 0.0 };
    let mut flow = Flow::new(fonts, ops, left, SHEET_WIDTH - PADDING, y, BODY_SIZE, BODY_LINE);

    if let Some(marker) = p.marker {
        let top = flow.text_top();
        flow.ops.push(DrawOp::Text {
            x: left,
            y: top,
            size: BODY_SIZE,
            face: Face::Regular,
            color: BLACK,
            text: marker.to_string(),
        });
        flow.x = left + MARKER_WIDTH;
        flow.line_used = true;
        flow.space_pending = true;
    }

    for inline in &p.inlines {
        match inline {
            Inline::Text(text) => flow.text(text, Face::Regular),
            Inline::Field(slot) => flow.field(slot),
            Inline::LineBreak => {
                if flow.line_used {
                    flow.newline();
                }
            }
        }
    }

    flow.finish() + PARAGRAPH_GAP
}

/// Break `text` into lines no wider than `width`
fn wrap(fonts: &Fonts, face: Face, size: f32, text: &str, width: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && fonts.measure(face, size, &candidate) > width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn signoff(ops: &mut Vec<DrawOp>, fonts: &Fonts, s: &Signoff, y: f32) -> Result<f32> {
    let column = (SHEET_WIDTH - 2.0 * PADDING) / 2.0;
    let right_edge = SHEET_WIDTH - PADDING;

    // Right column: label, then the signature image
    let label = wrap(fonts, Face::Bold, BODY_SIZE, s.signature_label, column);
    let label_h = label.len() as f32 * NORMAL_LINE + BLOCK_FIELD_MARGIN;
    let image = match &s.signature {
        SignatureArea::Image(image) | SignatureArea::Uploaded { image, .. } => Some(
            image
                .to_rgba()
                .map_err(|e| FormError::ExportFailure(format!("signature image: {e}")))?,
        ),
        SignatureArea::Blank | SignatureArea::Pad { .. } => None,
    };
    let image_box = image.as_ref().map(|img| {
        let (w, h) = img.dimensions();
        let (w, h) = (w.max(1) as f32, h.max(1) as f32);
        let scale = (SIGNATURE_MAX_WIDTH / w).min(SIGNATURE_MAX_HEIGHT / h).min(1.0);
        ((w * scale).max(1.0), (h * scale).max(1.0))
    });
    let right_h = label_h + image_box.map(|(_, h)| h + 2.0).unwrap_or(0.0);

    // Left column: date line
    let left_h = BODY_LINE + BLOCK_FIELD_MARGIN;
    let bottom = y + right_h.max(left_h);

    let mut top = bottom - right_h;
    for line in label {
        let w = fonts.measure(Face::Bold, BODY_SIZE, &line);
        ops.push(DrawOp::Text {
            x: right_edge - w,
            y: top + (NORMAL_LINE - BODY_SIZE) / 2.0,
            size: BODY_SIZE,
            face: Face::Bold,
            color: BLACK,
            text: line,
        });
        top += NORMAL_LINE;
    }
    top += BLOCK_FIELD_MARGIN;
    if let (Some(img), Some((w, h))) = (image, image_box) {
        let x = right_edge - w - 2.0;
        ops.push(DrawOp::Fill {
            x,
            y: top,
            w: w + 2.0,
            h: h + 2.0,
            color: BORDER_GREY,
        });
        ops.push(DrawOp::Fill {
            x: x + 1.0,
            y: top + 1.0,
            w,
            h,
            color: WHITE,
        });
        ops.push(DrawOp::Image {
            x: x + 1.0,
            y: top + 1.0,
            w,
            h,
            image: img,
        });
    }

    let mut flow = Flow::new(
        fonts,
        ops,
        PADDING,
        PADDING + column,
        bottom - left_h,
        BODY_SIZE,
        BODY_LINE,
    );
    flow.text(s.date_label, Face::Bold);
    flow.space_pending = true;
    flow.field(&s.date);
    flow.finish();

    Ok(bottom)
}

fn notes(ops: &mut Vec<DrawOp>, fonts: &Fonts, heading: &str, items: &[&str], y: f32) -> f32 {
    let right = SHEET_WIDTH - PADDING;
    let mut flow = Flow::new(fonts, ops, PADDING, right, y, NOTE_SIZE, NOTE_LINE);
    flow.text(heading, Face::Bold);
    let mut y = flow.finish() + BLOCK_FIELD_MARGIN;

    for item in items {
        let mut flow = Flow::new(fonts, ops, PADDING, right, y, NOTE_SIZE, NOTE_LINE);
        flow.text(item, Face::Italic);
        y = flow.finish() + BLOCK_FIELD_MARGIN;
    }
    y
}

/// Paint a layout at `ratio` device pixels per CSS pixel
pub fn paint(layout: &Layout, fonts: &Fonts, ratio: f32) -> Bitmap {
    let px = |v: f32| (v * ratio).round() as i32;
    let len = |v: f32| ((v * ratio).round() as u32).max(1);

    let mut canvas = RgbImage::from_pixel(len(layout.width), len(layout.height), WHITE);

    for op in &layout.ops {
        match op {
            DrawOp::Fill { x, y, w, h, color } => {
                let rect = Rect::at(px(*x), px(*y)).of_size(len(*w), len(*h));
                draw_filled_rect_mut(&mut canvas, rect, *color);
            }
            DrawOp::Text {
                x,
                y,
                size,
                face,
                color,
                text,
            } => {
                draw_text_mut(
                    &mut canvas,
                    *color,
                    px(*x),
                    px(*y),
                    Scale::uniform(size * ratio),
                    fonts.face(*face),
                    text,
                );
            }
            DrawOp::Image { x, y, w, h, image } => {
                let scaled = imageops::resize(image, len(*w), len(*h), FilterType::Triangle);
                blend(&mut canvas, &scaled, px(*x), px(*y));
            }
        }
    }

    Bitmap {
        image: canvas,
        node_width: layout.width.round() as u32,
        node_height: layout.height.round() as u32,
    }
}

/// Alpha-composite `overlay` onto the opaque canvas
fn blend(canvas: &mut RgbImage, overlay: &RgbaImage, x0: i32, y0: i32) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    for (ox, oy, pixel) in overlay.enumerate_pixels() {
        let (x, y) = (x0 + ox as i32, y0 + oy as i32);
        if x < 0 || y < 0 || x >= cw || y >= ch {
            continue;
        }
        let alpha = pixel[3] as u32;
        if alpha == 0 {
            continue;
        }
        let dst = canvas.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = (pixel[c] as u32 * alpha + dst[c] as u32 * (255 - alpha)) / 255;
            dst[c] = mixed as u8;
        }
    }
}
