//! Single-page PDF assembly
//!
//! The bitmap becomes one DeviceRGB image XObject drawn at the full page width
//! from the top-left corner. Content taller than A4 runs off the bottom.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::raster::Bitmap;
use crate::types::{FormError, Result};

/// A4 portrait in points
pub const PAGE_WIDTH: f32 = 595.276;
pub const PAGE_HEIGHT: f32 = 841.89;

const DOCUMENT_TITLE: &str = "Self-Declaration Form";

/// Wrap a bitmap in a one-page A4 document
pub fn assemble(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let (px_w, px_h) = bitmap.image.dimensions();
    if px_w == 0 || px_h == 0 {
        return Err(FormError::ExportFailure("empty bitmap".into()));
    }

    let draw_w = PAGE_WIDTH;
    let draw_h = PAGE_WIDTH * px_h as f32 / px_w as f32;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bitmap.image.as_raw())?;
    let pixels = encoder.finish()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_w as i64,
            "Height" => px_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        pixels,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_w.into(),
                    0f32.into(),
                    0f32.into(),
                    draw_h.into(),
                    0f32.into(),
                    (PAGE_HEIGHT - draw_h).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0f32.into(), 0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(DOCUMENT_TITLE),
        "Producer" => Object::string_literal(concat!("declaration-desk ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn bitmap(node_width: u32, node_height: u32) -> Bitmap {
        Bitmap {
            image: RgbImage::from_pixel(node_width * 2, node_height * 2, Rgb([255, 255, 255])),
            node_width,
            node_height,
        }
    }

    fn image_width(doc: &Document) -> Vec<i64> {
        doc.objects
            .values()
            .filter_map(|obj| match obj {
                Object::Stream(stream) => Some(&stream.dict),
                _ => None,
            })
            .filter(|dict| matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(n) if n == b"Image"))
            .filter_map(|dict| dict.get(b"Width").and_then(Object::as_i64).ok())
            .collect()
    }

    #[test]
    fn test_single_a4_page() {
        let bytes = assemble(&bitmap(794, 1123)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
        let pages_id = doc
            .get_dictionary(root)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .unwrap();
        let media_box = doc
            .get_dictionary(pages_id)
            .unwrap()
            .get(b"MediaBox")
            .and_then(Object::as_array)
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(media_box.len(), 4);
        assert!((media_box[2] - 595.0).abs() < 1.0);
        assert!((media_box[3] - 842.0).abs() < 1.0);
    }

    #[test]
    fn test_image_keeps_double_density() {
        let bytes = assemble(&bitmap(794, 1400)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(image_width(&doc), vec![794 * 2]);
    }

    #[test]
    fn test_empty_bitmap_rejected() {
        let empty = Bitmap {
            image: RgbImage::new(0, 0),
            node_width: 0,
            node_height: 0,
        };
        assert!(matches!(assemble(&empty), Err(FormError::ExportFailure(_))));
    }
}
