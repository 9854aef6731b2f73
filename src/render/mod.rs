//! Declaration document renderer
//!
//! `render` is a pure function of the form state. It produces a small visual
//! tree that `html` serializes for the browser and `export::raster` paints for
//! the PDF.

pub mod html;

use chrono::NaiveDate;

use crate::form::{FieldName, FormFields, InputKind, Mode, PageOptions};
use crate::signature::{Presented, SignatureCapture, SignatureImage, Stroke};

/// Shown in place of an empty preview field so the line keeps its height
pub const EMPTY_FIELD: &str = "\u{00A0}";

pub const BANNER_LINES: [&str; 2] = [
    "SELF-DECLARATION FROM THE HEAD OF FAMILY (HOF) FOR SHARING ADDRESS",
    "WITH IMMEDIATE FAMILY MEMBER RESIDING AT THE SAME ADDRESS",
];

pub const SIGNATURE_LABEL: &str = "Name & Signature of Head of the Family (HoF)";
pub const DATE_LABEL: &str = "Date:";
pub const NOTES_HEADING: &str = "Note:";
pub const NOTES: [&str; 2] = [
    "1. This document is valid for Head of Family (HoF) based Aadhaar address update purpose only.",
    "2. This document is valid for 3 months from date of issue.",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub mode: Mode,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Banner(&'static [&'static str]),
    Paragraph(Paragraph),
    Signoff(Signoff),
    Notes {
        heading: &'static str,
        items: &'static [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Clause number such as "i."; numbered clauses are indented
    pub marker: Option<&'static str>,
    pub inlines: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(&'static str),
    Field(FieldSlot),
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldWidth {
    /// Inline, at least this many CSS pixels wide
    Min(f32),
    /// A line of its own spanning the text column
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSlot {
    pub name: FieldName,
    pub width: FieldWidth,
    pub content: FieldContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    Input {
        value: String,
        placeholder: &'static str,
        kind: InputKind,
    },
    Text(String),
}

impl FieldContent {
    /// Text a reader sees in this slot
    pub fn shown(&self) -> &str {
        match self {
            FieldContent::Input { value, .. } => value,
            FieldContent::Text(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signoff {
    pub date_label: &'static str,
    pub date: FieldSlot,
    pub signature_label: &'static str,
    pub signature: SignatureArea,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignatureArea {
    /// Preview with a captured signature
    Image(SignatureImage),
    /// Preview without a signature
    Blank,
    /// Edit mode drawing pad
    Pad {
        strokes: Vec<Stroke>,
        upload_allowed: bool,
    },
    /// Edit mode with an uploaded image standing in for the pad
    Uploaded {
        image: SignatureImage,
        upload_allowed: bool,
    },
}

/// Reformat `YYYY-MM-DD` as `DD/MM/YYYY`; anything else is returned as given
pub fn display_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Build the visual tree for a form state
pub fn render(
    fields: &FormFields,
    mode: Mode,
    signature: &SignatureCapture,
    options: PageOptions,
) -> RenderedDocument {
    let slot = |name: FieldName, width: FieldWidth| field_slot(fields, mode, name, width);

    let opening = Paragraph {
        marker: None,
        inlines: vec![
            Inline::Text("I, "),
            Inline::Field(slot(FieldName::HofName, FieldWidth::Min(300.0))),
            Inline::Text(" (Name as in Aadhaar), resident of"),
            Inline::Field(slot(FieldName::HofAddress1, FieldWidth::Full)),
            Inline::Field(slot(FieldName::HofAddress2, FieldWidth::Full)),
            Inline::Text("(Address as provided in Aadhaar) holding Aadhaar Number "),
            Inline::Field(slot(FieldName::HofAadhaar, FieldWidth::Min(200.0))),
            Inline::Text(", do hereby solemnly affirm and declare as under:-"),
        ],
    };

    let relation = Paragraph {
        marker: Some("i."),
        inlines: vec![
            Inline::Text("That resident Mr./Ms. "),
            Inline::Field(slot(FieldName::ResidentName, FieldWidth::Min(200.0))),
            Inline::Text(" holding Aadhaar number "),
            Inline::Field(slot(FieldName::ResidentAadhaar, FieldWidth::Min(200.0))),
            Inline::Text(" is related to me as my"),
            Inline::Field(slot(FieldName::Relationship, FieldWidth::Full)),
            Inline::LineBreak,
            Inline::Text(
                "(Please specify the relation with applicant) and is residing with me at the above mentioned address.",
            ),
        ],
    };

    let consent = Paragraph {
        marker: Some("ii."),
        inlines: vec![
            Inline::Text("That I agree to share my address in my Aadhaar with Mr./Ms. "),
            Inline::Field(slot(FieldName::ResidentName2, FieldWidth::Full)),
            Inline::Text(
                " for updating his/her address in Aadhaar in my capacity of Head of the Family (HoF).",
            ),
        ],
    };

    let undertaking = Paragraph {
        marker: Some("iii."),
        inlines: vec![
            Inline::Text(
                "That the undersigned undertakes that, the above mentioned information is correct to the best of my knowledge and belief and at any point of time if any of the said information is found to be incorrect/fraudulent/false, the Aadhaar of Mr./Ms.",
            ),
            Inline::LineBreak,
            Inline::Field(slot(FieldName::ResidentName3, FieldWidth::Full)),
            Inline::Text(
                " and mine can be deactivated and legal action may be initiated against me, as per the provisions of the Aadhaar (Targeted Delivery of Financial and Other Subsidies, Benefits and Services) Act, 2016.",
            ),
        ],
    };

    let signoff = Signoff {
        date_label: DATE_LABEL,
        date: slot(FieldName::Date, FieldWidth::Min(150.0)),
        signature_label: SIGNATURE_LABEL,
        signature: signature_area(signature, mode, options),
    };

    RenderedDocument {
        mode,
        blocks: vec![
            Block::Banner(&BANNER_LINES),
            Block::Paragraph(opening),
            Block::Paragraph(relation),
            Block::Paragraph(consent),
            Block::Paragraph(undertaking),
            Block::Signoff(signoff),
            Block::Notes {
                heading: NOTES_HEADING,
                items: &NOTES,
            },
        ],
    }
}

fn field_slot(fields: &FormFields, mode: Mode, name: FieldName, width: FieldWidth) -> FieldSlot {
    let value = fields.get(name);
    let content = match mode {
        Mode::Edit => FieldContent::Input {
            value: value.to_string(),
            placeholder: name.placeholder(),
            kind: name.input_kind(),
        },
        Mode::Preview if value.is_empty() => FieldContent::Text(EMPTY_FIELD.to_string()),
        Mode::Preview => match name.input_kind() {
            InputKind::Date => FieldContent::Text(display_date(value)),
            InputKind::Text => FieldContent::Text(value.to_string()),
        },
    };
    FieldSlot {
        name,
        width,
        content,
    }
}

fn signature_area(signature: &SignatureCapture, mode: Mode, options: PageOptions) -> SignatureArea {
    let upload_allowed = options.allow_signature_upload;
    match mode {
        Mode::Preview => signature
            .image()
            .cloned()
            .map(SignatureArea::Image)
            .unwrap_or(SignatureArea::Blank),
        Mode::Edit => match signature.presented() {
            Presented::Uploaded(image) => SignatureArea::Uploaded {
                image: image.clone(),
                upload_allowed,
            },
            Presented::Pad(strokes) => SignatureArea::Pad {
                strokes: strokes.to_vec(),
                upload_allowed,
            },
        },
    }
}

impl RenderedDocument {
    /// Every field slot in document order
    pub fn field_slots(&self) -> Vec<&FieldSlot> {
        let mut slots = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => slots.extend(p.inlines.iter().filter_map(|i| match i {
                    Inline::Field(slot) => Some(slot),
                    _ => None,
                })),
                Block::Signoff(s) => slots.push(&s.date),
                _ => {}
            }
        }
        slots
    }

    pub fn slot(&self, name: FieldName) -> Option<&FieldSlot> {
        self.field_slots().into_iter().find(|s| s.name == name)
    }

    pub fn signature(&self) -> Option<&SignatureArea> {
        self.blocks.iter().find_map(|b| match b {
            Block::Signoff(s) => Some(&s.signature),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Point;

    fn render_with(fields: &FormFields, mode: Mode, signature: &SignatureCapture) -> RenderedDocument {
        render(fields, mode, signature, PageOptions::default())
    }

    fn dated(date: &str) -> FormFields {
        let mut fields = FormFields::default();
        fields.replace(FieldName::Date, date);
        fields
    }

    #[test]
    fn test_every_field_has_one_slot() {
        let doc = render_with(&FormFields::default(), Mode::Edit, &SignatureCapture::new());
        let slots = doc.field_slots();
        assert_eq!(slots.len(), FieldName::ALL.len());
        for name in FieldName::ALL {
            assert!(doc.slot(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_date_reformatted_only_in_preview() {
        let fields = dated("2024-03-05");
        let sig = SignatureCapture::new();

        let preview = render_with(&fields, Mode::Preview, &sig);
        assert_eq!(preview.slot(FieldName::Date).unwrap().content.shown(), "05/03/2024");

        let edit = render_with(&fields, Mode::Edit, &sig);
        assert_eq!(edit.slot(FieldName::Date).unwrap().content.shown(), "2024-03-05");
    }

    #[test]
    fn test_unparseable_date_shown_verbatim() {
        assert_eq!(display_date("next tuesday"), "next tuesday");
        assert_eq!(display_date("2024-02-30"), "2024-02-30");
    }

    #[test]
    fn test_empty_preview_fields_keep_height() {
        let doc = render_with(&FormFields::default(), Mode::Preview, &SignatureCapture::new());
        for slot in doc.field_slots() {
            assert_eq!(slot.content, FieldContent::Text(EMPTY_FIELD.to_string()));
        }
    }

    #[test]
    fn test_edit_fields_carry_placeholders() {
        let doc = render_with(&FormFields::default(), Mode::Edit, &SignatureCapture::new());
        match &doc.slot(FieldName::HofName).unwrap().content {
            FieldContent::Input { placeholder, kind, .. } => {
                assert_eq!(*placeholder, "Name as in Aadhaar");
                assert_eq!(*kind, InputKind::Text);
            }
            other => panic!("expected input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_preview_signature_area() {
        let mut sig = SignatureCapture::new();
        let fields = FormFields::default();

        let blank = render_with(&fields, Mode::Preview, &sig);
        assert_eq!(blank.signature(), Some(&SignatureArea::Blank));

        sig.add_stroke(Stroke::new(vec![Point { x: 1.0, y: 1.0 }, Point { x: 50.0, y: 20.0 }]));
        sig.capture_for_preview().await;
        let signed = render_with(&fields, Mode::Preview, &sig);
        assert!(matches!(signed.signature(), Some(SignatureArea::Image(_))));
    }

    #[tokio::test]
    async fn test_cleared_signature_renders_nothing() {
        let mut sig = SignatureCapture::new();
        sig.add_stroke(Stroke::new(vec![Point { x: 1.0, y: 1.0 }]));
        sig.capture_for_preview().await;
        sig.clear();

        let doc = render_with(&FormFields::default(), Mode::Preview, &sig);
        assert_eq!(doc.signature(), Some(&SignatureArea::Blank));
    }

    #[test]
    fn test_edit_signature_area_reflects_upload_flag() {
        let doc = render(
            &FormFields::default(),
            Mode::Edit,
            &SignatureCapture::new(),
            PageOptions {
                require_auth: false,
                allow_signature_upload: false,
            },
        );
        assert_eq!(
            doc.signature(),
            Some(&SignatureArea::Pad {
                strokes: vec![],
                upload_allowed: false
            })
        );
    }
}
