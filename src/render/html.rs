//! HTML serialization of the rendered declaration

use std::fmt::Write;

use super::{
    Block, FieldContent, FieldSlot, FieldWidth, Inline, Paragraph, RenderedDocument, SignatureArea,
    Signoff,
};
use crate::form::{FieldName, FormSession, InputKind, Mode};
use crate::signature::{SignatureSource, PAD_HEIGHT, PAD_WIDTH};

const PAGE_TITLE: &str = "Self-Declaration Form";

const STYLE: &str = r#"
body { background:#f0f0f0; margin:0; padding:20px; font-family:serif; }
.wrap { max-width:900px; margin:0 auto; }
.toolbar { margin-bottom:20px; text-align:center; }
.toolbar button { color:#fff; padding:12px 24px; border:none; border-radius:4px; font-size:16px; cursor:pointer; margin-right:10px; }
.toolbar .primary { background:#e30613; }
.toolbar .secondary { background:#666; }
.toolbar button:disabled { cursor:not-allowed; opacity:.6; }
.sheet { width:21cm; min-height:29.7cm; background:#fff; box-shadow:0 0 10px rgba(0,0,0,.1); padding:2cm; box-sizing:border-box; margin:0 auto; }
.banner { background:#e30613; color:#fff; padding:10px 0; text-align:center; margin:-2cm -2cm 20px -2cm; }
.banner h3 { margin:0; font-size:1.1em; line-height:1.4; }
p { line-height:1.8; text-align:justify; margin:0 0 10px 0; }
.clause { margin-left:30px; }
.marker { display:inline-block; width:20px; }
input.field { border:none; border-bottom:2px solid #e30613; font-size:14px; padding:2px 4px; outline:none; }
input.block, span.block { display:block; width:100%; margin:5px 0; box-sizing:border-box; }
span.value { border-bottom:1px solid #000; padding-bottom:2px; }
span.inline { display:inline-block; }
.signoff { margin-top:50px; display:flex; justify-content:space-between; align-items:flex-end; }
.signoff > div { flex-grow:1; }
.signoff .right { text-align:right; }
canvas#signature-pad { border:2px solid #e30613; background:#fff; }
img.signature { border:1px solid #ccc; max-width:250px; height:auto; }
.small { margin-top:5px; background:#666; color:#fff; padding:5px 10px; border:none; border-radius:3px; font-size:12px; cursor:pointer; }
.notes { margin-top:40px; font-size:.85em; }
.notes .item { font-style:italic; margin-bottom:5px; }
.gate { max-width:360px; margin:80px auto; background:#fff; padding:30px; box-shadow:0 0 10px rgba(0,0,0,.1); }
.gate .error { color:#e30613; }
"#;

/// Escape text for element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full page for the session's current mode
pub fn form_page(session: &FormSession) -> String {
    let document = session.render();
    let mut body = String::new();

    body.push_str("<div class=\"wrap\">");
    body.push_str("<form id=\"declaration\" method=\"post\" action=\"/form/preview\">");
    body.push_str(&toolbar(document.mode));
    body.push_str(&document_html(&document));
    body.push_str(&carried_state(session));
    body.push_str("</form></div>");

    shell(&body)
}

/// Password prompt shown before the form when auth is required
pub fn password_page(message: Option<&str>) -> String {
    let error = message
        .map(|m| format!("<p class=\"error\" id=\"gate-error\">{}</p>", escape(m)))
        .unwrap_or_else(|| "<p class=\"error\" id=\"gate-error\"></p>".to_string());

    let body = format!(
        "<div class=\"gate\"><h3>{}</h3>\
         <form id=\"password-form\">\
         <p><input type=\"password\" name=\"password\" placeholder=\"Enter password\" required autofocus></p>\
         {}\
         <div class=\"toolbar\"><button type=\"submit\" class=\"primary\">Continue</button></div>\
         </form></div>",
        PAGE_TITLE, error
    );
    shell(&body)
}

fn shell(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{PAGE_TITLE}</title>\
         <meta name=\"description\" content=\"Self-Declaration Form for HOF\">\
         <style>{STYLE}</style></head>\
         <body>{body}<script src=\"/assets/form.js\" defer></script></body></html>"
    )
}

fn toolbar(mode: Mode) -> String {
    match mode {
        Mode::Edit => "<div class=\"toolbar\">\
             <button type=\"submit\" class=\"primary\" id=\"preview-button\">Preview Form</button>\
             </div>"
            .to_string(),
        Mode::Preview => "<div class=\"toolbar\">\
             <button type=\"submit\" class=\"secondary\" formaction=\"/form/edit\">Edit Form</button>\
             <button type=\"submit\" class=\"primary\" id=\"download-button\" formaction=\"/form/export\">Download as PDF</button>\
             </div>"
            .to_string(),
    }
}

/// The printable sheet
pub fn document_html(document: &RenderedDocument) -> String {
    let mut out = String::from("<div class=\"sheet\" id=\"print-area\">");
    for block in &document.blocks {
        match block {
            Block::Banner(lines) => {
                let text: Vec<String> = lines.iter().map(|l| escape(l)).collect();
                let _ = write!(out, "<div class=\"banner\"><h3>{}</h3></div>", text.join("<br>"));
            }
            Block::Paragraph(p) => paragraph_html(&mut out, p),
            Block::Signoff(s) => signoff_html(&mut out, s),
            Block::Notes { heading, items } => {
                let _ = write!(out, "<div class=\"notes\"><p><b>{}</b></p>", escape(heading));
                for item in items.iter() {
                    let _ = write!(out, "<p class=\"item\">{}</p>", escape(item));
                }
                out.push_str("</div>");
            }
        }
    }
    out.push_str("</div>");
    out
}

fn paragraph_html(out: &mut String, p: &Paragraph) {
    match p.marker {
        Some(marker) => {
            let _ = write!(out, "<p class=\"clause\"><span class=\"marker\">{}</span> ", escape(marker));
        }
        None => out.push_str("<p>"),
    }
    for inline in &p.inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape(text)),
            Inline::Field(slot) => out.push_str(&field_html(slot)),
            Inline::LineBreak => out.push_str("<br>"),
        }
    }
    out.push_str("</p>");
}

fn field_html(slot: &FieldSlot) -> String {
    let (class, style) = match slot.width {
        FieldWidth::Min(px) => ("inline", format!(" style=\"min-width:{px}px\"")),
        FieldWidth::Full => ("block", String::new()),
    };
    match &slot.content {
        FieldContent::Input {
            value,
            placeholder,
            kind,
        } => {
            let input_type = match kind {
                InputKind::Text => "text",
                InputKind::Date => "date",
            };
            format!(
                "<input type=\"{}\" class=\"field {}\" name=\"{}\" value=\"{}\" placeholder=\"{}\"{}>",
                input_type,
                class,
                slot.name.wire_name(),
                escape(value),
                escape(placeholder),
                style
            )
        }
        FieldContent::Text(text) => format!(
            "<span class=\"value {}\" data-field=\"{}\"{}>{}</span>",
            class,
            slot.name.wire_name(),
            style,
            escape(text)
        ),
    }
}

fn signoff_html(out: &mut String, s: &Signoff) {
    let _ = write!(
        out,
        "<div class=\"signoff\"><div><p><b>{}</b> {}</p></div><div class=\"right\"><p><b>{}</b></p>",
        escape(s.date_label),
        field_html(&s.date),
        escape(s.signature_label)
    );

    match &s.signature {
        SignatureArea::Image(image) => {
            let _ = write!(
                out,
                "<img class=\"signature\" alt=\"Signature\" src=\"{}\">",
                image.to_data_url()
            );
        }
        SignatureArea::Blank => {}
        SignatureArea::Pad { upload_allowed, .. } => {
            let _ = write!(
                out,
                "<div><canvas id=\"signature-pad\" width=\"{PAD_WIDTH}\" height=\"{PAD_HEIGHT}\"></canvas></div>"
            );
            signature_controls(out, *upload_allowed);
        }
        SignatureArea::Uploaded {
            image,
            upload_allowed,
        } => {
            let _ = write!(
                out,
                "<div><img class=\"signature\" id=\"signature-upload-preview\" alt=\"Signature\" src=\"{}\"></div>",
                image.to_data_url()
            );
            signature_controls(out, *upload_allowed);
        }
    }
    out.push_str("</div></div>");
}

fn signature_controls(out: &mut String, upload_allowed: bool) {
    out.push_str("<button type=\"button\" class=\"small\" id=\"clear-signature\">Clear Signature</button>");
    if upload_allowed {
        out.push_str(
            "<div><label class=\"small\">Upload signature \
             <input type=\"file\" id=\"signature-file\" accept=\"image/*\" hidden></label></div>",
        );
    }
}

/// Hidden inputs that carry the page state to the next request
fn carried_state(session: &FormSession) -> String {
    let mut out = String::new();

    if session.mode() == Mode::Preview {
        for name in FieldName::ALL {
            let _ = write!(
                out,
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
                name.wire_name(),
                escape(session.field(name))
            );
        }
    }

    let strokes = serde_json::to_string(session.signature().strokes()).unwrap_or_else(|_| "[]".into());
    let upload = match session.signature().source() {
        SignatureSource::Uploaded(image) => image.to_data_url(),
        _ => String::new(),
    };
    let _ = write!(
        out,
        "<input type=\"hidden\" name=\"page\" value=\"{}\">\
         <input type=\"hidden\" name=\"strokes\" id=\"signature-strokes\" value=\"{}\">\
         <input type=\"hidden\" name=\"upload\" id=\"signature-upload\" value=\"{}\">",
        escape(session.page_id()),
        escape(&strokes),
        escape(&upload)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::PageOptions;

    fn session() -> FormSession {
        let mut s = FormSession::new(PageOptions::default());
        s.replace_field(FieldName::HofName, "Asha <Rao>");
        s.replace_field(FieldName::Date, "2024-03-05");
        s
    }

    #[test]
    fn test_edit_page_has_inputs() {
        let s = session();
        let html = form_page(&s);
        assert!(html.contains(&format!("name=\"page\" value=\"{}\"", s.page_id())));
        assert!(html.contains("name=\"hofName\" value=\"Asha &lt;Rao&gt;\""));
        assert!(html.contains("type=\"date\""));
        assert!(html.contains("value=\"2024-03-05\""));
        assert!(html.contains("Preview Form"));
        assert!(html.contains("<canvas id=\"signature-pad\""));
        assert!(html.contains("signature-file"));
        assert!(!html.contains("Download as PDF"));
    }

    #[tokio::test]
    async fn test_preview_page_has_static_text_and_carried_fields() {
        let mut s = session();
        s.set_mode(Mode::Preview).await;
        let html = form_page(&s);

        assert!(html.contains(">05/03/2024</span>"));
        assert!(html.contains("<input type=\"hidden\" name=\"date\" value=\"2024-03-05\">"));
        assert!(html.contains("Download as PDF"));
        assert!(html.contains("Edit Form"));
        assert!(!html.contains("type=\"text\""));
        assert!(!html.contains("<canvas id=\"signature-pad\""));
    }

    #[test]
    fn test_upload_control_hidden_when_disabled() {
        let s = FormSession::new(PageOptions {
            require_auth: false,
            allow_signature_upload: false,
        });
        let html = form_page(&s);
        assert!(html.contains("<canvas id=\"signature-pad\""));
        assert!(!html.contains("signature-file"));
    }

    #[test]
    fn test_password_page_escapes_message() {
        let html = password_page(Some("<b>nope</b>"));
        assert!(html.contains("&lt;b&gt;nope&lt;/b&gt;"));
        assert!(html.contains("type=\"password\""));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a&b<"c">'"#), "a&amp;b&lt;&quot;c&quot;&gt;&#39;");
    }
}
