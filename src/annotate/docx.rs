//! Low-level docx package editing.
//!
//! A docx file is a zip archive whose main part is `word/document.xml`.
//! Appending the traceability footer means rewriting the archive with two
//! paragraphs spliced into the body XML right before the closing section
//! properties. Everything here is blocking; callers hop through
//! `spawn_blocking`.

use std::io::{Read, Write};
use std::path::Path;

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;

/// Lead-in text placed before the source hyperlink
pub const FOOTER_LEAD_IN: &str = "Để xem chi tiết thủ tục hành chính, vui lòng truy cập: ";

/// Build the footer XML: one empty paragraph, then the lead-in run and a
/// blue underlined run carrying the URL. Times New Roman 12pt (w:sz is in
/// half-points).
fn footer_xml(url: &str) -> String {
    let escaped_url = escape(url);
    let fonts = r#"<w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman"/>"#;
    format!(
        concat!(
            "<w:p/>",
            "<w:p>",
            "<w:pPr><w:jc w:val=\"left\"/></w:pPr>",
            "<w:r><w:rPr>{fonts}<w:sz w:val=\"24\"/></w:rPr>",
            "<w:t xml:space=\"preserve\">{lead_in}</w:t></w:r>",
            "<w:r><w:rPr>{fonts}<w:sz w:val=\"24\"/>",
            "<w:color w:val=\"0000FF\"/><w:u w:val=\"single\"/></w:rPr>",
            "<w:t xml:space=\"preserve\">{url}</w:t></w:r>",
            "</w:p>"
        ),
        fonts = fonts,
        lead_in = FOOTER_LEAD_IN,
        url = escaped_url,
    )
}

/// Splice the footer into the body XML.
///
/// Paragraphs go before the body-level `<w:sectPr>` when present (trailing
/// section properties are the common layout), otherwise directly before
/// `</w:body>`. Returns `None` when the document has no recognizable body.
fn splice_footer(document_xml: &str, url: &str) -> Option<String> {
    let footer = footer_xml(url);

    let insert_at = document_xml
        .rfind("<w:sectPr")
        .filter(|&idx| document_xml[idx..].contains("</w:body>"))
        .or_else(|| document_xml.rfind("</w:body>"))?;

    let mut out = String::with_capacity(document_xml.len() + footer.len());
    out.push_str(&document_xml[..insert_at]);
    out.push_str(&footer);
    out.push_str(&document_xml[insert_at..]);
    Some(out)
}

/// Rewrite the docx at `path`, appending the footer paragraphs.
pub fn append_footer_sync(path: &Path, url: &str) -> anyhow::Result<()> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut document_xml)?;

    let updated = splice_footer(&document_xml, url)
        .ok_or_else(|| anyhow::anyhow!("document.xml has no body element"))?;

    // Rebuild the archive in memory, replacing only the document part
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            writer.start_file(&name, options)?;
            if name == "word/document.xml" {
                writer.write_all(updated.as_bytes())?;
            } else {
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents)?;
                writer.write_all(&contents)?;
            }
        }
        writer.finish()?;
    }

    std::fs::write(path, buffer.into_inner())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_BODY: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        "<w:body><w:p><w:r><w:t>Nội dung</w:t></w:r></w:p>",
        r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
        "</w:body></w:document>",
    );

    fn write_minimal_docx(path: &Path, body: &str) {
        let file = std::fs::File::create(path).expect("create docx");
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer
            .start_file("[Content_Types].xml", options)
            .expect("types entry");
        writer
            .write_all(b"<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>")
            .expect("types body");
        writer
            .start_file("word/document.xml", options)
            .expect("document entry");
        writer.write_all(body.as_bytes()).expect("document body");
        writer.finish().expect("finish");
    }

    #[test]
    fn test_footer_goes_before_sectpr() {
        let spliced = splice_footer(MINIMAL_BODY, "https://example.com/p?id=1").expect("splice");
        let sectpr = spliced.find("<w:sectPr").expect("sectPr kept");
        let footer = spliced.find(FOOTER_LEAD_IN).expect("footer present");
        assert!(footer < sectpr);
        assert!(spliced.contains("https://example.com/p?id=1"));
    }

    #[test]
    fn test_url_is_escaped() {
        let spliced =
            splice_footer(MINIMAL_BODY, "https://example.com/p?a=1&b=2").expect("splice");
        assert!(spliced.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_no_body_yields_none() {
        assert!(splice_footer("<w:document/>", "https://example.com").is_none());
    }

    #[test]
    fn test_append_footer_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("guide.docx");
        write_minimal_docx(&path, MINIMAL_BODY);

        append_footer_sync(&path, "https://thutuc.dichvucong.gov.vn/p/home?id=7")
            .expect("append footer");

        let text = crate::extract::extract_docx_text(&path).expect("extract");
        assert!(text.contains("Nội dung"));
        assert!(text.contains(FOOTER_LEAD_IN.trim_end()));
        assert!(text.contains("https://thutuc.dichvucong.gov.vn/p/home?id=7"));
    }

    #[test]
    fn test_append_footer_rejects_non_zip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("guide.docx");
        std::fs::write(&path, b"not a zip archive").expect("write");
        assert!(append_footer_sync(&path, "https://example.com").is_err());
    }
}
