//! Test utilities shared by the guidescrape integration suite

use std::io::Write;

use anyhow::Result;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use guidescrape::pipeline::ProcedureDescriptor;

/// Creates a temporary directory for test output
#[allow(dead_code)]
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Builds a procedure descriptor with predictable fields
#[allow(dead_code)]
pub fn descriptor(n: usize) -> ProcedureDescriptor {
    ProcedureDescriptor {
        id: format!("id-{n}"),
        code: format!("1.{n:06}"),
        title: format!("Thủ tục hành chính số {n}"),
        detail_url: format!("https://example.invalid/procedure/{n}"),
    }
}

/// A fake legacy document body: plausible OLE header plus padding so the
/// download passes the size and header checks.
#[allow(dead_code)]
pub fn fake_doc_bytes() -> Vec<u8> {
    let mut body = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    body.extend(std::iter::repeat_n(0x20u8, 600));
    body
}

/// Builds a minimal but structurally valid docx archive in memory
#[allow(dead_code)]
pub fn minimal_docx_bytes(paragraphs: &[&str]) -> Result<Vec<u8>> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}<w:sectPr/></w:body></w:document>"
    );

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        writer.start_file("[Content_Types].xml", options)?;
        writer.write_all(
            b"<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
              <Default Extension=\"xml\" ContentType=\"application/xml\"/></Types>",
        )?;
        writer.start_file("word/document.xml", options)?;
        writer.write_all(document.as_bytes())?;
        writer.finish()?;
    }
    Ok(cursor.into_inner())
}
