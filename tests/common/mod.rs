#![allow(dead_code)]

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use enrollment_docgen::documents::package::{PackageWriter, TemplatePackage};
use enrollment_docgen::{DocgenConfig, RenderContext};
use lopdf::content::Content;
use lopdf::{Document, Object};
use serde_json::json;
use tempfile::TempDir;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ODT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

pub const ODT_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#;

/// Isolated template, media and temp roots for one test.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["templates", "media", "tmp"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn templates(&self) -> PathBuf {
        self.dir.path().join("templates")
    }

    pub fn media(&self) -> PathBuf {
        self.dir.path().join("media")
    }

    pub fn temp(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    pub fn config(&self) -> DocgenConfig {
        DocgenConfig::new(self.templates())
            .with_media_root(self.media())
            .with_temp_dir(self.temp())
    }

    /// Files left behind in the temp directory.
    pub fn temp_leftovers(&self) -> Vec<PathBuf> {
        fs::read_dir(self.temp())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub fn write_template(&self, category: &str, file: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.templates().join(category);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        fs::write(&path, bytes).unwrap();
        path
    }

    pub fn write_media(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.media().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

/// Leaves a truncated archive at the artifact path, then fails.
pub struct FailingWriter;

impl PackageWriter for FailingWriter {
    fn write(&self, _package: &TemplatePackage, path: &Path, _stored: &[&str]) -> ZipResult<()> {
        fs::write(path, b"PK\x03\x04 truncated")?;
        Err(io::Error::other("disk full").into())
    }
}

pub fn sample_context() -> RenderContext {
    RenderContext::new()
        .with("student_name", "Juan Pérez")
        .with(
            "student",
            json!({
                "first_name": "Juan",
                "last_name": "Pérez",
                "document_number": "45879632",
                "enrollment_code": "2019100234"
            }),
        )
        .with("faculty", json!({ "name": "Facultad de Ingeniería" }))
        .with("specialty", json!({ "name": "Computer Science", "code": "CS" }))
        .with("academic_period", "2024-I")
        .with("date", "04 de junio de 2024")
}

pub const CERTIFICATE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Constancia - {{ student_name }}</title>
  <link rel="stylesheet" href="css/certificate.css">
</head>
<body>
  <h1>Constancia de Matrícula</h1>
  <p>{{ student_name }}</p>
  <p>{{ specialty.name }}</p>
  <p>{{ date }}</p>
</body>
</html>
"#;

pub fn odt_content(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:xlink="http://www.w3.org/1999/xlink" office:version="1.2">
 <office:body><office:text>{body}</office:text></office:body>
</office:document-content>
"#
    )
}

/// An `.odt` package with the given `content.xml` body.
pub fn odt_package(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("mimetype", stored).unwrap();
    writer.write_all(ODT_MIMETYPE.as_bytes()).unwrap();
    writer.start_file("META-INF/manifest.xml", deflated).unwrap();
    writer.write_all(ODT_MANIFEST.as_bytes()).unwrap();
    writer.start_file("content.xml", deflated).unwrap();
    writer.write_all(odt_content(body).as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn docx_document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>
"#
    )
}

/// A `.docx` package with the given `word/document.xml` body.
pub fn docx_package(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(docx_document(body).as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Entry names and contents of a rendered package, in archive order.
pub fn read_package(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        std::io::copy(&mut file, &mut contents).unwrap();
        entries.push((file.name().to_string(), contents));
    }
    entries
}

pub fn package_entry(bytes: &[u8], name: &str) -> String {
    read_package(bytes)
        .into_iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, contents)| String::from_utf8(contents).unwrap())
        .unwrap_or_else(|| panic!("package has no {name}"))
}

/// Text shown on every page, decoded from the WinAnsi `Tj` strings.
pub fn pdf_text(bytes: &[u8]) -> String {
    let doc = Document::load_mem(bytes).unwrap();
    let mut lines = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        for operation in content.operations {
            if operation.operator != "Tj" {
                continue;
            }
            if let Some(Object::String(raw, _)) = operation.operands.first() {
                lines.push(raw.iter().map(|&b| b as char).collect::<String>());
            }
        }
    }
    lines.join(" ")
}

pub fn assert_no_leftovers(fixture: &Fixture) {
    let leftovers = fixture.temp_leftovers();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}
