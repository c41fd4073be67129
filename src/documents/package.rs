//! Zip packages behind ODT and DOCX templates.
//!
//! ODT and DOCX files are ZIP archives of XML parts plus media. Entry order is
//! preserved so the ODT `mimetype` entry stays first.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::result::ZipResult;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// An unpacked document package.
#[derive(Debug, Clone, Default)]
pub struct TemplatePackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl TemplatePackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack a package file.
    pub fn open<P: AsRef<Path>>(path: P) -> ZipResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> ZipResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            entries.push((name, contents));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, contents)| contents.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entry names in package order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Replace an entry in place, or append it when absent.
    pub fn set(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, existing)) => *existing = contents,
            None => self.entries.push((name, contents)),
        }
    }

    pub fn set_string(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.set(name, contents.into().into_bytes());
    }

    /// Write the package to `path`. Entries named in `stored` are written
    /// uncompressed, everything else is deflated.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, stored: &[&str]) -> ZipResult<()> {
        let file = File::create(path)?;
        self.write_to(file, stored)?;
        Ok(())
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W, stored: &[&str]) -> ZipResult<W> {
        let mut zip = ZipWriter::new(writer);
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let uncompressed =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, contents) in &self.entries {
            let options = if stored.contains(&name.as_str()) {
                uncompressed
            } else {
                deflated
            };
            zip.start_file(name.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()
    }
}

/// Writes a rendered package to the render's temp artifact.
pub trait PackageWriter: Send + Sync {
    fn write(&self, package: &TemplatePackage, path: &Path, stored: &[&str]) -> ZipResult<()>;
}

/// Default writer: a plain zip archive on disk.
#[derive(Debug, Default, Clone)]
pub struct ZipPackageWriter;

impl PackageWriter for ZipPackageWriter {
    fn write(&self, package: &TemplatePackage, path: &Path, stored: &[&str]) -> ZipResult<()> {
        package.write_to_file(path, stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_order_survives_rewrite() {
        let mut package = TemplatePackage::new();
        package.set_string("mimetype", "application/vnd.oasis.opendocument.text");
        package.set_string("content.xml", "<office:document-content/>");
        package.set_string("META-INF/manifest.xml", "<manifest:manifest/>");
        package.set_string("content.xml", "<office:document-content>x</office:document-content>");

        let buffer = package.write_to(Cursor::new(Vec::new()), &["mimetype"]).unwrap();
        let reopened = TemplatePackage::from_reader(Cursor::new(buffer.into_inner())).unwrap();

        let names: Vec<&str> = reopened.names().collect();
        assert_eq!(names, vec!["mimetype", "content.xml", "META-INF/manifest.xml"]);
        assert_eq!(
            reopened.get("content.xml").unwrap(),
            b"<office:document-content>x</office:document-content>"
        );
    }

    #[test]
    fn test_stored_entries_are_not_compressed() {
        let mut package = TemplatePackage::new();
        package.set_string("mimetype", "application/vnd.oasis.opendocument.text");
        package.set_string("content.xml", "<a/>");

        let buffer = package.write_to(Cursor::new(Vec::new()), &["mimetype"]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        assert_eq!(
            archive.by_name("mimetype").unwrap().compression(),
            CompressionMethod::Stored
        );
        assert_eq!(
            archive.by_name("content.xml").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_garbage_is_not_a_package() {
        assert!(TemplatePackage::from_reader(Cursor::new(b"not a zip".to_vec())).is_err());
    }
}
