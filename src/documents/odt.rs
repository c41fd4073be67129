//! OpenDocument Text rendering.
//!
//! The template is an `.odt` package whose `content.xml` and `styles.xml`
//! contain Jinja placeholders. Images referenced through the `image` filter
//! are copied from the media root into `Pictures/` and declared in the
//! manifest.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::debug;
use minijinja::value::Value;
use minijinja::{Error, ErrorKind};
use parking_lot::Mutex;
use uuid::Uuid;

use super::package::{PackageWriter, TemplatePackage, ZipPackageWriter};
use super::scoped::ScopedTempArtifact;
use super::templating::{base_environment, render_source, repair_xml_placeholders};
use super::traits::Renderer;
use super::{DocumentFormat, GenerateError, RenderContext};

const MIMETYPE_ENTRY: &str = "mimetype";
const MANIFEST_ENTRY: &str = "META-INF/manifest.xml";
const MANIFEST_CLOSE: &str = "</manifest:manifest>";
const TEMPLATED_PARTS: [&str; 2] = ["content.xml", "styles.xml"];
const PICTURES_DIR: &str = "Pictures";

/// An image pulled in by the `image` filter during one render.
#[derive(Debug, Clone)]
struct MediaEntry {
    source: PathBuf,
    href: String,
}

/// Collects media references while the template renders.
#[derive(Debug, Default)]
struct MediaCollector {
    entries: Mutex<Vec<MediaEntry>>,
}

impl MediaCollector {
    /// Register `source` and return its in-package href, reusing the href
    /// when the same file is referenced twice.
    fn register(&self, source: PathBuf) -> String {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.iter().find(|entry| entry.source == source) {
            return existing.href.clone();
        }

        let extension = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        let href = format!("{}/{}{}", PICTURES_DIR, Uuid::new_v4().simple(), extension);
        entries.push(MediaEntry {
            source,
            href: href.clone(),
        });
        href
    }

    fn take(&self) -> Vec<MediaEntry> {
        std::mem::take(&mut *self.entries.lock())
    }
}

pub struct OdtRenderer {
    media_root: PathBuf,
    temp_dir: PathBuf,
    writer: Arc<dyn PackageWriter>,
}

impl OdtRenderer {
    pub fn new(media_root: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
            temp_dir: temp_dir.into(),
            writer: Arc::new(ZipPackageWriter),
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn PackageWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    fn render_package(
        &self,
        template: &TemplatePackage,
        context: &RenderContext,
        output: &Path,
    ) -> Result<Vec<u8>, GenerateError> {
        let format = self.format();
        let collector = Arc::new(MediaCollector::default());

        let mut env = base_environment();
        let media_root = self.media_root.clone();
        let filter_collector = Arc::clone(&collector);
        env.add_filter("image", move |path: String| -> Result<Value, Error> {
            let source = resolve_media(&media_root, &path)?;
            Ok(Value::from_safe_string(filter_collector.register(source)))
        });

        let mut package = template.clone();
        for part in TEMPLATED_PARTS {
            let Some(raw) = template.get(part) else {
                continue;
            };
            let xml = std::str::from_utf8(raw)
                .map_err(|err| GenerateError::render_failure(format, format!("{part}: {err}")))?;
            let source = repair_xml_placeholders(format, xml)?;
            let rendered = render_source(&env, format, &source, context)?;
            package.set_string(part, rendered);
        }

        let media = collector.take();
        if !media.is_empty() {
            embed_media(&mut package, &media)
                .map_err(|err| GenerateError::render_failure(format, err))?;
        }

        self.writer
            .write(&package, output, &[MIMETYPE_ENTRY])
            .map_err(|err| GenerateError::render_failure(format, err))?;
        fs::read(output).map_err(|err| GenerateError::render_failure(format, err))
    }
}

impl Renderer for OdtRenderer {
    fn format(&self) -> &str {
        DocumentFormat::Odt.tag()
    }

    fn template_extension(&self) -> &str {
        DocumentFormat::Odt.template_extension()
    }

    fn render(&self, template: &Path, context: &RenderContext) -> Result<Vec<u8>, GenerateError> {
        if !template.is_file() {
            return Err(GenerateError::template_not_found(template));
        }

        let format = self.format();
        let package = TemplatePackage::open(template)
            .map_err(|err| GenerateError::render_failure(format, err))?;
        if !package.contains("content.xml") {
            return Err(GenerateError::render_failure(
                format,
                "template package has no content.xml",
            ));
        }

        // Dropping the artifact on any early return removes the file.
        let artifact = ScopedTempArtifact::acquire(&self.temp_dir, self.template_extension())
            .map_err(|err| GenerateError::render_failure(format, err))?;
        let bytes = self.render_package(&package, context, artifact.path())?;
        artifact
            .release()
            .map_err(|err| GenerateError::render_failure(format, err))?;
        debug!("rendered {} ({} bytes)", template.display(), bytes.len());
        Ok(bytes)
    }
}

/// Resolve a template-supplied media path inside `root`.
fn resolve_media(root: &Path, relative: &str) -> Result<PathBuf, Error> {
    let relative = Path::new(relative.trim());
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.as_os_str().is_empty() || escapes {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("media path '{}' must stay inside the media root", relative.display()),
        ));
    }

    let source = root.join(relative);
    if !source.is_file() {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("media file not found: {}", source.display()),
        ));
    }
    Ok(source)
}

fn embed_media(package: &mut TemplatePackage, media: &[MediaEntry]) -> io::Result<()> {
    let mut declarations = String::new();
    for entry in media {
        package.set(entry.href.clone(), fs::read(&entry.source)?);
        let media_type = mime_guess::from_path(&entry.source).first_or_octet_stream();
        declarations.push_str(&format!(
            r#" <manifest:file-entry manifest:full-path="{}" manifest:media-type="{}"/>"#,
            entry.href,
            media_type.essence_str()
        ));
        declarations.push('\n');
    }

    let manifest = package
        .get(MANIFEST_ENTRY)
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .ok_or_else(|| invalid_package(format!("embedded media needs {MANIFEST_ENTRY}")))?;
    let pos = manifest
        .rfind(MANIFEST_CLOSE)
        .ok_or_else(|| invalid_package(format!("{MANIFEST_ENTRY} has no {MANIFEST_CLOSE}")))?;
    let updated = format!("{}{}{}", &manifest[..pos], declarations, &manifest[pos..]);
    package.set_string(MANIFEST_ENTRY, updated);
    Ok(())
}

fn invalid_package(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
