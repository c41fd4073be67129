//! Office Open XML (`.docx`) rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::package::{PackageWriter, TemplatePackage, ZipPackageWriter};
use super::scoped::ScopedTempArtifact;
use super::templating::{base_environment, render_source, repair_xml_placeholders};
use super::traits::Renderer;
use super::{DocumentFormat, GenerateError, RenderContext};

const DOCUMENT_PART: &str = "word/document.xml";

/// Body, headers and footers carry template placeholders.
fn is_templated_part(name: &str) -> bool {
    if name == DOCUMENT_PART {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && file.ends_with(".xml")
        && (file.starts_with("header") || file.starts_with("footer"))
}

pub struct DocxRenderer {
    temp_dir: PathBuf,
    writer: Arc<dyn PackageWriter>,
}

impl DocxRenderer {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            writer: Arc::new(ZipPackageWriter),
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn PackageWriter>) -> Self {
        self.writer = writer;
        self
    }

    fn render_package(
        &self,
        template: &TemplatePackage,
        context: &RenderContext,
        output: &Path,
    ) -> Result<Vec<u8>, GenerateError> {
        let format = self.format();
        let env = base_environment();
        let mut package = template.clone();

        for part in template.names().filter(|name| is_templated_part(name)) {
            let raw = template.get(part).unwrap_or_default();
            let xml = std::str::from_utf8(raw)
                .map_err(|err| GenerateError::render_failure(format, format!("{part}: {err}")))?;
            let source = repair_xml_placeholders(format, xml)?;
            let rendered = render_source(&env, format, &source, context)?;
            package.set_string(part, rendered);
        }

        self.writer
            .write(&package, output, &[])
            .map_err(|err| GenerateError::render_failure(format, err))?;
        fs::read(output).map_err(|err| GenerateError::render_failure(format, err))
    }
}

impl Renderer for DocxRenderer {
    fn format(&self) -> &str {
        DocumentFormat::Docx.tag()
    }

    fn template_extension(&self) -> &str {
        DocumentFormat::Docx.template_extension()
    }

    fn render(&self, template: &Path, context: &RenderContext) -> Result<Vec<u8>, GenerateError> {
        if !template.is_file() {
            return Err(GenerateError::template_not_found(template));
        }

        let format = self.format();
        let package = TemplatePackage::open(template)
            .map_err(|err| GenerateError::render_failure(format, err))?;
        if !package.contains(DOCUMENT_PART) {
            return Err(GenerateError::render_failure(
                format,
                format!("template package has no {DOCUMENT_PART}"),
            ));
        }

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
