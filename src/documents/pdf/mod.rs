//! PDF rendering: HTML template substitution followed by an HTML to PDF
//! layout pass.

pub mod engine;
pub mod layout;

pub use engine::CommandLayoutEngine;
pub use layout::BuiltinLayoutEngine;

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::config::PdfEngineConfig;

use super::templating::{base_environment, render_source};
use super::traits::Renderer;
use super::{DocumentFormat, GenerateError, RenderContext};

/// Errors raised while converting HTML to PDF.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("malformed markup: {0}")]
    Markup(String),
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write HTML source: {0}")]
    WriteHtml(#[source] std::io::Error),
    #[error("failed to run layout engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("layout engine '{program}' exited with status {code}: {stderr}")]
    Exit {
        program: String,
        code: i32,
        stderr: String,
    },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("PDF serialization failed: {0}")]
    Pdf(String),
}

/// Converts rendered HTML into PDF bytes.
pub trait LayoutEngine: Send + Sync {
    fn name(&self) -> &str;

    /// `base_url` is where relative stylesheet and image references resolve.
    fn html_to_pdf(&self, html: &str, base_url: &str) -> Result<Vec<u8>, LayoutError>;
}

pub struct PdfRenderer {
    engine: Box<dyn LayoutEngine>,
    base_url: String,
}

impl PdfRenderer {
    pub fn new(engine: Box<dyn LayoutEngine>, base_url: impl Into<String>) -> Self {
        Self {
            engine,
            base_url: base_url.into(),
        }
    }

    /// Pick the layout engine described by the configuration.
    pub fn from_config(engine: &PdfEngineConfig, base_url: &str, temp_dir: &Path) -> Self {
        let engine: Box<dyn LayoutEngine> = match engine {
            PdfEngineConfig::Builtin => Box::new(BuiltinLayoutEngine::new()),
            PdfEngineConfig::Command { program, args } => Box::new(CommandLayoutEngine::new(
                program.clone(),
                args.clone(),
                temp_dir,
            )),
        };
        Self::new(engine, base_url)
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> &str {
        DocumentFormat::Pdf.tag()
    }

    fn template_extension(&self) -> &str {
        DocumentFormat::Pdf.template_extension()
    }

    fn render(&self, template: &Path, context: &RenderContext) -> Result<Vec<u8>, GenerateError> {
        if !template.is_file() {
            return Err(GenerateError::template_not_found(template));
        }

        let format = self.format();
        let source = fs::read_to_string(template)
            .map_err(|err| GenerateError::render_failure(format, err))?;

        let env = base_environment();
        let html = render_source(&env, format, &source, context)?;
        debug!(
            "rendered {} bytes of HTML from {}, converting with {}",
            html.len(),
            template.display(),
            self.engine.name()
        );

        self.engine
            .html_to_pdf(&html, &self.base_url)
            .map_err(|err| GenerateError::render_failure(format, err))
    }
}
