//! Documents module - renders templates into PDF, ODT and DOCX bytes.
//!
//! - `generator` - the `DocumentGenerator` facade callers go through
//! - `registry` - format tag to renderer lookup
//! - `locator` - template path resolution
//! - `pdf`, `odt`, `docx` - one renderer per output format
//! - `scoped` - temporary files that never outlive a render call

pub mod common;
pub mod context;
pub mod docx;
pub mod generator;
pub mod locator;
pub mod odt;
pub mod package;
pub mod pdf;
pub mod registry;
pub mod scoped;
pub mod templating;
pub mod traits;

pub use context::RenderContext;
pub use docx::DocxRenderer;
pub use generator::DocumentGenerator;
pub use locator::TemplateLocator;
pub use odt::OdtRenderer;
pub use pdf::PdfRenderer;
pub use registry::RendererRegistry;
pub use scoped::ScopedTempArtifact;
pub use traits::{Renderer, Validator};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors surfaced by document generation.
///
/// `RenderFailure` only carries the message of the underlying error so that
/// callers can log it without exposing library internals.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("template not found: {}", path.display())]
    TemplateNotFound { path: PathBuf },
    #[error("unsupported document format '{requested}' (supported: {})", supported.join(", "))]
    UnsupportedFormat {
        requested: String,
        supported: Vec<String>,
    },
    #[error("failed to render {format} document: {message}")]
    RenderFailure { format: String, message: String },
}

impl GenerateError {
    pub fn template_not_found(path: impl Into<PathBuf>) -> Self {
        Self::TemplateNotFound { path: path.into() }
    }

    pub fn render_failure(format: &str, cause: impl fmt::Display) -> Self {
        Self::RenderFailure {
            format: format.to_string(),
            message: cause.to_string(),
        }
    }

    /// Short machine-readable kind, handy for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::RenderFailure { .. } => "render_failure",
        }
    }
}

/// The built-in output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Odt,
    Docx,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 3] = [Self::Pdf, Self::Odt, Self::Docx];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Odt => "odt",
            Self::Docx => "docx",
        }
    }

    /// Template file extension for this format.
    pub fn template_extension(self) -> &'static str {
        match self {
            Self::Pdf => "html",
            Self::Odt => "odt",
            Self::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DocumentFormat {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "odt" => Ok(Self::Odt),
            "docx" => Ok(Self::Docx),
            _ => Err(GenerateError::UnsupportedFormat {
                requested: s.to_string(),
                supported: Self::ALL.iter().map(|f| f.tag().to_string()).collect(),
            }),
        }
    }
}
