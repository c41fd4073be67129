//! Runtime configuration for the document generator.
//!
//! Everything the renderers need from the outside world is carried here and
//! handed to [`DocumentGenerator::new`](crate::DocumentGenerator::new) at
//! construction time.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_TEMPLATE_ROOT: &str = "DOCGEN_TEMPLATE_ROOT";
pub const ENV_STATIC_URL: &str = "DOCGEN_STATIC_URL";
pub const ENV_MEDIA_ROOT: &str = "DOCGEN_MEDIA_ROOT";
pub const ENV_TEMP_DIR: &str = "DOCGEN_TEMP_DIR";
pub const ENV_PDF_ENGINE: &str = "DOCGEN_PDF_ENGINE";
pub const ENV_PDF_ENGINE_ARGS: &str = "DOCGEN_PDF_ENGINE_ARGS";

const DEFAULT_TEMPLATE_ROOT: &str = "./templates";
const DEFAULT_STATIC_URL: &str = "file:///";
const DEFAULT_MEDIA_ROOT: &str = "./media";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is set but empty")]
    Empty { name: &'static str },
    #[error("{name} contains invalid unicode")]
    NotUnicode { name: &'static str },
}

/// How HTML is turned into PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PdfEngineConfig {
    /// In-process text layout, no external tooling.
    #[default]
    Builtin,
    /// External HTML to PDF program. `{input}`, `{output}` and `{base_url}`
    /// are substituted in `args`.
    Command { program: String, args: Vec<String> },
}

impl PdfEngineConfig {
    /// Arguments understood by the `weasyprint` CLI.
    pub fn weasyprint() -> Self {
        Self::Command {
            program: "weasyprint".to_string(),
            args: vec![
                "--base-url".to_string(),
                "{base_url}".to_string(),
                "{input}".to_string(),
                "{output}".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocgenConfig {
    /// Directory holding `<category>/<name>.<ext>` templates.
    pub template_root: PathBuf,
    /// Base URL used to resolve stylesheets and images referenced by HTML templates.
    pub static_base_url: String,
    /// Directory that ODT templates resolve embedded images against.
    pub media_root: PathBuf,
    /// Where scoped temporary artifacts are created.
    #[serde(default = "env::temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default)]
    pub pdf_engine: PdfEngineConfig,
}

impl Default for DocgenConfig {
    fn default() -> Self {
        Self {
            template_root: PathBuf::from(DEFAULT_TEMPLATE_ROOT),
            static_base_url: DEFAULT_STATIC_URL.to_string(),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            temp_dir: env::temp_dir(),
            pdf_engine: PdfEngineConfig::Builtin,
        }
    }
}

impl DocgenConfig {
    pub fn new(template_root: impl Into<PathBuf>) -> Self {
        Self {
            template_root: template_root.into(),
            ..Self::default()
        }
    }

    pub fn with_static_base_url(mut self, url: impl Into<String>) -> Self {
        self.static_base_url = url.into();
        self
    }

    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.media_root = media_root.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_pdf_engine(mut self, engine: PdfEngineConfig) -> Self {
        self.pdf_engine = engine;
        self
    }

    /// Build a configuration from `DOCGEN_*` environment variables, falling
    /// back to defaults for unset ones.
    ///
    /// `DOCGEN_PDF_ENGINE` accepts `builtin`, `weasyprint`, or a program path;
    /// for a program path `DOCGEN_PDF_ENGINE_ARGS` holds whitespace separated
    /// argument templates.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(root) = read_var(ENV_TEMPLATE_ROOT)? {
            config.template_root = PathBuf::from(root);
        }
        if let Some(url) = read_var(ENV_STATIC_URL)? {
            config.static_base_url = url;
        }
        if let Some(media) = read_var(ENV_MEDIA_ROOT)? {
            config.media_root = PathBuf::from(media);
        }
        if let Some(temp) = read_var(ENV_TEMP_DIR)? {
            config.temp_dir = PathBuf::from(temp);
        }
        if let Some(engine) = read_var(ENV_PDF_ENGINE)? {
            config.pdf_engine = match engine.as_str() {
                "builtin" => PdfEngineConfig::Builtin,
                "weasyprint" => PdfEngineConfig::weasyprint(),
                program => {
                    let args = read_var(ENV_PDF_ENGINE_ARGS)?
                        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_else(|| vec!["{input}".to_string(), "{output}".to_string()]);
                    PdfEngineConfig::Command {
                        program: program.to_string(),
                        args,
                    }
                }
            };
        }

        Ok(config)
    }
}

fn read_var(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty { name }),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { name }),
    }
}
