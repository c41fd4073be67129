//! Traits shared by the renderers and the request types that feed them.

use std::path::Path;

use super::{GenerateError, RenderContext};

/// Trait for validating request objects before they are rendered.
pub trait Validator {
    /// Validate the state of the object.
    fn validate(&self) -> Result<(), String>;
}

/// Renders one output format from a resolved template.
///
/// Implementations hold no per-call state, so a single instance can serve
/// concurrent renders.
pub trait Renderer: Send + Sync {
    /// Lower-case format tag this renderer is registered under (e.g. `pdf`).
    fn format(&self) -> &str;

    /// Extension appended to the template name (e.g. `html` for PDF).
    fn template_extension(&self) -> &str;

    /// Produce the finished document.
    fn render(&self, template: &Path, context: &RenderContext) -> Result<Vec<u8>, GenerateError>;
}
