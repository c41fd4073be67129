//! Document generation facade.

use log::{error, info, warn};

use crate::config::DocgenConfig;

use super::locator::TemplateLocator;
use super::registry::RendererRegistry;
use super::{GenerateError, RenderContext};

/// Single entry point for rendering `<category>/<name>` in a given format.
///
/// Holds only immutable state; share it behind an `Arc` across threads.
pub struct DocumentGenerator {
    locator: TemplateLocator,
    registry: RendererRegistry,
}

impl DocumentGenerator {
    /// Generator with the PDF, ODT and DOCX renderers.
    pub fn new(config: &DocgenConfig) -> Self {
        Self::with_registry(
            TemplateLocator::new(config.template_root.clone()),
            RendererRegistry::with_defaults(config),
        )
    }

    pub fn with_registry(locator: TemplateLocator, registry: RendererRegistry) -> Self {
        Self { locator, registry }
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &TemplateLocator {
        &self.locator
    }

    /// Render the template `category/name` with `context` as `format`.
    ///
    /// `format` is matched case-insensitively. The returned bytes belong to
    /// the caller; pick the content type from the requested format.
    pub fn generate(
        &self,
        category: &str,
        name: &str,
        context: &RenderContext,
        format: &str,
    ) -> Result<Vec<u8>, GenerateError> {
        info!(
            "generating document: template={}/{} format={} keys={}",
            category,
            name,
            format,
            context.len()
        );

        let Some(renderer) = self.registry.get(format) else {
            warn!(
                "document generation rejected: template={}/{} format={} kind=unsupported_format",
                category, name, format
            );
            return Err(GenerateError::UnsupportedFormat {
                requested: format.to_string(),
                supported: self.registry.formats(),
            });
        };

        let result = self
            .locator
            .locate(category, name, renderer.template_extension())
            .and_then(|path| renderer.render(&path, context));

        match &result {
            Ok(bytes) => info!(
                "document generated: template={}/{} format={} bytes={}",
                category,
                name,
                renderer.format(),
                bytes.len()
            ),
            Err(err) => error!(
                "document generation failed: template={}/{} format={} kind={} error={}",
                category,
                name,
                renderer.format(),
                err.kind(),
                err
            ),
        }

        result
    }
}
