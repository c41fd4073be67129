//! Renderer registry - routes a format tag to its renderer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DocgenConfig;

use super::docx::DocxRenderer;
use super::odt::OdtRenderer;
use super::pdf::PdfRenderer;
use super::traits::Renderer;

/// Format tags are matched case-insensitively.
#[derive(Default, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// PDF, ODT and DOCX renderers wired from `config`.
    pub fn with_defaults(config: &DocgenConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfRenderer::from_config(
            &config.pdf_engine,
            &config.static_base_url,
            &config.temp_dir,
        )));
        registry.register(Arc::new(OdtRenderer::new(
            config.media_root.clone(),
            config.temp_dir.clone(),
        )));
        registry.register(Arc::new(DocxRenderer::new(config.temp_dir.clone())));
        registry
    }

    /// Register a renderer under its format tag, returning the one it replaced.
    pub fn register(&mut self, renderer: Arc<dyn Renderer>) -> Option<Arc<dyn Renderer>> {
        let key = renderer.format().to_ascii_lowercase();
        self.renderers.insert(key, renderer)
    }

    /// `None` when no renderer handles `format`.
    pub fn get(&self, format: &str) -> Option<Arc<dyn Renderer>> {
        self.renderers
            .get(&format.trim().to_ascii_lowercase())
            .cloned()
    }

    /// Registered format tags, sorted.
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.renderers.keys().cloned().collect();
        formats.sort();
        formats
    }
}
