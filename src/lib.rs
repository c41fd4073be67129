//! Document generation for the university records backend.
//!
//! The crate renders enrollment certificates (and any other template) into
//! PDF, ODT or DOCX bytes. HTTP, persistence and business validation live in
//! the calling service; this crate only needs a [`RenderContext`] and a
//! [`DocgenConfig`].

pub mod certificate;
pub mod config;
pub mod documents;

pub use crate::config::DocgenConfig;
pub use crate::documents::{
    DocumentFormat, DocumentGenerator, GenerateError, RenderContext, Renderer, RendererRegistry,
};
