//! Pipeline error types.
//!
//! Every variant here is resource-scoped: it fails one resource's
//! transformation, and the caller decides (strict mode) whether that
//! aborts the whole build. Site-wide configuration problems live in
//! `ConfigError` instead and always abort.

use crate::build::converters::ConversionError;
use crate::build::permalink::PermalinkError;
use crate::build::render::RenderError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("malformed front matter in {path}: {message}")]
    FrontMatter { path: String, message: String },

    #[error(transparent)]
    Permalink(#[from] PermalinkError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("template render failed for {path}: {source}")]
    TemplateRender {
        path: String,
        #[source]
        source: RenderError,
    },
}

impl PipelineError {
    /// The pipeline stage a variant belongs to, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FrontMatter { .. } => "read",
            Self::Permalink(_) => "permalink",
            Self::Conversion(_) => "convert",
            Self::TemplateRender { .. } => "render",
        }
    }
}
