//! Template rendering, wrapping Tera.
//!
//! The engine itself is opaque to the pipeline: content goes in with a
//! set of context bindings, rendered text comes out. Context assembly
//! (which variables are visible) belongs to the pipeline, not here.

use serde::Serialize;
use tera::Tera;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Whether a piece of content contains template-engine constructs worth
/// rendering at all.
pub fn has_template_constructs(content: &str) -> bool {
    content.contains("{{") || content.contains("{%")
}

/// The template renderer.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Render raw content with the given context bindings.
    ///
    /// The content is added as a temporary template so it resolves like
    /// any registered template, then removed again.
    pub fn render_content(
        &mut self,
        content: &str,
        context: &tera::Context,
    ) -> Result<String, RenderError> {
        const TEMP_TEMPLATE_NAME: &str = "__content_render__";
        self.tera.add_raw_template(TEMP_TEMPLATE_NAME, content)?;

        let result = self.tera.render(TEMP_TEMPLATE_NAME, context);

        // Clean up the temporary template
        self.tera.templates.remove(TEMP_TEMPLATE_NAME);

        Ok(result?)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Site-level bindings visible to every render.
#[derive(Debug, Clone, Serialize)]
pub struct SiteBindings {
    pub title: Option<String>,
    pub url: Option<String>,
    pub base_path: String,
}

/// Bindings for the resource currently being rendered, visible as `page`.
#[derive(Debug, Clone, Serialize)]
pub struct PageBindings {
    pub title: String,
    pub url: Option<String>,
    pub slug: String,
    pub locale: String,
    pub collection: String,
    /// Full front matter, so templates can reach arbitrary keys
    pub data: serde_yaml::Mapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_content_substitutes_bindings() {
        let mut renderer = Renderer::new();
        let mut context = tera::Context::new();
        context.insert("name", "world");
        let out = renderer.render_content("hello {{ name }}", &context).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_render_error_is_typed() {
        let mut renderer = Renderer::new();
        let context = tera::Context::new();
        let err = renderer
            .render_content("{{ missing_filter | nope }}", &context)
            .unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn test_has_template_constructs() {
        assert!(has_template_constructs("{{ page.title }}"));
        assert!(has_template_constructs("{% if x %}{% endif %}"));
        assert!(!has_template_constructs("# plain markdown"));
    }
}
