//! Pluggable content converter system.
//!
//! Converters transform content from one markup to another (markdown ->
//! HTML being the common case). Many converters may match one extension;
//! they apply as a chain in priority order, each one's output feeding the
//! next one's input.
//!
//! # Adding a converter
//!
//! ```ignore
//! struct AsciidocConverter;
//!
//! impl Converter for AsciidocConverter {
//!     fn name(&self) -> &'static str { "asciidoc" }
//!     fn extensions(&self) -> &[&'static str] { &[".adoc", ".asciidoc"] }
//!     fn convert(&self, content: &str, resource: &Resource) -> Result<String, ConversionError> {
//!         // Convert AsciiDoc to HTML...
//!     }
//! }
//!
//! registry.register(AsciidocConverter);
//! ```

use pulldown_cmark::{html, Options, Parser};

use super::resource::Resource;

// =============================================================================
// Errors
// =============================================================================

/// A converter failed on specific content. Always carries the converter
/// identity and the resource path for diagnostics.
#[derive(thiserror::Error, Debug)]
#[error("converter '{converter}' failed on {path}: {message}")]
pub struct ConversionError {
    pub converter: String,
    pub path: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(
        converter: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            converter: converter.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Converter trait
// =============================================================================

/// A content converter. Stateless or config-scoped; registered once at
/// setup and read-only afterwards.
pub trait Converter: Send + Sync {
    /// Unique name, used in conversion-step logs and error context.
    fn name(&self) -> &'static str;

    /// Input extensions this converter accepts, with leading dot.
    /// Matching is case-insensitive.
    fn extensions(&self) -> &[&'static str];

    /// Selection order among competing converters: higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Content-aware refinement of extension matching. The default accepts
    /// every resource whose extension matched.
    fn matches_resource(&self, _resource: &Resource) -> bool {
        true
    }

    /// Transform content.
    fn convert(&self, content: &str, resource: &Resource) -> Result<String, ConversionError>;

    /// The extension this converter's output carries, given the input
    /// extension.
    fn output_ext(&self, _input_ext: &str) -> String {
        ".html".to_string()
    }

    /// Marks the designated no-op passthrough. The output-extension policy
    /// ignores passthrough converters when a real transformation also
    /// matched.
    fn is_passthrough(&self) -> bool {
        false
    }
}

// =============================================================================
// Built-in converters
// =============================================================================

/// Markdown to HTML via pulldown-cmark.
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".md", ".markdown"]
    }

    fn priority(&self) -> i32 {
        10
    }

    fn convert(&self, content: &str, _resource: &Resource) -> Result<String, ConversionError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES;

        let parser = Parser::new_ext(content, options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        Ok(html_output)
    }
}

/// Pass-through fallback that matches everything and changes nothing.
pub struct IdentityConverter;

impl Converter for IdentityConverter {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn extensions(&self) -> &[&'static str] {
        // Special-cased in the registry: matches every extension.
        &["*"]
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn convert(&self, content: &str, _resource: &Resource) -> Result<String, ConversionError> {
        Ok(content.to_string())
    }

    fn output_ext(&self, input_ext: &str) -> String {
        input_ext.to_string()
    }

    fn is_passthrough(&self) -> bool {
        true
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of converters, populated at setup and queried read-only during
/// the transform phase.
pub struct ConverterRegistry {
    converters: Vec<Box<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Registry with the default chain: markdown plus the identity
    /// passthrough.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownConverter);
        registry.register(IdentityConverter);
        registry
    }

    pub fn register<C: Converter + 'static>(&mut self, converter: C) {
        self.converters.push(Box::new(converter));
    }

    /// Converters matching an extension (and resource), ordered by
    /// priority descending, registration order ascending on ties.
    pub fn matching_converters(
        &self,
        extension: &str,
        resource: &Resource,
    ) -> Vec<&dyn Converter> {
        let ext = normalize_extension(extension);
        let mut matches: Vec<(usize, &dyn Converter)> = self
            .converters
            .iter()
            .enumerate()
            .filter(|(_, c)| extension_matches(c.as_ref(), &ext) && c.matches_resource(resource))
            .map(|(i, c)| (i, c.as_ref()))
            .collect();

        matches.sort_by(|(ia, a), (ib, b)| {
            b.priority().cmp(&a.priority()).then(ia.cmp(ib))
        });
        matches.into_iter().map(|(_, c)| c).collect()
    }

    /// The output extension a resource ends up with after its chain runs.
    ///
    /// Policy: of all matching converters, the last one that is not a
    /// passthrough decides. Only when every match is a passthrough does
    /// the final passthrough's extension (= input extension) apply.
    pub fn output_extension(&self, resource: &Resource) -> String {
        let extension = resource.extension();
        let chain = self.matching_converters(&extension, resource);
        let Some(last) = chain.last() else {
            return extension;
        };
        match chain.iter().rev().find(|c| !c.is_passthrough()) {
            Some(decider) => decider.output_ext(&extension),
            None => last.output_ext(&extension),
        }
    }

    /// Whether any non-passthrough converter matches this resource. When
    /// none does, the resource is treated as a static asset.
    pub fn converts(&self, resource: &Resource) -> bool {
        self.matching_converters(&resource.extension(), resource)
            .iter()
            .any(|c| !c.is_passthrough())
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn extension_matches(converter: &dyn Converter, ext: &str) -> bool {
    converter
        .extensions()
        .iter()
        .any(|e| *e == "*" || normalize_extension(e) == ext)
}

/// Normalize to lowercase with a leading dot; empty stays empty.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
