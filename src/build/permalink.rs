//! Permalink templates and destinations.
//!
//! A permalink template is a `/`-delimited string whose `:name` segments
//! are resolved per resource by the placeholder registry. Segments that
//! resolve to nothing are dropped entirely rather than replaced with an
//! empty string, so generated URLs never contain `//`.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::config::{permalink_styles, SiteConfig};

use super::converters::ConverterRegistry;
use super::placeholders::{
    PlaceholderContext, PlaceholderError, PlaceholderRegistry, PlaceholderValue,
};
use super::resource::Resource;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum PermalinkError {
    /// The template produced an empty or unusable URL.
    #[error("permalink template '{template}' produced an invalid URL for {path}")]
    InvalidPermalink { template: String, path: String },

    #[error(transparent)]
    InvalidDate(#[from] PlaceholderError),
}

// =============================================================================
// Destination
// =============================================================================

/// A resource's computed output identity: the web-facing URL and the
/// filesystem path it will be written to. Derived, never stored in config;
/// cached per resource for the duration of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub relative_url: String,
    pub output_path: PathBuf,
}

impl Destination {
    /// Map a relative URL onto the output directory.
    ///
    /// Index URLs (trailing slash) become `dir/index.html`; URLs whose
    /// last segment carries an extension map to that file directly. The
    /// site base path is a URL concern only and is stripped before the
    /// filesystem mapping.
    pub fn new(relative_url: &str, base_path: &str, output_root: &Path) -> Self {
        let mut url_path = relative_url.to_string();
        if !base_path.is_empty() {
            let prefix = format!("/{}", base_path.trim_matches('/'));
            if let Some(stripped) = url_path.strip_prefix(&prefix) {
                url_path = if stripped.is_empty() {
                    "/".to_string()
                } else {
                    stripped.to_string()
                };
            }
        }

        let trimmed = url_path.trim_matches('/');
        let output_path = if trimmed.is_empty() {
            output_root.join("index.html")
        } else if url_path.ends_with('/') {
            output_root.join(trimmed).join("index.html")
        } else {
            output_root.join(trimmed)
        };

        Self {
            relative_url: relative_url.to_string(),
            output_path,
        }
    }
}

// =============================================================================
// Permalink engine
// =============================================================================

/// How a permalink template ends, which decides the final extension.
#[derive(Debug, PartialEq, Eq)]
enum Ending {
    /// Trailing `/`: an index URL, extension implied
    Index,
    /// Trailing `.*`: use the converter-computed output extension
    Wildcard,
    /// An explicit extension spelled in the template
    Explicit(String),
    /// No extension at all
    Bare,
}

/// Resolves permalink templates into relative URLs and destinations.
pub struct PermalinkEngine<'a> {
    pub config: &'a SiteConfig,
    pub placeholders: &'a PlaceholderRegistry,
    pub converters: &'a ConverterRegistry,
    pub build_time: NaiveDateTime,
}

impl PermalinkEngine<'_> {
    /// Compute the web-facing relative URL for a resource.
    ///
    /// Pure with respect to the resource's data: repeated invocations
    /// yield the same URL.
    pub fn transform(&self, resource: &Resource) -> Result<String, PermalinkError> {
        let template = self.template_for(resource);

        let (body, ending) = split_ending(&template);
        let segments = self.resolve_segments(&body, resource)?;

        let mut url = format!("/{}", segments.join("/"));

        let output_ext = match &ending {
            Ending::Wildcard => Some(self.converters.output_extension(resource)),
            Ending::Explicit(ext) => Some(ext.clone()),
            Ending::Index | Ending::Bare => None,
        };

        // HTML output collapses a trailing `index` segment into its
        // directory URL.
        let is_html = matches!(&ending, Ending::Index)
            || output_ext.as_deref() == Some(".html");
        if is_html && (url.ends_with("/index") || url == "/index") {
            url.truncate(url.len() - "index".len());
        }

        match ending {
            Ending::Index => {
                if !url.ends_with('/') {
                    url.push('/');
                }
            }
            Ending::Wildcard | Ending::Explicit(_) => {
                if let Some(ext) = &output_ext {
                    if ext == ".html" && url.ends_with('/') {
                        // Collapsed index URL keeps its trailing slash.
                    } else if url == "/" {
                        return Err(PermalinkError::InvalidPermalink {
                            template,
                            path: resource.relative_path.display().to_string(),
                        });
                    } else {
                        url.push_str(ext);
                    }
                }
            }
            Ending::Bare => {}
        }

        Ok(self.prefix_base_path(&url))
    }

    /// Compute (or reuse) the resource's destination and cache it.
    pub fn destination(
        &self,
        resource: &mut Resource,
        output_root: &Path,
    ) -> Result<Destination, PermalinkError> {
        if let Some(dest) = &resource.destination {
            return Ok(dest.clone());
        }
        let relative_url = self.transform(resource)?;
        let dest = Destination::new(&relative_url, &self.config.base_path, output_root);
        resource.destination = Some(dest.clone());
        Ok(dest)
    }

    /// The template in effect: explicit front matter permalink, then the
    /// collection's configured style or template, then `pretty`.
    fn template_for(&self, resource: &Resource) -> String {
        let styles = permalink_styles();
        let configured = resource
            .data
            .string("permalink")
            .map(str::to_string)
            .or_else(|| {
                self.config
                    .collection(&resource.collection)
                    .and_then(|c| c.permalink.clone())
            })
            .unwrap_or_else(|| "pretty".to_string());

        match styles.get(configured.as_str()) {
            Some(template) => template.to_string(),
            None => configured,
        }
    }

    fn resolve_segments(
        &self,
        body: &str,
        resource: &Resource,
    ) -> Result<Vec<String>, PermalinkError> {
        let collection_dir = self
            .config
            .collection(&resource.collection)
            .map(|c| c.directory())
            .unwrap_or_else(|| format!("_{}", resource.collection));
        let ctx = PlaceholderContext {
            config: self.config,
            collection: &resource.collection,
            collection_dir: &collection_dir,
            build_time: self.build_time,
        };

        let mut segments = Vec::new();
        for segment in body.split('/') {
            if segment.is_empty() {
                continue;
            }
            let Some(name) = segment.strip_prefix(':') else {
                segments.push(segment.to_string());
                continue;
            };

            match self.placeholders.resolve(name, resource, &ctx) {
                // Unregistered placeholder names pass through literally.
                None => segments.push(segment.to_string()),
                Some(resolved) => match resolved? {
                    None => continue,
                    Some(PlaceholderValue::One(value)) => {
                        let slugged = slug_segment(&value);
                        if !slugged.is_empty() {
                            segments.push(slugged);
                        }
                    }
                    Some(PlaceholderValue::Many(values)) => {
                        for value in values {
                            let slugged = slug_segment(&value);
                            if !slugged.is_empty() {
                                segments.push(slugged);
                            }
                        }
                    }
                },
            }
        }
        Ok(segments)
    }

    /// Prefix the configured base path with exactly one separating slash.
    fn prefix_base_path(&self, url: &str) -> String {
        let base = self.config.base_path.trim_matches('/');
        if base.is_empty() {
            return url.to_string();
        }
        if url == "/" {
            format!("/{base}/")
        } else {
            format!("/{base}{url}")
        }
    }
}

/// Slugify one dynamic URL segment. Unicode is transliterated to ASCII so
/// every emitted segment is URL-safe. Segments that are already clean
/// slugs pass through unchanged.
fn slug_segment(value: &str) -> String {
    slug::slugify(value)
}

/// Split a template into its body and its ending rule.
fn split_ending(template: &str) -> (String, Ending) {
    if template == "/" {
        return (String::new(), Ending::Index);
    }
    if let Some(body) = template.strip_suffix("/") {
        return (body.to_string(), Ending::Index);
    }
    if let Some(body) = template.strip_suffix(".*") {
        return (body.to_string(), Ending::Wildcard);
    }

    // An explicit extension only counts when the last segment has a dot
    // outside of a placeholder name.
    let last_segment = template.rsplit('/').next().unwrap_or_default();
    if let Some(dot) = last_segment.rfind('.') {
        if !last_segment[dot..].contains(':') && dot + 1 < last_segment.len() {
            let ext = last_segment[dot..].to_string();
            let body = template[..template.len() - ext.len()].to_string();
            return (body, Ending::Explicit(ext));
        }
    }

    (template.to_string(), Ending::Bare)
}
