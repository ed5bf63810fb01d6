//! Resources: the content units flowing through the build.
//!
//! A resource progresses through pipeline states:
//! 1. Unprocessed: raw content read, front matter extracted
//! 2. ContentRendered: template constructs in the body expanded
//! 3. MarkupConverted: converter chain applied (markdown -> HTML etc.)
//! 4. LayoutApplied: wrapped in its layout chain
//! 5. Written: output bytes persisted by the writer
//!
//! `output` is only ever `Some` after a successful full pipeline run.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};

use crate::config::SiteConfig;

use super::permalink::Destination;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("malformed front matter: {0}")]
    Malformed(#[from] serde_yaml::Error),

    #[error("front matter must be a YAML mapping")]
    NotAMapping,
}

// =============================================================================
// Pipeline state
// =============================================================================

/// Where a resource is in the transformation pipeline.
///
/// Transitions only move forward; re-running a completed resource resets it
/// to `Unprocessed` first (live-reload re-entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    Unprocessed,
    ContentRendered,
    MarkupConverted,
    LayoutApplied,
    Written,
}

/// One entry in a resource's conversion-step log, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct ConversionStep {
    /// Name of the converter or pipeline stage that ran
    pub stage: String,
    /// Extension of the content going in
    pub input_ext: String,
    /// Extension of the content coming out
    pub output_ext: String,
}

// =============================================================================
// Layered resource data
// =============================================================================

/// A resource's metadata, materialized once from its layered sources:
/// explicit front matter, then collection defaults. Front matter wins on
/// key conflicts. Key order follows the merged insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    map: Mapping,
}

impl ResourceData {
    /// Merge front matter over collection defaults into one map.
    pub fn layered(front_matter: Mapping, defaults: &Mapping) -> Self {
        let mut map = defaults.clone();
        for (key, value) in front_matter {
            map.insert(key, value);
        }
        Self { map }
    }

    pub fn from_mapping(map: Mapping) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(Value::String(key.to_string()))
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.map.insert(Value::String(key.to_string()), value);
    }

    /// String-valued lookup; numbers and bools are not coerced.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// A key that may hold either a single string or a sequence of strings.
    /// Used for `categories`, `tags`, and relation foreign keys.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::String(s)) => {
                s.split_whitespace().map(str::to_string).collect()
            }
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.map
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// =============================================================================
// Front matter parsing
// =============================================================================

/// Result of splitting a source file into front matter and body.
#[derive(Debug)]
pub struct ParsedSource {
    pub front_matter: Mapping,
    pub body: String,
}

/// Split a `---` delimited YAML front matter block from content.
///
/// Content without a front matter block parses to an empty mapping.
/// Malformed YAML inside the block is a typed error so the caller can
/// decide between skipping the resource and aborting the build.
pub fn parse_front_matter(raw: &str) -> Result<ParsedSource, FrontMatterError> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with("---") {
        return Ok(ParsedSource {
            front_matter: Mapping::new(),
            body: raw.to_string(),
        });
    }

    let after_opening = &trimmed[3..];
    let Some(closing) = after_opening.find("\n---") else {
        return Ok(ParsedSource {
            front_matter: Mapping::new(),
            body: raw.to_string(),
        });
    };

    let yaml_block = after_opening[..closing].trim_start_matches('\n');
    let body_start = 3 + closing + 4;
    let body = if body_start < trimmed.len() {
        trimmed[body_start..].trim_start_matches('\n').to_string()
    } else {
        String::new()
    };

    let front_matter = if yaml_block.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml_block)? {
            Value::Mapping(map) => map,
            _ => return Err(FrontMatterError::NotAMapping),
        }
    };

    Ok(ParsedSource { front_matter, body })
}

// =============================================================================
// Resource
// =============================================================================

/// A content unit: one source file plus its metadata, content, and output.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Source-relative path; immutable after creation
    pub relative_path: PathBuf,

    /// Label of the owning collection (arena key, not a pointer)
    pub collection: String,

    /// Resource locale; defaults to the site default locale
    pub locale: String,

    /// Layered metadata (front matter over collection defaults)
    pub data: ResourceData,

    /// Raw body as read from disk, before any transformation
    pub untransformed_content: String,

    /// Working content, mutated as pipeline stages run
    pub content: String,

    /// Final rendered bytes; `None` until the pipeline completes
    pub output: Option<String>,

    pub state: TransformState,

    /// Conversion-step log for diagnostics
    pub steps: Vec<ConversionStep>,

    /// Destination cache, valid for the duration of one build
    pub(crate) destination: Option<Destination>,

    /// Set when the read phase failed for this resource (e.g. malformed
    /// front matter in non-strict mode). The pipeline skips such resources
    /// and their `output` stays `None`.
    pub read_error: Option<String>,
}

impl Resource {
    /// Build a resource from raw file content.
    pub fn from_raw(
        relative_path: PathBuf,
        collection: &str,
        raw: &str,
        defaults: &Mapping,
        config: &SiteConfig,
    ) -> Result<Self, FrontMatterError> {
        let parsed = parse_front_matter(raw)?;
        let data = ResourceData::layered(parsed.front_matter, defaults);
        let locale = resolve_locale(&relative_path, &data, config);

        Ok(Self {
            relative_path,
            collection: collection.to_string(),
            locale,
            data,
            untransformed_content: parsed.body.clone(),
            content: parsed.body,
            output: None,
            state: TransformState::Unprocessed,
            steps: Vec::new(),
            destination: None,
            read_error: None,
        })
    }

    /// Build a placeholder resource for a file whose read phase failed.
    /// It stays in the collection (so sibling ordering is untouched) but
    /// the pipeline will skip it.
    pub fn failed(relative_path: PathBuf, collection: &str, config: &SiteConfig, error: String) -> Self {
        Self {
            relative_path,
            collection: collection.to_string(),
            locale: config.default_locale.clone(),
            data: ResourceData::default(),
            untransformed_content: String::new(),
            content: String::new(),
            output: None,
            state: TransformState::Unprocessed,
            steps: Vec::new(),
            destination: None,
            read_error: Some(error),
        }
    }

    /// File extension with leading dot, lowercased. Empty string if none.
    pub fn extension(&self) -> String {
        self.relative_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// Basename without extension (and without a locale suffix).
    pub fn basename(&self) -> String {
        let stem = self
            .relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        // "about.fr" -> "about" when "fr" is a locale-shaped suffix
        match stem.rsplit_once('.') {
            Some((name, suffix)) if looks_like_locale(suffix) => name.to_string(),
            _ => stem.to_string(),
        }
    }

    /// Slug: explicit front matter `slug`, falling back to the basename
    /// minus any date prefix.
    pub fn slug(&self) -> String {
        if let Some(slug) = self.data.string("slug") {
            return slug.to_string();
        }
        let name = self.basename();
        match strip_date_prefix(&name) {
            Some((_, rest)) => rest.to_string(),
            None => name,
        }
    }

    /// Title: explicit front matter `title`, falling back to the slug.
    pub fn title(&self) -> String {
        self.data
            .string("title")
            .map(str::to_string)
            .unwrap_or_else(|| self.slug())
    }

    /// The resource's effective date: front matter `date`, then a
    /// `YYYY-MM-DD-` filename prefix, then `None` (the caller substitutes
    /// the build time as a last resort).
    pub fn date(&self) -> Option<NaiveDateTime> {
        if let Some(value) = self.data.get("date") {
            if let Some(date) = parse_date_value(value) {
                return Some(date);
            }
        }

        let name = self
            .relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        strip_date_prefix(name).and_then(|(date, _)| date.and_hms_opt(0, 0, 0))
    }

    /// The front matter `date` alone, with no filename fallback. `None`
    /// when the key is absent or its value does not parse; callers that
    /// must distinguish the two check the key's presence themselves.
    pub fn declared_date(&self) -> Option<NaiveDateTime> {
        self.data.get("date").and_then(parse_date_value)
    }

    /// The layout label this resource asks for, if any. `layout: none`
    /// explicitly opts out of layout wrapping.
    pub fn layout(&self) -> Option<&str> {
        self.data.string("layout")
    }

    pub fn categories(&self) -> Vec<String> {
        self.data.string_list("categories")
    }

    pub fn tags(&self) -> Vec<String> {
        self.data.string_list("tags")
    }

    /// Reset to the initial pipeline state, dropping any previous output.
    /// Used when re-running the pipeline on an already-completed resource.
    pub fn reset(&mut self) {
        self.content = self.untransformed_content.clone();
        self.output = None;
        self.state = TransformState::Unprocessed;
        self.steps.clear();
        self.destination = None;
    }

    /// Identity comparison for graph queries: same collection, same path.
    pub fn same_identity(&self, other: &Resource) -> bool {
        self.collection == other.collection && self.relative_path == other.relative_path
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Locale resolution order: front matter `locale`, then a filename suffix
/// (`about.fr.md`), then the site default. Unknown locales fall back to the
/// default.
fn resolve_locale(path: &Path, data: &ResourceData, config: &SiteConfig) -> String {
    if let Some(locale) = data.string("locale") {
        if config.available_locales.iter().any(|l| l == locale) {
            return locale.to_string();
        }
        tracing::warn!(
            path = %path.display(),
            locale,
            "resource declares a locale not in available_locales; using default"
        );
        return config.default_locale.clone();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if let Some((_, suffix)) = stem.rsplit_once('.') {
        if config.available_locales.iter().any(|l| l == suffix) {
            return suffix.to_string();
        }
    }

    config.default_locale.clone()
}

/// Suffixes shaped like locale codes: "fr", "en", "pt-br".
fn looks_like_locale(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 5
        && s.chars().all(|c| c.is_ascii_lowercase() || c == '-')
}

/// Split a `YYYY-MM-DD-rest` filename into date and remainder.
pub fn strip_date_prefix(name: &str) -> Option<(NaiveDate, &str)> {
    if name.len() < 11 || !name.is_char_boundary(10) {
        return None;
    }
    let (date_part, rest) = name.split_at(10);
    let rest = rest.strip_prefix('-')?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    if rest.is_empty() {
        return None;
    }
    Some((date, rest))
}

/// Parse a front matter date value: YAML string in a handful of common
/// formats.
fn parse_date_value(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?;
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
