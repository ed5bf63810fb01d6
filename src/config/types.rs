//! Configuration type definitions.
//!
//! This module contains all the data structures used in quire configuration
//! files. These types are pure data - no I/O or complex logic.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Site configuration
// =============================================================================

/// Root site configuration - defines the whole site build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title, available to templates as `site.title`
    pub title: Option<String>,

    /// Canonical site URL (no trailing slash)
    pub url: Option<String>,

    /// Path prefix applied to every generated URL (e.g. "/docs")
    #[serde(default)]
    pub base_path: String,

    /// Directory containing source content, relative to the config file
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Directory output files are written to, relative to the config file
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Locale used when a resource declares none
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Locales the site is allowed to emit URLs for
    #[serde(default = "default_available_locales")]
    pub available_locales: Vec<String>,

    /// Whether the default locale appears as a URL segment
    #[serde(default)]
    pub prefix_default_locale: bool,

    /// Abort the whole build on the first resource-scoped error
    #[serde(default)]
    pub strict: bool,

    /// Collections in registration order
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,

    /// Paths to skip during the read phase, matched against whole path
    /// components (a directory name, a file name, or a multi-component run).
    /// Kept as a raw YAML value so validation can reject non-sequence
    /// shapes with a configuration error instead of a serde error.
    #[serde(default)]
    pub exclude: Option<serde_yaml::Value>,

    /// Paths to read even when they match an exclusion
    #[serde(default)]
    pub include: Option<serde_yaml::Value>,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_available_locales() -> Vec<String> {
    vec!["en".to_string()]
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: None,
            url: None,
            base_path: String::new(),
            source: default_source(),
            output: default_output(),
            default_locale: default_locale(),
            available_locales: default_available_locales(),
            prefix_default_locale: false,
            strict: false,
            collections: Vec::new(),
            exclude: None,
            include: None,
        }
    }
}

impl SiteConfig {
    /// Look up a collection's configuration by label.
    pub fn collection(&self, label: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == label)
    }
}

// =============================================================================
// Collection configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Unique label for this collection (also names its directory: `_<name>`)
    pub name: String,

    /// Permalink style name (`pretty`, `simple`, `date`) or a literal
    /// template string containing `:placeholder` segments
    pub permalink: Option<String>,

    /// Front matter key to sort members by after the read phase
    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_direction: SortDirection,

    /// Whether members of this collection are written to disk
    #[serde(default = "default_true")]
    pub output: bool,

    /// Relation schema against other collections
    #[serde(default)]
    pub relations: RelationsConfig,

    /// Front matter defaults applied beneath each member's own data
    #[serde(default)]
    pub defaults: serde_yaml::Mapping,
}

fn default_true() -> bool {
    true
}

impl CollectionConfig {
    /// Create a collection config with just a name and defaults elsewhere.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permalink: None,
            sort_by: None,
            sort_direction: SortDirection::default(),
            output: true,
            relations: RelationsConfig::default(),
            defaults: serde_yaml::Mapping::new(),
        }
    }

    /// The directory this collection reads from, relative to the source root.
    pub fn directory(&self) -> String {
        format!("_{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

// =============================================================================
// Relations configuration
// =============================================================================

/// Relation schema for a collection.
///
/// Keys are relation kinds, values are the labels of the target collections:
///
/// ```yaml
/// relations:
///   belongs_to: [authors]
///   has_many: [posts]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationsConfig {
    #[serde(default)]
    pub belongs_to: Vec<String>,

    #[serde(default)]
    pub belongs_to_many: Vec<String>,

    #[serde(default)]
    pub has_many: Vec<String>,

    #[serde(default)]
    pub has_one: Vec<String>,
}

impl RelationsConfig {
    /// All collections this schema references, for validation.
    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.belongs_to
            .iter()
            .chain(&self.belongs_to_many)
            .chain(&self.has_many)
            .chain(&self.has_one)
    }
}

/// The kind of a relation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    BelongsTo,
    BelongsToMany,
    HasMany,
    HasOne,
}

// =============================================================================
// Path filters and permalink styles
// =============================================================================

/// `exclude`/`include` lists after validation.
#[derive(Debug, Clone, Default)]
pub struct PathFilters {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
}

/// Permalink style presets, selectable by name in collection config.
pub fn permalink_styles() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("pretty", "/:locale/:collection/:categories/:year/:month/:day/:slug/"),
        ("simple", "/:locale/:collection/:categories/:slug/"),
        ("date", "/:locale/:collection/:categories/:year/:month/:day/:slug.*"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_config_defaults() {
        let config: SiteConfig = serde_yaml::from_str("title: Test").unwrap();
        assert_eq!(config.title, Some("Test".to_string()));
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.available_locales, vec!["en"]);
        assert!(!config.prefix_default_locale);
        assert!(!config.strict);
        assert_eq!(config.source, PathBuf::from("src"));
    }

    #[test]
    fn test_collection_config_parse() {
        let yaml = r#"
name: posts
permalink: pretty
sort_by: date
sort_direction: descending
"#;
        let config: CollectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "posts");
        assert_eq!(config.permalink.as_deref(), Some("pretty"));
        assert_eq!(config.sort_direction, SortDirection::Descending);
        assert!(config.output);
        assert_eq!(config.directory(), "_posts");
    }

    #[test]
    fn test_relations_config_targets() {
        let yaml = r#"
belongs_to: [authors]
has_many: [posts, reviews]
"#;
        let relations: RelationsConfig = serde_yaml::from_str(yaml).unwrap();
        let targets: Vec<_> = relations.targets().collect();
        assert_eq!(targets, vec!["authors", "posts", "reviews"]);
    }

    #[test]
    fn test_permalink_styles_known() {
        let styles = permalink_styles();
        assert!(styles.contains_key("pretty"));
        assert!(styles.contains_key("simple"));
        assert!(styles.contains_key("date"));
    }
}
