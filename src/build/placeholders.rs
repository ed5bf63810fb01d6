//! Placeholder resolution for permalink templates.
//!
//! Placeholders are named tokens (`:slug`, `:year`, ...) resolved per
//! resource. The registry is open: new handlers can be registered by name
//! at configuration time. Registration finishes before any transformation
//! begins; during the transform phase the registry is read-only.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime};

use crate::config::SiteConfig;

use super::resource::Resource;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum PlaceholderError {
    /// A date-based placeholder was asked for but the resource's declared
    /// date cannot be parsed.
    #[error("invalid date '{value}' in {path}")]
    InvalidDate { path: String, value: String },
}

// =============================================================================
// Values and handlers
// =============================================================================

/// A resolved placeholder: a single segment value or a list of them.
/// `None` from a handler means the segment is omitted from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderValue {
    One(String),
    Many(Vec<String>),
}

impl PlaceholderValue {
    pub fn one(s: impl Into<String>) -> Option<Self> {
        Some(Self::One(s.into()))
    }
}

/// Context a handler resolves against: site config plus the owning
/// collection's identity and the build time used as a date fallback.
pub struct PlaceholderContext<'a> {
    pub config: &'a SiteConfig,
    pub collection: &'a str,
    pub collection_dir: &'a str,
    pub build_time: NaiveDateTime,
}

pub type PlaceholderFn = Box<
    dyn Fn(&Resource, &PlaceholderContext) -> Result<Option<PlaceholderValue>, PlaceholderError>
        + Send
        + Sync,
>;

// =============================================================================
// Registry
// =============================================================================

/// Open registry mapping placeholder names to handler functions.
pub struct PlaceholderRegistry {
    handlers: HashMap<String, PlaceholderFn>,
}

impl PlaceholderRegistry {
    /// An empty registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in placeholders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_defaults();
        registry
    }

    /// Register a handler by name, replacing any existing one.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&Resource, &PlaceholderContext) -> Result<Option<PlaceholderValue>, PlaceholderError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Whether a handler is registered for this name. Unregistered names
    /// pass through permalink templates literally.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Resolve a placeholder for a resource. Returns `None` when no
    /// handler is registered under this name.
    pub fn resolve(
        &self,
        name: &str,
        resource: &Resource,
        ctx: &PlaceholderContext,
    ) -> Option<Result<Option<PlaceholderValue>, PlaceholderError>> {
        self.handlers.get(name).map(|f| f(resource, ctx))
    }

    fn register_defaults(&mut self) {
        self.register("path", |r, ctx| {
            Ok(PlaceholderValue::one(relative_url_path(r, ctx)))
        });

        self.register("name", |r, _| Ok(PlaceholderValue::one(r.basename())));

        self.register("slug", |r, _| Ok(PlaceholderValue::one(r.slug())));

        self.register("title", |r, _| Ok(PlaceholderValue::one(r.title())));

        self.register("collection", |_, ctx| {
            Ok(PlaceholderValue::one(ctx.collection))
        });

        self.register("locale", |r, ctx| Ok(locale_segment(r, ctx)));

        self.register("categories", |r, _| {
            let categories = r.categories();
            if categories.is_empty() {
                Ok(None)
            } else {
                Ok(Some(PlaceholderValue::Many(categories)))
            }
        });

        self.register("year", |r, ctx| date_segment(r, ctx, |d| format!("{:04}", d.year())));
        self.register("month", |r, ctx| date_segment(r, ctx, |d| format!("{:02}", d.month())));
        self.register("day", |r, ctx| date_segment(r, ctx, |d| format!("{:02}", d.day())));
        self.register("i_month", |r, ctx| date_segment(r, ctx, |d| d.month().to_string()));
        self.register("i_day", |r, ctx| date_segment(r, ctx, |d| d.day().to_string()));
        self.register("short_year", |r, ctx| {
            date_segment(r, ctx, |d| format!("{:02}", d.year() % 100))
        });
    }
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// =============================================================================
// Built-in handler internals
// =============================================================================

/// `:path`: the relative path minus the collection directory prefix, the
/// file extension, and any locale suffix.
fn relative_url_path(resource: &Resource, ctx: &PlaceholderContext) -> String {
    let without_ext = resource.relative_path.with_extension("");
    let mut path = without_ext.to_string_lossy().replace('\\', "/");

    let prefix = format!("{}/", ctx.collection_dir);
    if let Some(stripped) = path.strip_prefix(&prefix) {
        path = stripped.to_string();
    }

    // Strip a locale suffix left behind by with_extension ("about.fr")
    if let Some((rest, suffix)) = path.rsplit_once('.') {
        if ctx.config.available_locales.iter().any(|l| l == suffix) {
            path = rest.to_string();
        }
    }

    path
}

/// `:locale`: omitted for the default locale unless the site prefixes it;
/// otherwise the locale code when it is configured as available.
fn locale_segment(resource: &Resource, ctx: &PlaceholderContext) -> Option<PlaceholderValue> {
    let is_default = resource.locale == ctx.config.default_locale;
    if is_default && !ctx.config.prefix_default_locale {
        return None;
    }
    if ctx
        .config
        .available_locales
        .iter()
        .any(|l| *l == resource.locale)
    {
        return PlaceholderValue::one(resource.locale.clone());
    }
    None
}

/// Shared implementation for the date-based placeholders. A declared but
/// unparseable front matter date is an error; a missing date falls back
/// to the build time.
fn date_segment(
    resource: &Resource,
    ctx: &PlaceholderContext,
    format: impl Fn(&NaiveDateTime) -> String,
) -> Result<Option<PlaceholderValue>, PlaceholderError> {
    let date = effective_date(resource, ctx)?;
    Ok(PlaceholderValue::one(format(&date)))
}

/// Front matter date, then filename date, then the site build time.
pub fn effective_date(
    resource: &Resource,
    ctx: &PlaceholderContext,
) -> Result<NaiveDateTime, PlaceholderError> {
    if let Some(raw) = resource.data.string("date") {
        // The filename date is deliberately not consulted here: a date the
        // author declared and got wrong must surface, not be papered over.
        return match resource.declared_date() {
            Some(date) => Ok(date),
            None => Err(PlaceholderError::InvalidDate {
                path: resource.relative_path.display().to_string(),
                value: raw.to_string(),
            }),
        };
    }
    Ok(resource.date().unwrap_or(ctx.build_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use serde_yaml::Mapping;
    use std::path::PathBuf;

    fn context(config: &SiteConfig) -> PlaceholderContext<'_> {
        PlaceholderContext {
            config,
            collection: "posts",
            collection_dir: "_posts",
            build_time: chrono::NaiveDate::from_ymd_opt(1999, 12, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn resource(path: &str, raw: &str, config: &SiteConfig) -> Resource {
        Resource::from_raw(PathBuf::from(path), "posts", raw, &Mapping::new(), config).unwrap()
    }

    #[test]
    fn test_slug_falls_back_to_name() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/my-note.md", "body", &config);
        let value = registry
            .resolve("slug", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(value, PlaceholderValue::one("my-note"));
    }

    #[test]
    fn test_unregistered_name_is_none() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/a.md", "body", &config);
        assert!(registry.resolve("nonsense", &r, &context(&config)).is_none());
    }

    #[test]
    fn test_date_placeholders_from_filename() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/2020-03-07-hi.md", "body", &config);
        let ctx = context(&config);

        let year = registry.resolve("year", &r, &ctx).unwrap().unwrap();
        assert_eq!(year, PlaceholderValue::one("2020"));
        let month = registry.resolve("month", &r, &ctx).unwrap().unwrap();
        assert_eq!(month, PlaceholderValue::one("03"));
        let i_day = registry.resolve("i_day", &r, &ctx).unwrap().unwrap();
        assert_eq!(i_day, PlaceholderValue::one("7"));
        let short_year = registry.resolve("short_year", &r, &ctx).unwrap().unwrap();
        assert_eq!(short_year, PlaceholderValue::one("20"));
    }

    #[test]
    fn test_date_falls_back_to_build_time() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/undated.md", "body", &config);
        let year = registry
            .resolve("year", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(year, PlaceholderValue::one("1999"));
    }

    #[test]
    fn test_invalid_date_is_error() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/a.md", "---\ndate: not-a-date\n---\nbody", &config);
        let result = registry.resolve("year", &r, &context(&config)).unwrap();
        assert!(matches!(
            result,
            Err(PlaceholderError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_invalid_date_is_error_even_with_dated_filename() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource(
            "_posts/2020-01-01-a.md",
            "---\ndate: not-a-date\n---\nbody",
            &config,
        );
        let result = registry.resolve("year", &r, &context(&config)).unwrap();
        assert!(matches!(
            result,
            Err(PlaceholderError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_locale_omitted_for_default() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/a.md", "body", &config);
        let value = registry
            .resolve("locale", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_locale_included_when_prefixed() {
        let mut config = SiteConfig::default();
        config.prefix_default_locale = true;
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/a.md", "body", &config);
        let value = registry
            .resolve("locale", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(value, PlaceholderValue::one("en"));
    }

    #[test]
    fn test_path_strips_collection_dir() {
        let config = SiteConfig::default();
        let registry = PlaceholderRegistry::with_defaults();
        let r = resource("_posts/guides/intro.md", "body", &config);
        let value = registry
            .resolve("path", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(value, PlaceholderValue::one("guides/intro"));
    }

    #[test]
    fn test_custom_handler_registration() {
        let config = SiteConfig::default();
        let mut registry = PlaceholderRegistry::with_defaults();
        registry.register("upcase_slug", |r, _| {
            Ok(PlaceholderValue::one(r.slug().to_uppercase()))
        });
        assert!(registry.contains("upcase_slug"));
        assert!(!registry.contains("downcase_slug"));
        let r = resource("_posts/hello.md", "body", &config);
        let value = registry
            .resolve("upcase_slug", &r, &context(&config))
            .unwrap()
            .unwrap();
        assert_eq!(value, PlaceholderValue::one("HELLO"));
    }
}
