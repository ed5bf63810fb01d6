//! Site configuration: types, loading, and validation.
//!
//! Configuration is read-only input to the build. Validation failures are
//! always fatal for the whole build - they are never scoped to a single
//! resource the way pipeline errors are.

mod load;
mod types;

pub use types::{
    permalink_styles, CollectionConfig, PathFilters, RelationKind, RelationsConfig, SiteConfig,
    SortDirection,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Invalid site-wide configuration. Always aborts the build.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl SiteConfig {
    /// Validate site-wide invariants that serde cannot express.
    ///
    /// Returns the materialized `exclude`/`include` filters on success.
    pub fn validate(&self) -> Result<PathFilters, ConfigError> {
        let exclude = validate_string_list("exclude", self.exclude.as_ref())?;
        let include = validate_string_list("include", self.include.as_ref())?;

        if !self.available_locales.contains(&self.default_locale) {
            return Err(ConfigError::Validation(format!(
                "default_locale '{}' is not in available_locales",
                self.default_locale
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for collection in &self.collections {
            if !seen.insert(collection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "collection '{}' is declared more than once",
                    collection.name
                )));
            }
        }

        for collection in &self.collections {
            for target in collection.relations.targets() {
                if self.collection(target).is_none() {
                    return Err(ConfigError::Validation(format!(
                        "collection '{}' declares a relation to unknown collection '{}'",
                        collection.name, target
                    )));
                }
            }
        }

        Ok(PathFilters { exclude, include })
    }
}

/// `exclude` and `include` must be sequences of strings when present.
fn validate_string_list(
    key: &str,
    value: Option<&serde_yaml::Value>,
) -> Result<Vec<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    let serde_yaml::Value::Sequence(items) = value else {
        return Err(ConfigError::Validation(format!(
            "'{key}' must be a list of paths"
        )));
    };

    items
        .iter()
        .map(|item| match item {
            serde_yaml::Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::Validation(format!(
                "'{key}' entries must be strings, got: {other:?}"
            ))),
        })
        .collect()
}
