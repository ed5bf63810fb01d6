//! Configuration loading from files.

use std::path::Path;

use super::{ConfigError, SiteConfig};

impl SiteConfig {
    /// Load the config from the command line argument, defaulting to `quire.yaml`.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_file.unwrap_or(Path::new("quire.yaml"));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()?.join(config_file)
        } else {
            config_file.to_path_buf()
        };

        Self::load_from_file(&config_file)
    }

    /// Load the config from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quire.yaml");
        std::fs::write(
            &path,
            "title: Example\ncollections:\n  - name: posts\n    permalink: pretty\n",
        )
        .unwrap();

        let config = SiteConfig::load_from_file(&path).unwrap();
        assert_eq!(config.title, Some("Example".to_string()));
        assert_eq!(config.collections.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SiteConfig::load_from_file(Path::new("/nonexistent/quire.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
