//! The site: owner of collections, layouts, and registries.
//!
//! Setup is two-phase: registries are populated first (converters,
//! placeholders, hooks), then the read phase fills collections and the
//! layout arena. After that everything except per-resource content is
//! read-only for the rest of the build.

use std::path::{Path, PathBuf};

use crate::config::{PathFilters, SiteConfig};

use super::collections::Collection;
use super::converters::ConverterRegistry;
use super::hooks::HookRegistry;
use super::layouts::{Layout, LayoutMap};
use super::placeholders::PlaceholderRegistry;
use super::resource::Resource;
use super::taxonomy::TaxonomyIndex;

// =============================================================================
// Source reading
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("source path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File-system access used by the read phase. The core never walks paths
/// on its own beyond calling this collaborator.
pub trait SourceReader {
    /// Raw bytes of one file. Whether those bytes are text is decided by
    /// the read phase, not the reader.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, SourceError>;

    /// All files under a directory, recursively, as paths relative to it.
    /// A missing directory yields an empty list (collections are allowed
    /// to be absent).
    fn enumerate(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError>;
}

/// The default reader backed by std::fs.
pub struct FsReader;

impl SourceReader for FsReader {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, SourceError> {
        std::fs::read(path).map_err(|source| SourceError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
    }

    fn enumerate(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        enumerate_into(dir, dir, &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn enumerate_into(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|source| SourceError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| SourceError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            enumerate_into(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

// =============================================================================
// Site
// =============================================================================

/// A resource that failed its read phase; kept for the build report.
#[derive(Debug, Clone)]
pub struct ReadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// A non-text source file. It skips the pipeline entirely and is copied
/// to the output byte for byte.
#[derive(Debug, Clone)]
pub struct StaticFile {
    /// Path relative to the source root, collection directory included.
    pub relative_path: PathBuf,
    pub bytes: Vec<u8>,
}

impl StaticFile {
    /// Output location: the source-relative path with the collection
    /// directory's underscore prefix dropped, so `_posts/logo.png`
    /// lands at `posts/logo.png`.
    pub fn output_relative(&self) -> PathBuf {
        let mut components = self.relative_path.components();
        match components.next() {
            Some(std::path::Component::Normal(first)) => {
                let first = first.to_string_lossy();
                let stripped = first.strip_prefix('_').unwrap_or(first.as_ref());
                Path::new(stripped).join(components.as_path())
            }
            _ => self.relative_path.clone(),
        }
    }
}

pub struct Site {
    pub config: SiteConfig,
    pub filters: PathFilters,
    pub collections: Vec<Collection>,
    pub statics: Vec<StaticFile>,
    pub layouts: LayoutMap,
    pub converters: ConverterRegistry,
    pub placeholders: PlaceholderRegistry,
    pub hooks: HookRegistry,
    pub taxonomy: TaxonomyIndex,
}

impl Site {
    /// Create a site with default registries. Configuration must already
    /// be validated; `filters` is the result of that validation.
    pub fn new(config: SiteConfig, filters: PathFilters) -> Self {
        let collections = config
            .collections
            .iter()
            .cloned()
            .map(Collection::new)
            .collect();
        Self {
            config,
            filters,
            collections,
            statics: Vec::new(),
            layouts: LayoutMap::new(),
            converters: ConverterRegistry::with_defaults(),
            placeholders: PlaceholderRegistry::with_defaults(),
            hooks: HookRegistry::new(),
            taxonomy: TaxonomyIndex::new(),
        }
    }

    pub fn collection(&self, label: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.label == label)
    }

    /// The read phase: load layouts, populate collections, sort each one,
    /// and index taxonomies.
    ///
    /// In strict mode a malformed resource aborts the read with its
    /// error. Otherwise the resource is kept as a failed placeholder (so
    /// sibling ordering is stable), logged, and reported.
    ///
    /// Files whose bytes are not valid UTF-8 are never resources: they
    /// become [`StaticFile`]s and pass through to the output untouched.
    pub fn read(
        &mut self,
        reader: &dyn SourceReader,
        source_root: &Path,
    ) -> Result<Vec<ReadFailure>, SourceError> {
        self.read_layouts(reader, source_root)?;

        let mut failures = Vec::new();
        for collection in &mut self.collections {
            let dir = source_root.join(collection.config.directory());
            for relative in reader.enumerate(&dir)? {
                let collection_relative = PathBuf::from(collection.config.directory()).join(&relative);
                if is_excluded(&collection_relative, &self.filters) {
                    continue;
                }

                let bytes = reader.read_bytes(&dir.join(&relative))?;
                let raw = match String::from_utf8(bytes) {
                    Ok(raw) => raw,
                    Err(err) => {
                        self.statics.push(StaticFile {
                            relative_path: collection_relative,
                            bytes: err.into_bytes(),
                        });
                        continue;
                    }
                };
                match Resource::from_raw(
                    collection_relative.clone(),
                    &collection.label,
                    &raw,
                    &collection.config.defaults,
                    &self.config,
                ) {
                    Ok(resource) => collection.push(resource),
                    Err(err) => {
                        let failure = ReadFailure {
                            path: collection_relative.clone(),
                            message: err.to_string(),
                        };
                        tracing::warn!(
                            path = %failure.path.display(),
                            error = %failure.message,
                            "skipping resource with unreadable front matter"
                        );
                        collection.push(Resource::failed(
                            collection_relative,
                            &collection.label,
                            &self.config,
                            failure.message.clone(),
                        ));
                        failures.push(failure);
                    }
                }
            }
            collection.sort();
        }

        for collection in &self.collections {
            for resource in &collection.resources {
                self.taxonomy.index_resource(resource);
            }
        }

        Ok(failures)
    }

    fn read_layouts(
        &mut self,
        reader: &dyn SourceReader,
        source_root: &Path,
    ) -> Result<(), SourceError> {
        let dir = source_root.join("_layouts");
        for relative in reader.enumerate(&dir)? {
            let Some(label) = relative.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = reader.read_bytes(&dir.join(&relative))?;
            let Ok(raw) = String::from_utf8(bytes) else {
                tracing::warn!(layout = label, "skipping non-text file in layout directory");
                continue;
            };
            match Layout::from_raw(label, PathBuf::from("_layouts").join(&relative), &raw) {
                Ok(layout) => self.layouts.insert(layout),
                Err(err) => {
                    tracing::warn!(
                        layout = label,
                        error = %err,
                        "skipping layout with unreadable front matter"
                    );
                }
            }
        }
        Ok(())
    }
}

fn is_excluded(path: &Path, filters: &PathFilters) -> bool {
    if filters.include.iter().any(|inc| matches_filter(path, inc)) {
        return false;
    }
    filters.exclude.iter().any(|exc| matches_filter(path, exc))
}

/// A filter matches whole path components, never substrings of them:
/// `drafts` hits `_posts/drafts/a.md` but not `_posts/my-drafts-note.md`.
/// Multi-component filters (`drafts/wip.md`) match a consecutive run.
fn matches_filter(path: &Path, filter: &str) -> bool {
    let wanted: Vec<_> = Path::new(filter).components().collect();
    if wanted.is_empty() {
        return false;
    }
    let parts: Vec<_> = path.components().collect();
    parts.windows(wanted.len()).any(|window| window == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn site_with_posts() -> Site {
        let mut config = SiteConfig::default();
        config.collections.push(CollectionConfig::named("posts"));
        let filters = config.validate().unwrap();
        Site::new(config, filters)
    }

    #[test]
    fn test_read_populates_collections_and_layouts() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "_posts/2020-01-01-a.md", "---\ntitle: A\n---\nbody");
        write(tmp.path(), "_posts/2020-01-02-b.md", "---\ntitle: B\n---\nbody");
        write(tmp.path(), "_layouts/default.html", "<main>{{ content }}</main>");

        let mut site = site_with_posts();
        let failures = site.read(&FsReader, tmp.path()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(site.collection("posts").unwrap().len(), 2);
        assert_eq!(site.layouts.len(), 1);
    }

    #[test]
    fn test_read_keeps_failed_resource_as_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "_posts/good.md", "---\ntitle: ok\n---\nbody");
        write(tmp.path(), "_posts/bad.md", "---\ntitle: [unclosed\n---\nbody");

        let mut site = site_with_posts();
        let failures = site.read(&FsReader, tmp.path()).unwrap();
        assert_eq!(failures.len(), 1);

        let posts = site.collection("posts").unwrap();
        assert_eq!(posts.len(), 2);
        let bad = posts
            .resources
            .iter()
            .find(|r| r.relative_path.ends_with("bad.md"))
            .unwrap();
        assert!(bad.read_error.is_some());
    }

    #[test]
    fn test_missing_collection_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut site = site_with_posts();
        let failures = site.read(&FsReader, tmp.path()).unwrap();
        assert!(failures.is_empty());
        assert!(site.collection("posts").unwrap().is_empty());
    }

    #[test]
    fn test_exclude_filter_skips_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "_posts/keep.md", "body");
        write(tmp.path(), "_posts/drafts/skip.md", "body");

        let mut config = SiteConfig::default();
        config.collections.push(CollectionConfig::named("posts"));
        config.exclude = Some(serde_yaml::from_str("[drafts]").unwrap());
        let filters = config.validate().unwrap();
        let mut site = Site::new(config, filters);

        site.read(&FsReader, tmp.path()).unwrap();
        assert_eq!(site.collection("posts").unwrap().len(), 1);
    }

    #[test]
    fn test_exclude_matches_components_not_substrings() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "_posts/my-drafts-note.md", "body");
        write(tmp.path(), "_posts/drafts/skip.md", "body");

        let mut config = SiteConfig::default();
        config.collections.push(CollectionConfig::named("posts"));
        config.exclude = Some(serde_yaml::from_str("[drafts]").unwrap());
        let filters = config.validate().unwrap();
        let mut site = Site::new(config, filters);

        site.read(&FsReader, tmp.path()).unwrap();
        let posts = site.collection("posts").unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts.resources[0].relative_path.ends_with("my-drafts-note.md"));
    }

    #[test]
    fn test_non_utf8_file_becomes_static_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "_posts/2020-01-01-a.md", "---\ntitle: A\n---\nbody");
        let image = tmp.path().join("_posts/pixel.png");
        std::fs::write(&image, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A]).unwrap();

        let mut site = site_with_posts();
        let failures = site.read(&FsReader, tmp.path()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(site.collection("posts").unwrap().len(), 1);
        assert_eq!(site.statics.len(), 1);
        assert_eq!(
            site.statics[0].output_relative(),
            PathBuf::from("posts/pixel.png")
        );
    }

    #[test]
    fn test_taxonomy_indexed_during_read() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "_posts/a.md",
            "---\ntags: [rust]\n---\nbody",
        );

        let mut site = site_with_posts();
        site.read(&FsReader, tmp.path()).unwrap();
        assert_eq!(site.taxonomy.resources_for("tag", "rust").len(), 1);
    }
}
