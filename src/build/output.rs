//! Writing transformed resources to the output directory.

use std::path::{Path, PathBuf};

use super::resource::{Resource, TransformState};
use super::site::StaticFile;

#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("destination {path} escapes the output directory")]
    EscapesRoot { path: PathBuf },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of writing one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The file on disk already had identical content.
    Unchanged,
    /// The resource produced no output (failed read or failed transform).
    Skipped,
}

/// Writes rendered output under `output_root`, creating parent directories
/// as needed. Files whose on-disk content already matches are left alone so
/// their mtimes survive incremental deploys.
pub struct OutputWriter {
    output_root: PathBuf,
}

impl OutputWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn write(&self, resource: &mut Resource) -> Result<WriteOutcome, OutputError> {
        let Some(output) = resource.output.as_deref() else {
            return Ok(WriteOutcome::Skipped);
        };
        let Some(destination) = resource.destination.as_ref() else {
            return Ok(WriteOutcome::Skipped);
        };

        let path = destination.output_path.clone();
        if !path.starts_with(&self.output_root) || path_escapes(&path, &self.output_root) {
            return Err(OutputError::EscapesRoot { path });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if let Ok(existing) = std::fs::read_to_string(&path) {
            if existing == output {
                resource.state = TransformState::Written;
                return Ok(WriteOutcome::Unchanged);
            }
        }

        std::fs::write(&path, output).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;
        resource.state = TransformState::Written;
        Ok(WriteOutcome::Written)
    }

    /// Copy a static file's bytes under the output root. Same skip rules
    /// as [`write`](Self::write): unchanged bytes are left alone.
    pub fn write_static(&self, file: &StaticFile) -> Result<WriteOutcome, OutputError> {
        let path = self.output_root.join(file.output_relative());
        if path_escapes(&path, &self.output_root) {
            return Err(OutputError::EscapesRoot { path });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if let Ok(existing) = std::fs::read(&path) {
            if existing == file.bytes {
                return Ok(WriteOutcome::Unchanged);
            }
        }

        std::fs::write(&path, &file.bytes).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(WriteOutcome::Written)
    }
}

/// True when `..` components would let the joined path climb out of root.
fn path_escapes(path: &Path, root: &Path) -> bool {
    use std::path::Component;
    let mut depth: i64 = 0;
    for component in path.strip_prefix(root).unwrap_or(path).components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}
