//! Build outcome accounting.

use std::path::PathBuf;

/// One resource that failed a pipeline stage.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    pub path: PathBuf,
    pub stage: String,
    pub message: String,
}

/// Counts and failures accumulated over one build. In non-strict mode
/// failures are collected here and reported at the end; in strict mode the
/// first failure aborts instead.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub transformed: usize,
    pub written: usize,
    pub unchanged: usize,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, path: PathBuf, stage: impl Into<String>, message: impl Into<String>) {
        self.failures.push(BuildFailure {
            path,
            stage: stage.into(),
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// One-line summary for the end of a build.
    pub fn summary(&self) -> String {
        format!(
            "{} transformed, {} written, {} unchanged, {} failed",
            self.transformed,
            self.written,
            self.unchanged,
            self.failures.len()
        )
    }
}
