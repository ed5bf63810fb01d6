//! Build orchestration: read, transform, write.

use std::path::PathBuf;

use crate::config::{ConfigError, SiteConfig};

use super::output::{OutputError, OutputWriter, WriteOutcome};
use super::pipeline::{PipelineContext, PipelineError, Transformer};
use super::render::Renderer;
use super::report::BuildReport;
use super::site::{FsReader, Site, SourceError, SourceReader};

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

pub struct BuildResult {
    pub output_dir: PathBuf,
    pub report: BuildReport,
}

pub struct Builder {
    config: SiteConfig,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
}

impl Builder {
    pub fn new(config: SiteConfig, base_path: PathBuf) -> Self {
        Self { config, base_path }
    }

    pub fn build(&self) -> Result<BuildResult, BuildError> {
        self.build_with(&FsReader)
    }

    /// Build pipeline:
    /// 1. Validate configuration
    /// 2. Read layouts and collections into the site
    /// 3. Transform every resource (permalink, templates, converters, layouts)
    /// 4. Write outputs
    pub fn build_with(&self, reader: &dyn SourceReader) -> Result<BuildResult, BuildError> {
        let filters = self.config.validate()?;
        let source_root = self.base_path.join(&self.config.source);
        let output_root = self.base_path.join(&self.config.output);

        // Step 2: read phase
        let mut site = Site::new(self.config.clone(), filters);
        let read_failures = site.read(reader, &source_root)?;
        if self.config.strict {
            if let Some(failure) = read_failures.first() {
                return Err(PipelineError::FrontMatter {
                    path: failure.path.display().to_string(),
                    message: failure.message.clone(),
                }
                .into());
            }
        }

        let total: usize = site.collections.iter().map(|c| c.len()).sum();
        println!(
            "Read {} resource(s) and {} static file(s) across {} collection(s), {} layout(s)",
            total,
            site.statics.len(),
            site.collections.len(),
            site.layouts.len()
        );

        let mut report = BuildReport::new();
        for failure in &read_failures {
            report.record_failure(failure.path.clone(), "read", failure.message.clone());
        }

        // Step 3: transform phase
        let mut renderer = Renderer::new();
        let build_time = chrono::Local::now().naive_local();
        for collection in &mut site.collections {
            for resource in &mut collection.resources {
                if resource.read_error.is_some() {
                    continue;
                }
                let mut ctx = PipelineContext {
                    config: &site.config,
                    layouts: &site.layouts,
                    converters: &site.converters,
                    placeholders: &site.placeholders,
                    hooks: &site.hooks,
                    renderer: &mut renderer,
                    output_root: &output_root,
                    build_time,
                };
                match Transformer::transform(resource, &mut ctx) {
                    Ok(()) => report.transformed += 1,
                    Err(err) if site.config.strict => return Err(err.into()),
                    Err(err) => {
                        tracing::error!(
                            path = %resource.relative_path.display(),
                            stage = err.stage(),
                            error = %err,
                            "resource failed to transform"
                        );
                        report.record_failure(
                            resource.relative_path.clone(),
                            err.stage(),
                            err.to_string(),
                        );
                    }
                }
            }
        }

        // Step 4: write phase
        let writer = OutputWriter::new(&output_root);
        for collection in &mut site.collections {
            if !collection.config.output {
                continue;
            }
            for resource in &mut collection.resources {
                match writer.write(resource)? {
                    WriteOutcome::Written => report.written += 1,
                    WriteOutcome::Unchanged => report.unchanged += 1,
                    WriteOutcome::Skipped => {}
                }
            }
        }
        for file in &site.statics {
            match writer.write_static(file)? {
                WriteOutcome::Written => report.written += 1,
                WriteOutcome::Unchanged => report.unchanged += 1,
                WriteOutcome::Skipped => {}
            }
        }

        println!("Build complete: {}", report.summary());
        Ok(BuildResult {
            output_dir: output_root,
            report,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.config.output)
    }
}
