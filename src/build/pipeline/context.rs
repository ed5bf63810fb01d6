//! Pipeline context for sharing state across transform steps.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::build::converters::ConverterRegistry;
use crate::build::hooks::HookRegistry;
use crate::build::layouts::LayoutMap;
use crate::build::permalink::PermalinkEngine;
use crate::build::placeholders::PlaceholderRegistry;
use crate::build::render::{Renderer, SiteBindings};
use crate::config::SiteConfig;

/// Everything a resource transformation needs besides the resource itself.
///
/// The registries and the layout map are populated during setup and
/// read-only here; only the renderer needs mutable access (temporary
/// template registration).
pub struct PipelineContext<'a> {
    pub config: &'a SiteConfig,
    pub layouts: &'a LayoutMap,
    pub converters: &'a ConverterRegistry,
    pub placeholders: &'a PlaceholderRegistry,
    pub hooks: &'a HookRegistry,
    pub renderer: &'a mut Renderer,

    /// Directory output files are written beneath
    pub output_root: &'a Path,

    /// Build timestamp, the last-resort date for date placeholders.
    /// Fixed for the whole build so output is idempotent within a run.
    pub build_time: NaiveDateTime,
}

impl PipelineContext<'_> {
    /// A permalink engine borrowing this context's registries.
    pub fn permalink_engine(&self) -> PermalinkEngine<'_> {
        PermalinkEngine {
            config: self.config,
            placeholders: self.placeholders,
            converters: self.converters,
            build_time: self.build_time,
        }
    }

    /// Site-level template bindings.
    pub fn site_bindings(&self) -> SiteBindings {
        SiteBindings {
            title: self.config.title.clone(),
            url: self.config.url.clone(),
            base_path: self.config.base_path.clone(),
        }
    }
}
