mod builder;
mod collections;
mod converters;
mod hooks;
mod layouts;
mod output;
mod permalink;
pub mod pipeline;
mod placeholders;
mod render;
mod report;
mod resource;
pub mod site;
mod taxonomy;

pub use builder::{BuildError, BuildResult, Builder};
pub use collections::Collection;
pub use converters::{ConversionError, Converter, ConverterRegistry};
pub use hooks::{HookEvent, HookRegistry};
pub use layouts::{Layout, LayoutMap};
pub use output::{OutputError, OutputWriter, WriteOutcome};
pub use permalink::{Destination, PermalinkEngine, PermalinkError};
pub use placeholders::{PlaceholderContext, PlaceholderError, PlaceholderRegistry, PlaceholderValue};
pub use render::{RenderError, Renderer, SiteBindings};
pub use report::{BuildFailure, BuildReport};
pub use resource::{ConversionStep, FrontMatterError, Resource, ResourceData, TransformState};
pub use taxonomy::{ResourceKey, TaxonomyIndex, TaxonomyTerm};
