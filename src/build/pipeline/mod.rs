//! The resource transformation pipeline.
//!
//! Each resource moves through a fixed sequence of steps:
//! 1. Pre-render hooks fire
//! 2. Template constructs in the body are rendered (Tera)
//! 3. The converter chain runs (markdown -> HTML etc.)
//! 4. The layout chain wraps the converted content
//! 5. Post-render hooks fire
//!
//! Steps map onto the resource's state machine: `Unprocessed ->
//! ContentRendered -> MarkupConverted -> LayoutApplied -> Written`.
//! Re-running a completed resource resets it first (live reload).
//!
//! Every failure is returned as a typed error for the caller to
//! aggregate; one resource's failure never touches its siblings.

mod context;
mod error;

pub use context::PipelineContext;
pub use error::PipelineError;

use super::hooks::HookEvent;
use super::layouts::Layout;
use super::render::{has_template_constructs, PageBindings};
use super::resource::{ConversionStep, Resource, TransformState};

/// Hook owner name for resource lifecycle events.
const RESOURCES_OWNER: &str = "resources";

/// Executes the transformation pipeline for single resources.
pub struct Transformer;

impl Transformer {
    /// Run the full pipeline on one resource.
    ///
    /// On success the resource's `output` is populated and its state is
    /// `LayoutApplied`; the writer advances it to `Written`. On error the
    /// resource is left with `output == None` and no partial output is
    /// ever attributed to it.
    pub fn transform(
        resource: &mut Resource,
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        if let Some(message) = &resource.read_error {
            return Err(PipelineError::FrontMatter {
                path: resource.relative_path.display().to_string(),
                message: message.clone(),
            });
        }

        if resource.state != TransformState::Unprocessed {
            resource.reset();
        }

        ctx.hooks.trigger(RESOURCES_OWNER, HookEvent::PreRender, resource);

        // Destination first: templates see `page.url`, and permalink
        // failures should surface before any rendering work happens.
        let destination = ctx
            .permalink_engine()
            .destination(resource, ctx.output_root)?;

        let is_asset = !ctx.converters.converts(resource);

        if !is_asset && has_template_constructs(&resource.content) {
            Self::render_templates(resource, Some(&destination.relative_url), ctx)?;
        }
        resource.state = TransformState::ContentRendered;

        Self::run_converter_chain(resource, ctx)?;
        resource.state = TransformState::MarkupConverted;

        if !is_asset && resource.layout() != Some("none") {
            if let Some(label) = resource.layout().map(str::to_string) {
                Self::apply_layouts(resource, &label, &destination.relative_url, ctx)?;
            }
        }
        resource.state = TransformState::LayoutApplied;

        ctx.hooks.trigger(RESOURCES_OWNER, HookEvent::PostRender, resource);

        // Output bytes are final only now, after post-render hooks.
        resource.output = Some(resource.content.clone());
        Ok(())
    }

    /// Step 2: Tera over the resource body, with the pipeline owning
    /// which bindings are visible.
    fn render_templates(
        resource: &mut Resource,
        url: Option<&str>,
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        let mut template_ctx = tera::Context::new();
        template_ctx.insert("site", &ctx.site_bindings());
        template_ctx.insert("page", &page_bindings(resource, url));

        let rendered = ctx
            .renderer
            .render_content(&resource.content, &template_ctx)
            .map_err(|source| PipelineError::TemplateRender {
                path: resource.relative_path.display().to_string(),
                source,
            })?;
        resource.content = rendered;
        Ok(())
    }

    /// Step 3: run every matching converter in order, each one's output
    /// feeding the next one's input. Steps are logged for diagnostics.
    fn run_converter_chain(
        resource: &mut Resource,
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        let extension = resource.extension();
        let chain = ctx.converters.matching_converters(&extension, resource);

        let mut current_ext = extension;
        let mut content = std::mem::take(&mut resource.content);
        let mut steps = Vec::new();

        for converter in chain {
            match converter.convert(&content, resource) {
                Ok(converted) => {
                    let output_ext = converter.output_ext(&current_ext);
                    steps.push(ConversionStep {
                        stage: converter.name().to_string(),
                        input_ext: current_ext.clone(),
                        output_ext: output_ext.clone(),
                    });
                    content = converted;
                    current_ext = output_ext;
                }
                Err(err) => {
                    // Restore the pre-chain content so no partial output
                    // sticks to the resource.
                    resource.content = resource.untransformed_content.clone();
                    tracing::error!(
                        converter = converter.name(),
                        path = %resource.relative_path.display(),
                        error = %err,
                        "conversion failed"
                    );
                    return Err(err.into());
                }
            }
        }

        resource.content = content;
        resource.steps.extend(steps);
        Ok(())
    }

    /// Step 4: wrap content in the resolved layout chain, innermost
    /// first. The chain itself is cycle-guarded by the layout resolver.
    fn apply_layouts(
        resource: &mut Resource,
        starting_label: &str,
        url: &str,
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        let chain: Vec<Layout> = ctx
            .layouts
            .resolve_chain(starting_label)
            .into_iter()
            .cloned()
            .collect();

        for layout in chain {
            let mut template_ctx = tera::Context::new();
            template_ctx.insert("site", &ctx.site_bindings());
            template_ctx.insert("page", &page_bindings(resource, Some(url)));
            template_ctx.insert("layout", layout.data.mapping());
            template_ctx.insert("content", &resource.content);

            let mut rendered = if has_template_constructs(&layout.content) {
                ctx.renderer
                    .render_content(&layout.content, &template_ctx)
                    .map_err(|source| PipelineError::TemplateRender {
                        path: layout.relative_path.display().to_string(),
                        source,
                    })?
            } else {
                layout.content.clone()
            };

            // A layout written in a convertible markup (e.g. a .md
            // layout) goes through the converter chain itself.
            let layout_ext = layout.extension();
            for converter in ctx.converters.matching_converters(&layout_ext, resource) {
                if converter.is_passthrough() {
                    continue;
                }
                rendered = converter.convert(&rendered, resource)?;
            }

            resource.content = rendered;
        }

        Ok(())
    }
}

fn page_bindings(resource: &Resource, url: Option<&str>) -> PageBindings {
    PageBindings {
        title: resource.title(),
        url: url.map(str::to_string),
        slug: resource.slug(),
        locale: resource.locale.clone(),
        collection: resource.collection.clone(),
        data: resource.data.mapping().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::converters::ConverterRegistry;
    use crate::build::hooks::HookRegistry;
    use crate::build::layouts::{Layout, LayoutMap};
    use crate::build::placeholders::PlaceholderRegistry;
    use crate::build::render::Renderer;
    use crate::config::{CollectionConfig, SiteConfig};
    use serde_yaml::Mapping;
    use std::path::{Path, PathBuf};

    struct Fixture {
        config: SiteConfig,
        layouts: LayoutMap,
        converters: ConverterRegistry,
        placeholders: PlaceholderRegistry,
        hooks: HookRegistry,
        renderer: Renderer,
    }

    impl Fixture {
        fn new() -> Self {
            let mut config = SiteConfig::default();
            let mut posts = CollectionConfig::named("posts");
            posts.permalink = Some("pretty".to_string());
            config.collections.push(posts);

            Self {
                config,
                layouts: LayoutMap::new(),
                converters: ConverterRegistry::with_defaults(),
                placeholders: PlaceholderRegistry::with_defaults(),
                hooks: HookRegistry::new(),
                renderer: Renderer::new(),
            }
        }

        fn ctx(&mut self) -> PipelineContext<'_> {
            PipelineContext {
                config: &self.config,
                layouts: &self.layouts,
                converters: &self.converters,
                placeholders: &self.placeholders,
                hooks: &self.hooks,
                renderer: &mut self.renderer,
                output_root: Path::new("/out"),
                build_time: chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            }
        }
    }

    fn resource(path: &str, raw: &str, config: &SiteConfig) -> Resource {
        Resource::from_raw(PathBuf::from(path), "posts", raw, &Mapping::new(), config).unwrap()
    }

    #[test]
    fn test_full_pipeline_markdown() {
        let mut fixture = Fixture::new();
        let mut r = resource(
            "_posts/2020-01-01-hello.md",
            "---\ntitle: Hello\n---\n# Title\n\nText",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();

        let output = r.output.as_deref().unwrap();
        assert!(output.contains("<h1>Title</h1>"));
        assert!(output.contains("<p>Text</p>"));
        assert_eq!(r.state, TransformState::LayoutApplied);
    }

    #[test]
    fn test_template_constructs_rendered() {
        let mut fixture = Fixture::new();
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "---\ntitle: Greetings\n---\nSay {{ page.title }}",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        assert!(r.output.as_deref().unwrap().contains("Say Greetings"));
    }

    #[test]
    fn test_layout_wraps_content() {
        let mut fixture = Fixture::new();
        fixture.layouts.insert(
            Layout::from_raw(
                "default",
                PathBuf::from("_layouts/default.html"),
                "<main>{{ content }}</main>",
            )
            .unwrap(),
        );
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "---\nlayout: default\n---\nbody text",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        let output = r.output.as_deref().unwrap();
        assert!(output.starts_with("<main>"));
        assert!(output.contains("body text"));
    }

    #[test]
    fn test_layout_inheritance_applied_inside_out() {
        let mut fixture = Fixture::new();
        fixture.layouts.insert(
            Layout::from_raw(
                "base",
                PathBuf::from("_layouts/base.html"),
                "<html>{{ content }}</html>",
            )
            .unwrap(),
        );
        fixture.layouts.insert(
            Layout::from_raw(
                "post",
                PathBuf::from("_layouts/post.html"),
                "---\nlayout: base\n---\n<article>{{ content }}</article>",
            )
            .unwrap(),
        );
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "---\nlayout: post\n---\nwords",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        let output = r.output.as_deref().unwrap();
        assert!(output.starts_with("<html><article>"));
    }

    #[test]
    fn test_layout_none_skips_layouts() {
        let mut fixture = Fixture::new();
        fixture.layouts.insert(
            Layout::from_raw(
                "default",
                PathBuf::from("_layouts/default.html"),
                "<main>{{ content }}</main>",
            )
            .unwrap(),
        );
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "---\nlayout: none\n---\nbare",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        assert!(!r.output.as_deref().unwrap().contains("<main>"));
    }

    #[test]
    fn test_asset_passthrough_untouched() {
        let mut fixture = Fixture::new();
        let mut r = resource(
            "_posts/style.css",
            "body { color: red; }",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        assert_eq!(r.output.as_deref().unwrap(), "body { color: red; }");
    }

    #[test]
    fn test_hooks_fire_around_render() {
        let mut fixture = Fixture::new();
        fixture.hooks.register("resources", HookEvent::PreRender, 0, |r| {
            r.content = format!("pre|{}", r.content);
        });
        fixture.hooks.register("resources", HookEvent::PostRender, 0, |r| {
            r.content.push_str("|post");
        });
        let mut r = resource("_posts/2020-01-01-hi.md", "mid", &fixture.config);
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        let output = r.output.as_deref().unwrap();
        assert!(output.contains("pre|"));
        assert!(output.ends_with("|post"));
    }

    #[test]
    fn test_pre_render_hook_can_set_front_matter_data() {
        let mut fixture = Fixture::new();
        fixture.hooks.register("resources", HookEvent::PreRender, 0, |r| {
            r.data.set("badge", "featured".into());
        });
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "Badge: {{ page.data.badge }}",
            &fixture.config,
        );
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        assert!(r.output.as_deref().unwrap().contains("Badge: featured"));
    }

    #[test]
    fn test_read_error_fails_pipeline() {
        let mut fixture = Fixture::new();
        let mut r = Resource::failed(
            PathBuf::from("_posts/broken.md"),
            "posts",
            &fixture.config,
            "bad yaml".to_string(),
        );
        let err = Transformer::transform(&mut r, &mut fixture.ctx()).unwrap_err();
        assert!(matches!(err, PipelineError::FrontMatter { .. }));
        assert!(r.output.is_none());
    }

    #[test]
    fn test_template_error_leaves_no_output() {
        let mut fixture = Fixture::new();
        let mut r = resource(
            "_posts/2020-01-01-hi.md",
            "{{ page.title | bogusfilter }}",
            &fixture.config,
        );
        let err = Transformer::transform(&mut r, &mut fixture.ctx()).unwrap_err();
        assert!(matches!(err, PipelineError::TemplateRender { .. }));
        assert!(r.output.is_none());
    }

    #[test]
    fn test_rerun_resets_and_reproduces_output() {
        let mut fixture = Fixture::new();
        let mut r = resource("_posts/2020-01-01-hi.md", "# Once", &fixture.config);
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        let first = r.output.clone();
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        assert_eq!(first, r.output);
    }

    #[test]
    fn test_conversion_steps_logged() {
        let mut fixture = Fixture::new();
        let mut r = resource("_posts/2020-01-01-hi.md", "# Hi", &fixture.config);
        Transformer::transform(&mut r, &mut fixture.ctx()).unwrap();
        let stages: Vec<_> = r.steps.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, vec!["markdown", "identity"]);
        assert_eq!(r.steps[0].input_ext, ".md");
        assert_eq!(r.steps[0].output_ext, ".html");
    }
}
