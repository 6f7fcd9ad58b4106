//! The engine facade: one resolver and one renderer behind a single handle.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::TemplateResult;
use crate::loader::{DocumentSource, FsSource};
use crate::resolver::{AvailableTemplate, EffectiveTemplate, ResolverStats, TemplateResolver};
use crate::templating::{RenderContext, RenderOutput, TemplateRenderer};

/// Resolves and renders templates from one library.
///
/// Caches live as long as the engine. Create one engine per library and pass
/// it by reference; call [`TemplateEngine::clear_caches`] after the library
/// changes on disk.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tplforge::engine::TemplateEngine;
/// use tplforge::loader::MemorySource;
/// use tplforge::templating::RenderContext;
///
/// # async fn example() -> anyhow::Result<()> {
/// let source = MemorySource::new()
///     .with_document("platforms/jira/ticket.yaml", "content: \"Build {{ design.component_name }}\"\n");
/// let mut engine = TemplateEngine::with_source(source, Default::default());
///
/// let context = RenderContext::new().with("design", json!({ "component_name": "Button" }));
/// let output = engine.generate("jira", "ticket", "react", &context).await;
/// assert_eq!(output.as_text(), Some("Build Button"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TemplateEngine<S = FsSource> {
    resolver: TemplateResolver<S>,
    renderer: TemplateRenderer,
}

impl TemplateEngine<FsSource> {
    /// Engine reading templates from `config.template_root`.
    pub fn new(config: EngineConfig) -> Self {
        let source = FsSource::new(config.template_root.clone());
        Self::with_source(source, config)
    }

    /// Engine configured from the environment and config file.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing config file cannot be read or is invalid.
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = EngineConfig::load().await?;
        tracing::debug!("Template root: {}", config.template_root.display());
        Ok(Self::new(config))
    }
}

impl<S: DocumentSource> TemplateEngine<S> {
    pub fn with_source(source: S, config: EngineConfig) -> Self {
        let renderer = TemplateRenderer::new(config.literal_blocks);
        Self {
            resolver: TemplateResolver::new(source, config),
            renderer,
        }
    }

    /// See [`TemplateResolver::resolve`].
    pub async fn resolve(&mut self, platform: &str, document_type: &str, tech_stack: &str) -> Arc<EffectiveTemplate> {
        self.resolver.resolve(platform, document_type, tech_stack).await
    }

    /// See [`TemplateRenderer::render`].
    #[must_use]
    pub fn render(&self, effective: &EffectiveTemplate, context: &RenderContext) -> RenderOutput {
        self.renderer.render(effective, context)
    }

    /// Resolve and render in one call.
    pub async fn generate(
        &mut self,
        platform: &str,
        document_type: &str,
        tech_stack: &str,
        context: &RenderContext,
    ) -> RenderOutput {
        let effective = self.resolve(platform, document_type, tech_stack).await;
        for warning in &effective.metadata.warnings {
            tracing::debug!("{}", warning);
        }
        self.render(&effective, context)
    }

    /// See [`TemplateResolver::list_available`].
    ///
    /// # Errors
    ///
    /// Returns an error when the template source cannot be listed.
    pub async fn list_available(&self) -> TemplateResult<Vec<AvailableTemplate>> {
        self.resolver.list_available().await
    }

    pub fn clear_caches(&mut self) {
        let stats = self.resolver.stats();
        tracing::debug!(
            "Dropping {} cached templates ({:.1}% hit rate) and {} documents",
            stats.templates.entries,
            stats.templates.hit_rate(),
            stats.documents.entries
        );
        self.resolver.clear_caches();
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        self.resolver.stats()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.resolver.config()
    }

    #[must_use]
    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }
}
