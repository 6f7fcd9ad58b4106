//! Template resolution: `(platform, document_type, tech_stack)` → [`EffectiveTemplate`].
//!
//! The resolver walks a fixed fallback chain of candidate locations, keeps the
//! first candidate that parses and passes the structural check, merges its
//! inheritance chain beneath it and caches the result per [`ResolutionKey`].
//! When no candidate is usable a built-in document is synthesized, so
//! [`TemplateResolver::resolve`] always produces a template.
//!
//! # Candidate order
//!
//! ```text
//! platforms/<platform>/<document_type>.<ext>
//! tech-stacks/<tech_stack>/defaults.<ext>
//! tech-stacks/custom/defaults.<ext>
//! ```
//!
//! Missing and malformed candidates are skipped with a log line; structural
//! issues of the winner are reported as [`ValidationWarning`]s in the
//! resolution metadata.
//!
//! # Caching
//!
//! Parsed documents are cached by location inside the [`DocumentLoader`] and
//! effective templates by key inside the resolver. Neither cache expires;
//! [`TemplateResolver::clear_caches`] empties both.

pub mod candidates;
pub mod default;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use candidates::{AvailableTemplate, TemplateScope, candidate_locations};
pub use validation::{CandidateCheck, ValidationWarning, check_candidate};

use crate::cache::{CacheStats, StatCache};
use crate::config::EngineConfig;
use crate::constants::BUILT_IN_LOCATION;
use crate::core::TemplateResult;
use crate::loader::document::{CONTENT_KEY, TEMPLATE_KEY};
use crate::loader::{DocumentLoader, DocumentSource, TemplateDocument};
use crate::merge::merge_maps;
use crate::value::Map;

/// Normalized selection triple. Components are trimmed and lowercased.
///
/// Keys that differ only in case are the same key: they share one cache entry
/// and one set of candidate locations. Library directories and file names must
/// therefore be lowercase (`platforms/jira/ticket.yaml`, not
/// `platforms/Jira/Ticket.yaml`) to be found on case-sensitive filesystems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolutionKey {
    pub platform: String,
    pub document_type: String,
    pub tech_stack: String,
}

impl ResolutionKey {
    pub fn new(platform: &str, document_type: &str, tech_stack: &str) -> Self {
        Self {
            platform: normalize(platform),
            document_type: normalize(document_type),
            tech_stack: normalize(tech_stack),
        }
    }
}

fn normalize(component: &str) -> String {
    component.trim().to_lowercase()
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.platform, self.document_type, self.tech_stack)
    }
}

/// How an effective template was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionMetadata {
    pub key: ResolutionKey,
    /// Winning candidate location, or [`BUILT_IN_LOCATION`].
    pub location: String,
    pub synthesized: bool,
    /// Candidates tried, in order.
    pub candidates: Vec<String>,
    /// Base documents merged beneath the winner, nearest first.
    pub inherited: Vec<String>,
    pub warnings: Vec<ValidationWarning>,
    pub resolved_at: DateTime<Utc>,
}

/// A resolved, inheritance-merged template ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveTemplate {
    pub document: TemplateDocument,
    pub metadata: ResolutionMetadata,
}

impl EffectiveTemplate {
    #[must_use]
    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    #[must_use]
    pub fn metadata(&self) -> &ResolutionMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        self.metadata.synthesized
    }
}

/// Cache counters of both resolver caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub documents: CacheStats,
    pub templates: CacheStats,
}

/// Resolves selection triples against a template library.
#[derive(Debug)]
pub struct TemplateResolver<S> {
    config: EngineConfig,
    loader: DocumentLoader<S>,
    resolved: StatCache<ResolutionKey, Arc<EffectiveTemplate>>,
}

impl<S: DocumentSource> TemplateResolver<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            config,
            loader: DocumentLoader::new(source),
            resolved: StatCache::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a selection triple. Never fails: when nothing in the library is
    /// usable, the built-in default document is returned.
    pub async fn resolve(
        &mut self,
        platform: &str,
        document_type: &str,
        tech_stack: &str,
    ) -> Arc<EffectiveTemplate> {
        self.resolve_key(ResolutionKey::new(platform, document_type, tech_stack)).await
    }

    /// [`TemplateResolver::resolve`] for an already-built key.
    pub async fn resolve_key(&mut self, key: ResolutionKey) -> Arc<EffectiveTemplate> {
        if let Some(effective) = self.resolved.get(&key) {
            tracing::debug!("Resolution cache hit for {}", key);
            return Arc::clone(effective);
        }

        let candidates = candidate_locations(&key, &self.config);
        let mut warnings = Vec::new();
        let mut winner = None;

        for location in &candidates {
            match self.loader.load(location).await {
                Ok(document) => {
                    let check = check_candidate(location, &document, &key);
                    if check.valid {
                        warnings.extend(check.warnings);
                        winner = Some((location.clone(), document));
                        break;
                    }
                    tracing::debug!("Candidate {} does not match {}, skipping", location, key);
                }
                Err(e) if e.is_not_found() => tracing::debug!("Candidate {} not found", location),
                Err(e) if e.is_recoverable() => tracing::warn!("Skipping candidate {}: {}", location, e),
                Err(e) => tracing::error!("Unexpected error loading candidate {}: {}", location, e),
            }
        }

        let (document, location, inherited, synthesized) = match winner {
            Some((location, document)) => {
                let (document, inherited) = self.apply_inheritance(&location, &document, &mut warnings).await;
                tracing::debug!("Resolved {} to {}", key, location);
                (document, location, inherited, false)
            }
            None => {
                tracing::info!("No usable template for {}, using built-in default", key);
                (default::built_in_document(&key), BUILT_IN_LOCATION.to_string(), Vec::new(), true)
            }
        };

        let effective = Arc::new(EffectiveTemplate {
            document,
            metadata: ResolutionMetadata {
                key: key.clone(),
                location,
                synthesized,
                candidates,
                inherited,
                warnings,
                resolved_at: Utc::now(),
            },
        });
        self.resolved.insert(key, Arc::clone(&effective));
        effective
    }

    /// Merge the `inherits_from` chain of `document` beneath it, deepest base first.
    async fn apply_inheritance(
        &mut self,
        location: &str,
        document: &TemplateDocument,
        warnings: &mut Vec<ValidationWarning>,
    ) -> (TemplateDocument, Vec<String>) {
        let mut bases = Vec::new();
        let mut inherited: Vec<String> = Vec::new();
        let mut next = document.meta().inherits_from;

        while let Some(target) = next.take() {
            let base_location = candidates::inheritance_location(&target, &self.config);
            if base_location == location || inherited.contains(&base_location) {
                tracing::warn!("Inheritance cycle in {} through {}", location, base_location);
                warnings.push(ValidationWarning::InheritanceCycle {
                    location: location.to_string(),
                    base: base_location,
                });
                break;
            }
            if inherited.len() >= self.config.max_inheritance_depth {
                tracing::warn!("Inheritance chain of {} exceeds {} levels", location, self.config.max_inheritance_depth);
                warnings.push(ValidationWarning::InheritanceTooDeep {
                    location: location.to_string(),
                    max_depth: self.config.max_inheritance_depth,
                });
                break;
            }

            match self.loader.load(&base_location).await {
                Ok(base) => {
                    next = base.meta().inherits_from;
                    inherited.push(base_location);
                    bases.push(base);
                }
                Err(e) => {
                    tracing::warn!("Base {} of {} unavailable: {}", base_location, location, e);
                    warnings.push(ValidationWarning::MissingBase {
                        location: location.to_string(),
                        base: base_location,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if bases.is_empty() {
            return (document.clone(), inherited);
        }

        let merged = bases.iter().rev().fold(Map::new(), |tree, base| overlay(tree, base.tree()));
        (TemplateDocument::from_tree(overlay(merged, document.tree())), inherited)
    }

    /// Every platform template and tech-stack document in the library.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be listed.
    pub async fn list_available(&self) -> TemplateResult<Vec<AvailableTemplate>> {
        let locations = self.loader.source().list().await?;
        let mut available: Vec<AvailableTemplate> = locations
            .iter()
            .filter_map(|location| candidates::parse_location(location, &self.config.extension))
            .collect();
        available.sort_by(|a, b| (&a.scope, &a.document_type).cmp(&(&b.scope, &b.document_type)));
        Ok(available)
    }

    /// Empty the document and effective-template caches.
    pub fn clear_caches(&mut self) {
        tracing::debug!("Clearing template caches");
        self.loader.clear();
        self.resolved.clear();
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            documents: self.loader.stats(),
            templates: self.resolved.stats(),
        }
    }
}

/// Merge `layer` over `tree`. A layer that declares a body (`template` or a
/// top-level `content`) drops the other body shape inherited from below.
fn overlay(tree: Map, layer: &Map) -> Map {
    let declares = |key: &str| layer.get(key).is_some_and(|value| !value.is_null());
    let mut merged = merge_maps(tree, layer);
    if declares(TEMPLATE_KEY) {
        merged.shift_remove(CONTENT_KEY);
    } else if declares(CONTENT_KEY) {
        merged.shift_remove(TEMPLATE_KEY);
    }
    merged
}
