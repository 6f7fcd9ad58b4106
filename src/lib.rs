//! tplforge - document template resolution and rendering
//!
//! Resolves structured document templates (tickets, specs, wiki pages) from a
//! file-based template library and renders them against a caller-supplied
//! context.
//!
//! # Architecture Overview
//!
//! Given a `(platform, document_type, tech_stack)` triple, the engine:
//! - walks a fixed fallback chain of candidate template locations
//! - keeps the first candidate that parses and is structurally usable
//! - merges its `inherits_from` chain (usually the shared base document) beneath it
//! - synthesizes a built-in default when the library has nothing usable
//! - renders the result with a small expression language: interpolation,
//!   conditionals, loops, named sections, filters and arithmetic
//!
//! Resolution never fails for missing or malformed templates, and rendering
//! never fails at all: the caller always gets the best available output.
//!
//! # Core Modules
//!
//! ## Resolution
//! - [`loader`] - document sources and the line-oriented document parser
//! - [`merge`] - deep merge of template trees
//! - [`resolver`] - fallback chain, validation, inheritance and caching
//!
//! ## Rendering
//! - [`templating`] - expressions, filters, block tags and the renderer
//! - [`value`] - the tagged value tree shared by templates and contexts
//!
//! ## Supporting Modules
//! - [`engine`] - the facade tying resolver and renderer together
//! - [`config`] - engine configuration (`~/.config/tplforge/config.toml`)
//! - [`core`] - error types
//! - [`cache`] - caches with hit/miss accounting
//! - [`constants`] - library layout and namespace names
//!
//! # Template Library Layout
//!
//! ```text
//! templates/
//! ├── base/default.yaml                # shared base document
//! ├── platforms/<platform>/<type>.yaml # platform templates
//! └── tech-stacks/<stack>/defaults.yaml
//! ```
//!
//! # Document Format
//!
//! ```text
//! meta:
//!   platform: jira
//!   document_type: ticket
//!   version: 1.0.0
//!   inherits_from: base
//! template:
//!   title: "{{ design.component_name }}: implement component"
//!   labels: [frontend, "{{ project.platform }}"]
//!   description: |
//!     {% if calculated.confidence %}Confidence: {{ calculated.confidence | multiply }}%{% endif %}
//!     {% for dep in design.dependencies %}- {{ dep }}
//!     {% endfor %}
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tplforge::engine::TemplateEngine;
//! use tplforge::templating::RenderContext;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut engine = TemplateEngine::from_env().await?;
//! let context = RenderContext::new()
//!     .with("design", json!({ "component_name": "Primary Button" }))
//!     .with("calculated", json!({ "confidence": 0.85 }));
//!
//! let output = engine.generate("jira", "ticket", "react", &context).await;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

// Resolution
pub mod loader;
pub mod merge;
pub mod resolver;

// Rendering
pub mod templating;
pub mod value;

// Supporting modules
pub mod cache;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use engine::TemplateEngine;
