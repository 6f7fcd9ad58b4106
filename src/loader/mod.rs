//! Document loading: location → parsed [`TemplateDocument`].
//!
//! The [`DocumentLoader`] wraps a [`DocumentSource`] and keeps every successfully
//! parsed document in a cache keyed by the literal location string. Repeated
//! loads of the same location never touch the source again until the cache is
//! cleared.
//!
//! Failures are reported, not raised:
//! - a missing document is [`TemplateError::NotFound`]
//! - malformed text is [`TemplateError::Parse`] with the offending line and column
//! - other read failures are [`TemplateError::Io`]

pub mod document;
pub mod parser;
pub mod source;

use std::sync::Arc;

pub use document::{TemplateDocument, TemplateMeta};
pub use parser::{ParseFailure, parse_document};
pub use source::{DocumentSource, FsSource, MemorySource, validate_location};

use crate::cache::{CacheStats, StatCache};
use crate::core::{TemplateError, TemplateResult};

/// Loads and caches template documents from a source.
#[derive(Debug)]
pub struct DocumentLoader<S> {
    source: S,
    cache: StatCache<String, Arc<TemplateDocument>>,
}

impl<S: DocumentSource> DocumentLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: StatCache::new(),
        }
    }

    /// Load the document at `location`, serving repeated requests from the cache.
    pub async fn load(&mut self, location: &str) -> TemplateResult<Arc<TemplateDocument>> {
        if let Some(document) = self.cache.get(&location.to_string()) {
            tracing::debug!("Document cache hit for {}", location);
            return Ok(Arc::clone(document));
        }

        let Some(text) = self.source.read(location).await? else {
            return Err(TemplateError::NotFound {
                location: location.to_string(),
            });
        };

        let document = TemplateDocument::parse(&text).map_err(|failure| TemplateError::Parse {
            location: location.to_string(),
            line: failure.line,
            column: failure.column,
            message: failure.message,
        })?;

        tracing::debug!("Parsed template {} ({} top-level keys)", location, document.tree().len());
        let document = Arc::new(document);
        self.cache.insert(location.to_string(), Arc::clone(&document));
        Ok(document)
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
