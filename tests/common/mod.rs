//! Common test utilities for tplforge integration tests
//!
//! Builds throwaway template libraries on disk and engines reading from them.

// Allow dead code because these utilities are used across different test files
// and not all utilities are used in every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tplforge::config::EngineConfig;
use tplforge::engine::TemplateEngine;
use tplforge::loader::MemorySource;

/// A template library in a temporary directory.
pub struct TestLibrary {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestLibrary {
    /// Create an empty library
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp directory")?;
        let root = temp_dir.path().join("templates");
        tokio::fs::create_dir_all(&root).await.context("Failed to create template root")?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    /// Create a library holding a copy of the shipped templates
    pub async fn shipped() -> Result<Self> {
        let library = Self::new().await?;
        tplforge::test_utils::write_library(&library.root).await?;
        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write (or overwrite) a document at `location`
    pub async fn add_document(&self, location: &str, content: &str) -> Result<()> {
        let path = self.root.join(location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub async fn remove_document(&self, location: &str) -> Result<()> {
        tokio::fs::remove_file(self.root.join(location))
            .await
            .with_context(|| format!("Failed to remove {location}"))
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::with_root(&self.root)
    }

    /// Engine reading this library from disk
    pub fn engine(&self) -> TemplateEngine {
        TemplateEngine::new(self.config())
    }
}

/// Engine over an in-memory library built from `(location, text)` pairs.
pub fn memory_engine(documents: &[(&str, &str)]) -> TemplateEngine<MemorySource> {
    let source = documents
        .iter()
        .fold(MemorySource::new(), |source, (location, text)| source.with_document(*location, *text));
    TemplateEngine::with_source(source, EngineConfig::default())
}

/// Engine over the shipped library, held in memory.
pub fn shipped_engine() -> TemplateEngine<MemorySource> {
    TemplateEngine::with_source(tplforge::test_utils::sample_library(), EngineConfig::default())
}
