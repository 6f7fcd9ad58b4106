//! Document sources: where template bytes come from.
//!
//! The loader never touches storage directly. It asks a [`DocumentSource`] for
//! the text at a location and for the list of locations it can serve. Two
//! sources ship with the crate:
//!
//! - [`FsSource`] reads from a template root directory with `tokio::fs`
//! - [`MemorySource`] serves documents registered in memory (embedded libraries, tests)

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::core::{TemplateError, TemplateResult};

/// Provider of raw template text.
pub trait DocumentSource {
    /// Read the document at `location`. Absence is `Ok(None)`, not an error.
    fn read(&self, location: &str) -> impl Future<Output = TemplateResult<Option<String>>> + Send;

    /// Every location this source can serve, using `/` separators.
    fn list(&self) -> impl Future<Output = TemplateResult<Vec<String>>> + Send;
}

/// Validates a location before any storage access.
///
/// Locations must be relative and must not climb out of the template root
/// through `..` components.
pub fn validate_location(location: &str) -> TemplateResult<()> {
    let invalid = |reason: &str| TemplateError::InvalidLocation {
        location: location.to_string(),
        reason: reason.to_string(),
    };

    if location.trim().is_empty() {
        return Err(invalid("location is empty"));
    }

    let path = Path::new(location);
    if path.is_absolute() || location.starts_with('/') || location.starts_with('\\') {
        return Err(invalid("absolute locations are not allowed"));
    }

    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid("location escapes the template root"));
                }
            }
            Component::CurDir => {}
            _ => return Err(invalid("only relative locations are allowed")),
        }
    }

    Ok(())
}

/// Reads templates from a directory tree.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for FsSource {
    async fn read(&self, location: &str) -> TemplateResult<Option<String>> {
        validate_location(location)?;
        let path = self.root.join(location);

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No template at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(TemplateError::Io {
                location: location.to_string(),
                source: e,
            }),
        }
    }

    async fn list(&self) -> TemplateResult<Vec<String>> {
        let root = self.root.clone();
        let walk = tokio::task::spawn_blocking(move || -> TemplateResult<Vec<String>> {
            if !root.is_dir() {
                tracing::debug!("Template root {} does not exist", root.display());
                return Ok(Vec::new());
            }

            let mut locations = Vec::new();
            for entry in WalkDir::new(&root).follow_links(false) {
                let entry = entry.map_err(|e| TemplateError::Io {
                    location: root.display().to_string(),
                    source: e.into(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    let parts: Vec<_> =
                        relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                    locations.push(parts.join("/"));
                }
            }
            locations.sort();
            Ok(locations)
        });

        walk.await.map_err(|e| TemplateError::Io {
            location: self.root.display().to_string(),
            source: std::io::Error::other(e),
        })?
    }
}

/// Serves documents registered in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<String, String>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_document(mut self, location: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(location, text);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(location.into(), text.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSource for MemorySource {
    async fn read(&self, location: &str) -> TemplateResult<Option<String>> {
        validate_location(location)?;
        Ok(self.documents.get(location).cloned())
    }

    async fn list(&self) -> TemplateResult<Vec<String>> {
        Ok(self.documents.keys().cloned().collect())
    }
}
