//! Engine configuration.
//!
//! Configuration is optional. Without a file the engine reads templates from
//! `./templates` with the `yaml` extension and `base/default` as the shared
//! base document.
//!
//! # Location
//!
//! The file is looked up in this order:
//!
//! 1. the path in the `TPLFORGE_CONFIG` environment variable
//! 2. `<config dir>/tplforge/config.toml` (`~/.config/tplforge/config.toml` on Linux)
//!
//! A missing file yields the defaults. `TPLFORGE_TEMPLATE_ROOT` overrides
//! `template_root` after the file is read.
//!
//! # Format
//!
//! ```toml
//! template_root = "~/docs/templates"
//! extension = "yaml"
//! base_document = "base/default"
//! custom_tech_stack = "custom"
//! max_inheritance_depth = 5
//! literal_blocks = true
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{
    CONFIG_ENV, CUSTOM_TECH_STACK, DEFAULT_BASE_DOCUMENT, DEFAULT_TEMPLATE_EXTENSION,
    DEFAULT_TEMPLATE_ROOT, MAX_INHERITANCE_DEPTH, TEMPLATE_ROOT_ENV,
};

/// Settings for template resolution and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `platforms/`, `tech-stacks/` and the base document.
    pub template_root: PathBuf,

    /// Extension appended to every candidate location, without the dot.
    pub extension: String,

    /// Location of the shared base document, without extension.
    pub base_document: String,

    /// Tech stack whose `defaults` document is the last fallback candidate.
    pub custom_tech_stack: String,

    /// Longest `inherits_from` chain followed before giving up.
    pub max_inheritance_depth: usize,

    /// Whether ```` ```literal ```` fences are protected from rendering.
    pub literal_blocks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_root: PathBuf::from(DEFAULT_TEMPLATE_ROOT),
            extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            base_document: DEFAULT_BASE_DOCUMENT.to_string(),
            custom_tech_stack: CUSTOM_TECH_STACK.to_string(),
            max_inheritance_depth: MAX_INHERITANCE_DEPTH,
            literal_blocks: true,
        }
    }
}

impl EngineConfig {
    /// Configuration rooted at `template_root`, defaults otherwise.
    pub fn with_root(template_root: impl Into<PathBuf>) -> Self {
        Self {
            template_root: template_root.into(),
            ..Self::default()
        }
    }

    /// Load from the environment-selected or default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub async fn load() -> Result<Self> {
        Self::load_with_env(|name| std::env::var(name).ok()).await
    }

    /// [`EngineConfig::load`] with an injectable environment lookup.
    pub async fn load_with_env(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = match env(CONFIG_ENV).filter(|value| !value.trim().is_empty()) {
            Some(explicit) => expand_path(&explicit)?,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or does
    /// not match the expected schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read engine config from {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse engine config from {}", path.display()))?;
        config.template_root = expand_path(&config.template_root.to_string_lossy())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid engine configuration")
    }

    /// `<config dir>/tplforge/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(config_dir.join("tplforge").join("config.toml"))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = env(TEMPLATE_ROOT_ENV).filter(|value| !value.trim().is_empty()) {
            tracing::debug!("Template root overridden by {}", TEMPLATE_ROOT_ENV);
            self.template_root = expand_path(&root)?;
        }
        Ok(())
    }

    /// Check values the resolver relies on.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or dotted extension, an empty base
    /// document or custom tech stack, or a zero inheritance depth.
    pub fn validate(&self) -> Result<()> {
        if self.extension.trim().is_empty() || self.extension.contains(['.', '/', '\\']) {
            bail!("extension must be a bare file extension such as \"yaml\", got {:?}", self.extension);
        }
        if self.base_document.trim().is_empty() {
            bail!("base_document must not be empty");
        }
        if self.custom_tech_stack.trim().is_empty() || self.custom_tech_stack.contains(['/', '\\']) {
            bail!("custom_tech_stack must be a single directory name, got {:?}", self.custom_tech_stack);
        }
        if self.max_inheritance_depth == 0 {
            bail!("max_inheritance_depth must be at least 1");
        }
        Ok(())
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path {raw:?}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
