//! Candidate locations and the template library layout.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::ResolutionKey;
use crate::config::EngineConfig;
use crate::constants::{DEFAULTS_DOCUMENT, PLATFORMS_DIR, TECH_STACKS_DIR};

/// Alias accepted in `meta.inherits_from` for the configured base document.
pub const BASE_ALIAS: &str = "base";

/// Ordered fallback chain for `key`:
///
/// 1. `platforms/<platform>/<document_type>.<ext>`
/// 2. `tech-stacks/<tech_stack>/defaults.<ext>`
/// 3. `tech-stacks/<custom>/defaults.<ext>`
///
/// Entries built from unsafe segments are skipped and duplicates removed;
/// the order never depends on what exists on disk.
#[must_use]
pub fn candidate_locations(key: &ResolutionKey, config: &EngineConfig) -> Vec<String> {
    let ext = &config.extension;
    let mut locations = Vec::with_capacity(3);

    if is_safe_segment(&key.platform) && is_safe_segment(&key.document_type) {
        push_unique(
            &mut locations,
            format!("{PLATFORMS_DIR}/{}/{}.{ext}", key.platform, key.document_type),
        );
    }
    if is_safe_segment(&key.tech_stack) {
        push_unique(&mut locations, format!("{TECH_STACKS_DIR}/{}/{DEFAULTS_DOCUMENT}.{ext}", key.tech_stack));
    }
    if is_safe_segment(&config.custom_tech_stack) {
        push_unique(
            &mut locations,
            format!("{TECH_STACKS_DIR}/{}/{DEFAULTS_DOCUMENT}.{ext}", config.custom_tech_stack),
        );
    }

    locations
}

fn push_unique(locations: &mut Vec<String>, location: String) {
    if !locations.contains(&location) {
        locations.push(location);
    }
}

/// Whether `segment` can be used as one path component of a location.
#[must_use]
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment.chars().all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Location of an `inherits_from` target. `base` names the configured base
/// document and the extension is appended when missing.
#[must_use]
pub fn inheritance_location(target: &str, config: &EngineConfig) -> String {
    let target = target.trim();
    let target = if target == BASE_ALIAS { config.base_document.as_str() } else { target };
    if Path::new(target).extension().is_some() {
        target.to_string()
    } else {
        format!("{target}.{}", config.extension)
    }
}

/// Where an available template applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateScope {
    Platform(String),
    TechStack(String),
}

impl fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateScope::Platform(platform) => write!(f, "platform {platform}"),
            TemplateScope::TechStack(stack) => write!(f, "tech stack {stack}"),
        }
    }
}

/// One entry of the template library listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableTemplate {
    pub scope: TemplateScope,
    pub document_type: String,
    pub location: String,
}

/// Classify a library location, or `None` when it is not a platform template
/// or tech-stack document with the configured extension.
#[must_use]
pub fn parse_location(location: &str, extension: &str) -> Option<AvailableTemplate> {
    let mut parts = location.split('/');
    let (Some(dir), Some(owner), Some(file), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let document_type = file.strip_suffix(extension)?.strip_suffix('.')?;
    if document_type.is_empty() {
        return None;
    }

    let scope = match dir {
        PLATFORMS_DIR => TemplateScope::Platform(owner.to_string()),
        TECH_STACKS_DIR => TemplateScope::TechStack(owner.to_string()),
        _ => return None,
    };

    Some(AvailableTemplate {
        scope,
        document_type: document_type.to_string(),
        location: location.to_string(),
    })
}
