//! Shared fixtures: a sample render context and the shipped template library.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::constants::{CALCULATED_NAMESPACE, DESIGN_NAMESPACE, PROJECT_NAMESPACE};
use crate::loader::MemorySource;
use crate::templating::RenderContext;

/// The documents under `templates/`, keyed by location.
pub const LIBRARY: &[(&str, &str)] = &[
    ("base/default.yaml", include_str!("../../templates/base/default.yaml")),
    ("platforms/jira/ticket.yaml", include_str!("../../templates/platforms/jira/ticket.yaml")),
    ("platforms/confluence/wiki.yaml", include_str!("../../templates/platforms/confluence/wiki.yaml")),
    ("platforms/github/issue.yaml", include_str!("../../templates/platforms/github/issue.yaml")),
    ("tech-stacks/react/defaults.yaml", include_str!("../../templates/tech-stacks/react/defaults.yaml")),
    ("tech-stacks/custom/defaults.yaml", include_str!("../../templates/tech-stacks/custom/defaults.yaml")),
];

/// A context describing one design component, as an upstream analysis step
/// would produce it.
pub fn sample_context() -> RenderContext {
    RenderContext::new()
        .with(
            DESIGN_NAMESPACE,
            json!({
                "component_name": "Primary Button",
                "description": "Call-to-action button used across checkout flows.",
                "dimensions": {"width": 120, "height": 40},
                "variants": ["primary", "secondary", "ghost"],
                "dependencies": ["Icon", "Spinner"],
                "props": [
                    {"name": "label", "type": "string"},
                    {"name": "disabled", "type": "boolean"},
                    {"name": "onClick"}
                ]
            }),
        )
        .with(
            PROJECT_NAMESPACE,
            json!({
                "name": "Atlas Design",
                "platform": "jira",
                "repository": "packages/ui/src/components",
                "tech_stack": ["react", "typescript"]
            }),
        )
        .with(
            CALCULATED_NAMESPACE,
            json!({
                "complexity": "medium",
                "story_points": 5,
                "confidence": 0.856,
                "estimated_hours": 12,
                "risk_factors": ["new animation API", "RTL layout"]
            }),
        )
        .with("team", json!({"name": "Platform UI"}))
}

/// The shipped library held in memory.
pub fn sample_library() -> MemorySource {
    LIBRARY
        .iter()
        .fold(MemorySource::new(), |source, (location, text)| source.with_document(*location, *text))
}

/// Write the shipped library below `root`, for tests that read from disk.
pub async fn write_library(root: &Path) -> Result<()> {
    for (location, text) in LIBRARY {
        let path = root.join(location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
