//! Integration tests rendering the shipped template library.
//!
//! These tests verify that:
//! - Structured templates render every string leaf and keep the rest
//! - Flat templates render loops, conditionals and sections end to end
//! - Document variables from inherited bases reach the rendered output
//! - Section preferences in the context reshape the rendered document

use anyhow::Result;
use serde_json::json;
use tplforge::resolver::ValidationWarning;
use tplforge::templating::{RenderContext, RenderOutput};
use tplforge::test_utils::sample_context;
use tplforge::value::Value;

use crate::common::{TestLibrary, shipped_engine};

const WIKI_PAGE: &str = "\
# Primary Button

_Owner: Platform UI_

## Overview
Call-to-action button used across checkout flows.

## Variants
| # | Variant |
|---|---------|
| 1 | Primary |
| 2 | Secondary |
| 3 | Ghost |

## Stack
react + typescript

## Changelog
No changes recorded.
";

#[tokio::test]
async fn test_jira_ticket_renders_structured_output() -> Result<()> {
    tplforge::test_utils::init_test_logging(None);

    let library = TestLibrary::shipped().await?;
    let mut engine = library.engine();
    let output = engine.generate("jira", "ticket", "react", &sample_context()).await;

    let ticket = match output {
        RenderOutput::Structured(Value::Map(ticket)) => ticket,
        other => panic!("expected structured output, got {other:?}"),
    };
    let text = |key: &str| ticket.get(key).and_then(Value::as_str).map(str::to_string);

    assert_eq!(text("title").as_deref(), Some("[Primary Button] Implement component"));
    assert_eq!(text("issue_type").as_deref(), Some("Story"));
    assert_eq!(text("story_points").as_deref(), Some("5"));
    assert_eq!(
        ticket.get("labels"),
        Some(&Value::from(json!(["frontend", "design-system", "atlas-design"])))
    );
    assert_eq!(
        ticket.get("estimate"),
        Some(&Value::from(json!({"complexity": "Medium", "confidence": "86%"})))
    );

    let footer = text("footer").unwrap_or_default();
    assert!(footer.starts_with("Generated by tplforge on "), "footer: {footer}");
    assert!(!footer.contains("{{"));

    assert_eq!(
        text("description").as_deref(),
        Some(
            "h2. Summary\nCall-to-action button used across checkout flows.\n\n\
             h2. Dimensions\n* Width: 120px\n* Height: 40px\n\
             h2. Dependencies\n* Icon\n* Spinner\n\
             h2. Acceptance Criteria\n* Matches the design at every breakpoint\n* Covered by unit tests\n"
        )
    );
    Ok(())
}

#[tokio::test]
async fn test_jira_ticket_with_sparse_context() -> Result<()> {
    let mut engine = shipped_engine();
    let context = RenderContext::new().with("design", json!({"component_name": "Card"}));
    let output = engine.generate("jira", "ticket", "react", &context).await;

    let ticket = output.as_structured().and_then(Value::as_map).expect("structured output");
    assert_eq!(ticket.get("story_points").and_then(Value::as_str), Some("3"));
    assert_eq!(ticket.get("description").and_then(Value::as_str).map(|d| d.contains("Dimensions")), Some(false));
    assert_eq!(
        ticket.get("description").and_then(Value::as_str).map(|d| d.contains("Implement the component as designed.")),
        Some(true)
    );
    assert_eq!(
        ticket.get("estimate"),
        Some(&Value::from(json!({"complexity": "", "confidence": "%"})))
    );
    Ok(())
}

#[tokio::test]
async fn test_confluence_wiki_renders_page() -> Result<()> {
    let mut engine = shipped_engine();
    let output = engine.generate("confluence", "wiki", "react", &sample_context()).await;
    assert_eq!(output.as_text(), Some(WIKI_PAGE));
    Ok(())
}

#[tokio::test]
async fn test_section_preferences_reshape_wiki() -> Result<()> {
    let mut engine = shipped_engine();

    let removed = sample_context().with("team", json!({"name": "Platform UI", "sections": {"changelog": false}}));
    let output = engine.generate("confluence", "wiki", "react", &removed).await;
    let text = output.as_text().expect("text output");
    assert!(text.ends_with("## Stack\nreact + typescript\n"), "got:\n{text}");

    let replaced = sample_context()
        .with("team", json!({"name": "Platform UI"}))
        .with("organization", json!({"sections": {"changelog": "\n## History\nSee {{ project.name }} releases.\n"}}));
    let output = engine.generate("confluence", "wiki", "react", &replaced).await;
    let text = output.as_text().expect("text output");
    assert!(text.ends_with("## History\nSee Atlas Design releases.\n"), "got:\n{text}");
    Ok(())
}

#[tokio::test]
async fn test_deprecated_github_issue_still_renders() -> Result<()> {
    let mut engine = shipped_engine();
    let effective = engine.resolve("github", "issue", "react").await;
    assert!(effective.metadata().warnings.iter().any(|w| matches!(w, ValidationWarning::Deprecated { .. })));

    let output = engine.render(&effective, &sample_context());
    assert_eq!(
        output.as_text(),
        Some(
            "### Primary Button\n\nCall-to-action button used across checkout flows.\n\n\
             - [ ] Risk: new animation API\n- [ ] Risk: RTL layout"
        )
    );
    Ok(())
}

#[tokio::test]
async fn test_react_defaults_render_props() -> Result<()> {
    let mut engine = shipped_engine();
    let output = engine.generate("gitlab", "ticket", "react", &sample_context()).await;
    assert_eq!(
        output.as_text(),
        Some(
            "# Primary Button (React)\n\n\
             Create `PrimaryButton.tsx` in `packages/ui/src/components`.\n\n\
             ## Props\n\
             - `label`: string\n\
             - `disabled`: boolean\n\
             - `onClick`: unknown\n\n\
             Estimated effort: 1.5 days"
        )
    );

    let bare = RenderContext::new().with("design", json!({"component_name": "Card"}));
    let output = engine.generate("gitlab", "ticket", "react", &bare).await;
    assert_eq!(
        output.as_text(),
        Some("# Card (React)\n\nCreate `Card.tsx` in `src/components`.\n\n## Props\nNo props defined.\n")
    );
    Ok(())
}

#[tokio::test]
async fn test_custom_stack_renders_generic_document() -> Result<()> {
    let mut engine = shipped_engine();
    let output = engine.generate("gitlab", "ticket", "elm", &sample_context()).await;
    assert_eq!(
        output.as_text(),
        Some("# Primary Button\n\nCall-to-action button used across checkout flows.\n\nComplexity: medium")
    );

    let output = engine.generate("gitlab", "ticket", "elm", &RenderContext::new()).await;
    assert_eq!(output.as_text(), Some("# Untitled component\n\nNo description provided.\n"));
    Ok(())
}

#[tokio::test]
async fn test_context_from_yaml_file() -> Result<()> {
    let library = TestLibrary::shipped().await?;
    let context_path = library.root().join("context.yaml");
    tokio::fs::write(
        &context_path,
        "design:\n  component_name: Toggle\n  variants: [on, off]\nproject:\n  tech_stack: [svelte]\n",
    )
    .await?;
    let context = RenderContext::from_yaml_str(&tokio::fs::read_to_string(&context_path).await?)?;

    let mut engine = library.engine();
    let output = engine.generate("confluence", "wiki", "svelte", &context).await;
    let text = output.as_text().expect("text output");
    assert!(text.starts_with("# Toggle\n\n_Owner: Unassigned_\n"), "got:\n{text}");
    assert!(text.contains("| 1 | On |\n| 2 | Off |\n"));
    assert!(text.contains("## Stack\nsvelte\n"));
    Ok(())
}

#[tokio::test]
async fn test_render_output_serializes_for_callers() -> Result<()> {
    let mut engine = shipped_engine();
    let output = engine.generate("jira", "ticket", "react", &sample_context()).await;
    let json = serde_json::to_value(&output)?;
    assert_eq!(json["title"], "[Primary Button] Implement component");
    assert_eq!(json["labels"][2], "atlas-design");

    let output = engine.generate("confluence", "wiki", "react", &sample_context()).await;
    assert_eq!(serde_json::to_value(&output)?, json!(WIKI_PAGE));
    Ok(())
}
