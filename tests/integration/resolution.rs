//! Integration tests for template resolution.
//!
//! These tests verify that:
//! - Candidates are tried in fallback order and the first usable one wins
//! - Malformed, unreadable and mismatched candidates are skipped
//! - `inherits_from` chains are merged and their problems reported
//! - A built-in default is synthesized when the library has nothing usable
//! - Resolutions are cached until the caches are cleared

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tplforge::constants::BUILT_IN_LOCATION;
use tplforge::resolver::{TemplateScope, ValidationWarning};
use tplforge::templating::RenderContext;
use tplforge::test_utils::sample_context;

use crate::common::{TestLibrary, memory_engine, shipped_engine};

#[tokio::test]
async fn test_platform_template_wins_and_inherits_base() -> Result<()> {
    tplforge::test_utils::init_test_logging(None);

    let library = TestLibrary::shipped().await?;
    let mut engine = library.engine();

    let effective = engine.resolve("Jira", "Ticket", "React").await;
    let metadata = effective.metadata();
    assert_eq!(metadata.location, "platforms/jira/ticket.yaml");
    assert_eq!(metadata.inherited, vec!["base/default.yaml".to_string()]);
    assert!(!metadata.synthesized);
    assert_eq!(metadata.key.to_string(), "jira/ticket/react");
    assert_eq!(
        metadata.candidates,
        vec![
            "platforms/jira/ticket.yaml".to_string(),
            "tech-stacks/react/defaults.yaml".to_string(),
            "tech-stacks/custom/defaults.yaml".to_string(),
        ]
    );

    // Keys from the base survive the merge; the platform template's keys win
    let template = effective.document().template().and_then(|t| t.as_map()).expect("template map");
    assert!(template.contains_key("footer"));
    assert_eq!(template.get("issue_type").and_then(|v| v.as_str()), Some("Story"));
    assert_eq!(
        template.get("title").and_then(|v| v.as_str()),
        Some("[${component}] Implement component")
    );
    Ok(())
}

#[tokio::test]
async fn test_falls_back_to_tech_stack_defaults() -> Result<()> {
    let mut engine = shipped_engine();

    let effective = engine.resolve("gitlab", "ticket", "react").await;
    assert_eq!(effective.metadata().location, "tech-stacks/react/defaults.yaml");
    assert!(effective.metadata().inherited.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_falls_back_to_custom_stack_with_warning() -> Result<()> {
    let mut engine = shipped_engine();

    let effective = engine.resolve("gitlab", "ticket", "vue").await;
    let metadata = effective.metadata();
    assert_eq!(metadata.location, "tech-stacks/custom/defaults.yaml");
    assert!(!metadata.synthesized);
    assert!(
        metadata.warnings.iter().any(|w| matches!(
            w,
            ValidationWarning::IdentifierMismatch { field: "tech_stack", .. }
        )),
        "expected a tech_stack mismatch, got {:?}",
        metadata.warnings
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_triple_synthesizes_default() -> Result<()> {
    let library = TestLibrary::new().await?;
    let mut engine = library.engine();

    let effective = engine.resolve("linear", "epic", "svelte").await;
    assert!(effective.is_synthesized());
    assert_eq!(effective.metadata().location, BUILT_IN_LOCATION);

    let output = engine.render(&effective, &sample_context());
    let text = output.as_text().expect("built-in default renders text");
    assert!(text.starts_with("# Primary Button\n"), "got:\n{text}");
    assert!(text.contains("_epic linear for svelte_"));
    assert!(text.contains("## Dimensions\n120 x 40\n"));
    assert!(text.contains("Atlas Design (react, typescript)"));
    assert!(text.contains("Confidence: 86%"));
    assert!(text.contains("## Notes"));
    Ok(())
}

#[tokio::test]
async fn test_mismatched_candidate_without_body_is_skipped() -> Result<()> {
    let mut engine = memory_engine(&[
        ("platforms/jira/ticket.yaml", "meta:\n  platform: linear\n  version: 1.0.0\n"),
        ("tech-stacks/react/defaults.yaml", "meta:\n  tech_stack: react\ncontent: React defaults\n"),
    ]);

    let effective = engine.resolve("jira", "ticket", "react").await;
    assert_eq!(effective.metadata().location, "tech-stacks/react/defaults.yaml");
    Ok(())
}

#[tokio::test]
async fn test_malformed_and_unreadable_candidates_are_skipped() -> Result<()> {
    let library = TestLibrary::new().await?;
    library.add_document("platforms/jira/ticket.yaml", "meta:\n   platform: jira\n").await?;
    // A directory where a document is expected cannot be read
    tokio::fs::create_dir_all(library.root().join("tech-stacks/react/defaults.yaml")).await?;
    library.add_document("tech-stacks/custom/defaults.yaml", "content: Custom\n").await?;

    let mut engine = library.engine();
    let effective = engine.resolve("jira", "ticket", "react").await;
    assert_eq!(effective.metadata().location, "tech-stacks/custom/defaults.yaml");
    assert!(
        effective.metadata().warnings.iter().any(|w| matches!(w, ValidationWarning::MissingMeta { .. }))
    );
    Ok(())
}

#[tokio::test]
async fn test_unsafe_segments_never_escape_the_library() -> Result<()> {
    let mut engine = memory_engine(&[]);

    let effective = engine.resolve("../..", "etc/passwd", "react").await;
    let candidates = &effective.metadata().candidates;
    assert!(candidates.iter().all(|c| !c.contains("..")), "{candidates:?}");
    assert_eq!(candidates.first().map(String::as_str), Some("tech-stacks/react/defaults.yaml"));
    assert!(effective.is_synthesized());
    Ok(())
}

#[tokio::test]
async fn test_missing_base_is_reported() -> Result<()> {
    let mut engine = memory_engine(&[(
        "platforms/jira/ticket.yaml",
        "meta:\n  platform: jira\n  inherits_from: base\ncontent: Ticket\n",
    )]);

    let effective = engine.resolve("jira", "ticket", "react").await;
    assert_eq!(effective.metadata().location, "platforms/jira/ticket.yaml");
    assert!(effective.metadata().inherited.is_empty());
    assert!(effective.metadata().warnings.iter().any(|w| matches!(
        w,
        ValidationWarning::MissingBase { base, .. } if base == "base/default.yaml"
    )));
    assert_eq!(engine.render(&effective, &sample_context()).as_text(), Some("Ticket"));
    Ok(())
}

#[tokio::test]
async fn test_flat_content_survives_structured_base() -> Result<()> {
    let mut engine = memory_engine(&[
        ("base/default.yaml", "template:\n  title: Base\n  footer: Base footer\n"),
        (
            "platforms/linear/story.yaml",
            "meta:\n  platform: linear\n  inherits_from: base\ncontent: Linear {{ design.component_name }}\n",
        ),
    ]);

    let context = RenderContext::new().with("design", json!({"component_name": "Button"}));
    let effective = engine.resolve("linear", "story", "react").await;
    assert_eq!(effective.metadata().inherited, vec!["base/default.yaml".to_string()]);

    let output = engine.generate("linear", "story", "react", &context).await;
    assert_eq!(output.as_text(), Some("Linear Button"));
    Ok(())
}

#[tokio::test]
async fn test_inheritance_cycle_is_broken() -> Result<()> {
    let mut engine = memory_engine(&[
        (
            "platforms/jira/ticket.yaml",
            "meta:\n  platform: jira\n  inherits_from: shared/story\ntemplate:\n  title: Ticket\n",
        ),
        (
            "shared/story.yaml",
            "meta:\n  inherits_from: platforms/jira/ticket.yaml\ntemplate:\n  title: Story\n  kind: story\n",
        ),
    ]);

    let effective = engine.resolve("jira", "ticket", "react").await;
    let metadata = effective.metadata();
    assert_eq!(metadata.inherited, vec!["shared/story.yaml".to_string()]);
    assert!(metadata.warnings.iter().any(|w| matches!(w, ValidationWarning::InheritanceCycle { .. })));

    let template = effective.document().template().and_then(|t| t.as_map()).expect("template map");
    assert_eq!(template.get("title").and_then(|v| v.as_str()), Some("Ticket"));
    assert_eq!(template.get("kind").and_then(|v| v.as_str()), Some("story"));
    Ok(())
}

#[tokio::test]
async fn test_multi_level_inheritance_merges_deepest_first() -> Result<()> {
    let mut engine = memory_engine(&[
        (
            "platforms/jira/ticket.yaml",
            "meta:\n  platform: jira\n  inherits_from: shared/story\ntemplate:\n  title: Ticket\n",
        ),
        (
            "shared/story.yaml",
            "meta:\n  inherits_from: base\ntemplate:\n  title: Story\n  points: 3\n",
        ),
        ("base/default.yaml", "template:\n  title: Base\n  points: 1\n  footer: Generated\n"),
    ]);

    let effective = engine.resolve("jira", "ticket", "react").await;
    assert_eq!(
        effective.metadata().inherited,
        vec!["shared/story.yaml".to_string(), "base/default.yaml".to_string()]
    );

    let template = effective.document().template().and_then(|t| t.as_map()).expect("template map");
    assert_eq!(template.get("title").and_then(|v| v.as_str()), Some("Ticket"));
    assert_eq!(template.get("points").map(ToString::to_string).as_deref(), Some("3"));
    assert_eq!(template.get("footer").and_then(|v| v.as_str()), Some("Generated"));
    Ok(())
}

#[tokio::test]
async fn test_repeat_resolution_is_cached() -> Result<()> {
    let mut engine = shipped_engine();

    let first = engine.resolve("jira", "ticket", "react").await;
    let second = engine.resolve("JIRA", " ticket ", "react").await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.metadata(), second.metadata());

    let stats = engine.stats();
    assert_eq!(stats.templates.hits, 1);
    assert_eq!(stats.templates.misses, 1);
    assert_eq!(stats.templates.entries, 1);
    Ok(())
}

#[tokio::test]
async fn test_clear_caches_picks_up_library_changes() -> Result<()> {
    let library = TestLibrary::new().await?;
    library.add_document("platforms/jira/ticket.yaml", "meta:\n  platform: jira\ncontent: First\n").await?;
    let mut engine = library.engine();
    let context = sample_context();

    assert_eq!(engine.generate("jira", "ticket", "react", &context).await.as_text(), Some("First"));

    library.add_document("platforms/jira/ticket.yaml", "meta:\n  platform: jira\ncontent: Second\n").await?;
    assert_eq!(engine.generate("jira", "ticket", "react", &context).await.as_text(), Some("First"));

    engine.clear_caches();
    assert_eq!(engine.stats().templates.entries, 0);
    assert_eq!(engine.generate("jira", "ticket", "react", &context).await.as_text(), Some("Second"));

    library.remove_document("platforms/jira/ticket.yaml").await?;
    engine.clear_caches();
    assert!(engine.resolve("jira", "ticket", "react").await.is_synthesized());
    Ok(())
}

#[tokio::test]
async fn test_list_available_templates() -> Result<()> {
    let library = TestLibrary::shipped().await?;
    library.add_document("platforms/jira/notes.txt", "not a template").await?;
    let engine = library.engine();

    let available = engine.list_available().await?;
    let summary: Vec<(TemplateScope, &str)> =
        available.iter().map(|t| (t.scope.clone(), t.document_type.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (TemplateScope::Platform("confluence".into()), "wiki"),
            (TemplateScope::Platform("github".into()), "issue"),
            (TemplateScope::Platform("jira".into()), "ticket"),
            (TemplateScope::TechStack("custom".into()), "defaults"),
            (TemplateScope::TechStack("react".into()), "defaults"),
        ]
    );
    assert_eq!(available[2].location, "platforms/jira/ticket.yaml");
    Ok(())
}

#[tokio::test]
async fn test_list_available_on_missing_root_is_empty() -> Result<()> {
    let library = TestLibrary::new().await?;
    let engine = tplforge::TemplateEngine::new(tplforge::config::EngineConfig::with_root(
        library.root().join("does-not-exist"),
    ));
    assert!(engine.list_available().await?.is_empty());
    Ok(())
}
