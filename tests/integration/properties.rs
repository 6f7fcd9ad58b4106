//! Language- and engine-level guarantees exercised through the public API.

use anyhow::Result;
use serde_json::json;
use tplforge::merge::merge;
use tplforge::templating::{RenderContext, TemplateRenderer, evaluate, evaluate_truthy};
use tplforge::value::Value;

use crate::common::memory_engine;

fn ctx(value: serde_json::Value) -> Value {
    Value::from(value)
}

#[test]
fn test_arithmetic_never_fails() {
    assert_eq!(evaluate("2 * 50", &ctx(json!({}))).to_string(), "100");
    assert_eq!(evaluate("10 / 0", &ctx(json!({}))).to_string(), "0");
    assert_eq!(evaluate("calculated.hours + 2", &ctx(json!({"calculated": {"hours": 6}}))).to_string(), "8");
    assert_eq!(evaluate("design.name * 2", &ctx(json!({"design": {"name": "x"}}))), Value::Null);
}

#[test]
fn test_missing_paths_are_null_at_any_depth() {
    let context = ctx(json!({"a": {"c": 1}, "s": "text"}));
    assert_eq!(evaluate("a.b", &context), Value::Null);
    assert_eq!(evaluate("a.b.c.d.e", &context), Value::Null);
    assert_eq!(evaluate("missing.x", &context), Value::Null);
    assert_eq!(evaluate("s.length", &context), Value::Null);
    assert_eq!(evaluate("a.c", &context).to_string(), "1");
}

#[test]
fn test_truthiness() {
    assert!(!evaluate_truthy(&Value::from("")));
    assert!(!evaluate_truthy(&Value::from("   ")));
    assert!(!evaluate_truthy(&ctx(json!([]))));
    assert!(!evaluate_truthy(&ctx(json!({}))));
    assert!(!evaluate_truthy(&Value::Null));
    assert!(evaluate_truthy(&Value::from(0_i64)));
    assert!(evaluate_truthy(&Value::from(0.0)));
    assert!(evaluate_truthy(&Value::from("0")));
}

#[test]
fn test_merge_is_idempotent() {
    let base = ctx(json!({"meta": {"version": "1.0.0", "status": "stable"}, "labels": ["a", "b"], "title": "Base"}));
    let overrides = ctx(json!({"meta": {"version": "2.0.0"}, "labels": ["c"], "extra": {"k": 1}}));

    let once = merge(Some(&base), Some(&overrides));
    let twice = merge(Some(&once), Some(&overrides));
    assert_eq!(once, twice);
    assert_eq!(
        once,
        ctx(json!({
            "meta": {"version": "2.0.0", "status": "stable"},
            "labels": ["c"],
            "title": "Base",
            "extra": {"k": 1}
        }))
    );

    assert_eq!(merge(None, Some(&overrides)), overrides);
    assert_eq!(merge(Some(&base), None), base);
    assert_eq!(merge(None, None), Value::empty_map());
}

#[test]
fn test_loops_and_conditionals() {
    let renderer = TemplateRenderer::default();
    let render = |template: &str, value: serde_json::Value| {
        renderer.render_str(template, &RenderContext::from_json(value).expect("map context"))
    };

    assert_eq!(render("{% for item in items %}-{{this}}{% endfor %}", json!({"items": ["x", "y"]})), "-x-y");
    assert_eq!(render("{% for item in items %}-{{this}}{% endfor %}", json!({"items": {}})), "");

    let conditional = "{% if calculated.confidence %}Yes{% endif %}";
    assert_eq!(render(conditional, json!({"calculated": {"confidence": 0.8}})), "Yes");
    assert_eq!(render(conditional, json!({"calculated": {}})), "");
}

#[tokio::test]
async fn test_every_triple_resolves() -> Result<()> {
    let mut engine = memory_engine(&[]);
    let context = RenderContext::new().with("design", json!({"component_name": "Date Picker"}));

    for (platform, document_type, tech_stack) in
        [("jira", "ticket", "react"), ("", "", ""), ("Linear", "EPIC", "svelte"), ("a b", "c/d", "..")]
    {
        let effective = engine.resolve(platform, document_type, tech_stack).await;
        assert!(effective.is_synthesized());
        let output = engine.render(&effective, &context);
        let text = output.as_text().expect("built-in default renders text");
        assert!(text.contains("Date Picker"), "{platform}/{document_type}/{tech_stack}: {text}");
    }
    Ok(())
}

#[tokio::test]
async fn test_repeat_resolve_returns_identical_metadata() -> Result<()> {
    let mut engine = memory_engine(&[(
        "platforms/jira/ticket.yaml",
        "meta:\n  platform: jira\n  document_type: ticket\n  version: 1.0.0\ncontent: \"{{ design.component_name }}\"\n",
    )]);

    let first = engine.resolve("jira", "ticket", "react").await;
    let documents_after_first = engine.stats().documents;
    let second = engine.resolve("jira", "ticket", "react").await;

    assert_eq!(serde_json::to_string(first.metadata())?, serde_json::to_string(second.metadata())?);
    // No document was loaded or parsed again
    assert_eq!(engine.stats().documents, documents_after_first);
    Ok(())
}
