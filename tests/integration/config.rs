//! Integration tests for engine configuration.

use anyhow::Result;
use tplforge::config::EngineConfig;
use tplforge::constants::{CONFIG_ENV, TEMPLATE_ROOT_ENV};
use tplforge::engine::TemplateEngine;
use tplforge::templating::RenderContext;

use crate::common::TestLibrary;

#[tokio::test]
async fn test_config_file_drives_resolution() -> Result<()> {
    let library = TestLibrary::new().await?;
    library.add_document("tech-stacks/generic/defaults.yml", "content: Generic\n").await?;
    library
        .add_document("platforms/jira/ticket.yml", "meta:\n  platform: jira\ncontent: |\n  ```literal\n  {{ raw }}\n  ```\n")
        .await?;

    let config_path = library.root().join("config.toml");
    tokio::fs::write(
        &config_path,
        format!(
            "template_root = '{}'\nextension = \"yml\"\ncustom_tech_stack = \"generic\"\nliteral_blocks = false\n",
            library.root().display()
        ),
    )
    .await?;

    let path = config_path.to_string_lossy().to_string();
    let config = EngineConfig::load_with_env(|name| (name == CONFIG_ENV).then(|| path.clone())).await?;
    assert_eq!(config.template_root, library.root());
    assert_eq!(config.extension, "yml");
    assert!(!config.literal_blocks);

    let mut engine = TemplateEngine::new(config);
    let context = RenderContext::new().with("raw", "rendered");

    let effective = engine.resolve("linear", "epic", "elm").await;
    assert_eq!(effective.metadata().location, "tech-stacks/generic/defaults.yml");

    // literal_blocks = false renders fenced content like any other text
    let output = engine.generate("jira", "ticket", "elm", &context).await;
    assert_eq!(output.as_text(), Some("```literal\nrendered\n```"));
    Ok(())
}

#[tokio::test]
async fn test_template_root_env_overrides_file() -> Result<()> {
    let library = TestLibrary::shipped().await?;
    let root = library.root().to_string_lossy().to_string();

    let config = EngineConfig::load_with_env(|name| match name {
        CONFIG_ENV => Some("/nonexistent/tplforge/config.toml".to_string()),
        TEMPLATE_ROOT_ENV => Some(root.clone()),
        _ => None,
    })
    .await?;
    assert_eq!(config.template_root, library.root());

    let mut engine = TemplateEngine::new(config);
    assert!(!engine.resolve("jira", "ticket", "react").await.is_synthesized());
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_file_is_an_error() -> Result<()> {
    let library = TestLibrary::new().await?;
    let config_path = library.root().join("config.toml");
    tokio::fs::write(&config_path, "max_inheritance_depth = 0\n").await?;

    let path = config_path.to_string_lossy().to_string();
    let err = EngineConfig::load_with_env(|name| (name == CONFIG_ENV).then(|| path.clone()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("max_inheritance_depth"), "{err:#}");
    Ok(())
}
