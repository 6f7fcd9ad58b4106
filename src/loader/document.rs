//! Parsed template documents and their metadata view.

use serde::Serialize;

use super::parser::{ParseFailure, parse_document};
use crate::value::{Map, Value};

/// Key of the metadata block.
pub const META_KEY: &str = "meta";
/// Key of the renderable body.
pub const TEMPLATE_KEY: &str = "template";
/// Key of a flat content string, either under `template` or at the top level.
pub const CONTENT_KEY: &str = "content";
/// Key of document-level named values substituted as `${name}`.
pub const VARIABLES_KEY: &str = "variables";

/// The parsed tree of one template file.
///
/// Documents are never mutated after parsing; inheritance produces a new
/// document from merged trees instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateDocument {
    tree: Map,
}

impl TemplateDocument {
    /// Parse document text.
    pub fn parse(source: &str) -> Result<Self, ParseFailure> {
        parse_document(source).map(Self::from_tree)
    }

    #[must_use]
    pub fn from_tree(tree: Map) -> Self {
        Self {
            tree,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &Map {
        &self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> Map {
        self.tree
    }

    /// Typed view of the `meta` block. Missing fields are `None`.
    #[must_use]
    pub fn meta(&self) -> TemplateMeta {
        TemplateMeta::from_value(self.tree.get(META_KEY))
    }

    #[must_use]
    pub fn has_meta(&self) -> bool {
        self.tree.get(META_KEY).and_then(Value::as_map).is_some_and(|meta| !meta.is_empty())
    }

    /// The `template` value, whatever its shape.
    #[must_use]
    pub fn template(&self) -> Option<&Value> {
        self.tree.get(TEMPLATE_KEY).filter(|value| !value.is_null())
    }

    /// The single flat content string, if the document exposes one.
    ///
    /// That is a string `template`, a `template` map whose only entry is a string
    /// `content`, or a top-level string `content` when there is no `template`.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self.template() {
            Some(Value::String(content)) => Some(content),
            Some(Value::Map(map)) if map.len() == 1 => map.get(CONTENT_KEY).and_then(Value::as_str),
            Some(_) => None,
            None => self.tree.get(CONTENT_KEY).and_then(Value::as_str),
        }
    }

    /// Document-level variables declared under `variables`.
    #[must_use]
    pub fn variables(&self) -> Option<&Map> {
        self.tree.get(VARIABLES_KEY).and_then(Value::as_map)
    }

    /// Whether the document carries a non-empty `template` or `content`.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.template().is_some_and(Value::is_truthy)
            || self.tree.get(CONTENT_KEY).is_some_and(Value::is_truthy)
    }

    /// Top-level keys, in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tree.keys().map(String::as_str)
    }
}

/// Identifying metadata of a template document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateMeta {
    pub platform: Option<String>,
    pub document_type: Option<String>,
    pub tech_stack: Option<String>,
    pub version: Option<String>,
    pub inherits_from: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TemplateMeta {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(map) = value.and_then(Value::as_map) else {
            return Self::default();
        };

        Self {
            platform: field(map, &["platform"]),
            document_type: field(map, &["document_type", "documentType", "type"]),
            tech_stack: field(map, &["tech_stack", "techStack"]),
            version: field(map, &["version"]),
            inherits_from: field(map, &["inherits_from", "inheritsFrom", "extends"]),
            status: field(map, &["status"]),
            name: field(map, &["name"]),
            description: field(map, &["description"]),
        }
    }

    /// Whether any identifying field is present.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.platform.is_some() || self.document_type.is_some() || self.tech_stack.is_some()
    }
}

/// First non-blank scalar among the given aliases, as display text.
fn field(map: &Map, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| map.get(*alias))
        .find(|value| matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)))
        .map(ToString::to_string)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
