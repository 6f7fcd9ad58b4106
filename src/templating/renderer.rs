//! Template renderer.
//!
//! Renders resolved templates against a [`RenderContext`]. A document with a
//! single flat content string renders to text; a document whose `template` is
//! a map renders leaf by leaf into a structured value.
//!
//! Each string goes through the same pipeline:
//!
//! 1. ```` ```literal ```` fences are swapped for placeholders
//! 2. the text is parsed into a node tree (blocks, loops, sections, outputs)
//! 3. the tree is evaluated against the context
//! 4. document variables (`${name}`) are substituted
//! 5. literal fences are restored as plain code fences
//!
//! Rendering never fails. Malformed constructs are left in the output as
//! written and logged.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::context::RenderContext;
use super::expression::{ForHeader, Scope};
use super::syntax::{Node, parse_template};
use crate::constants::{MAX_RENDER_DEPTH, PREFERENCE_NAMESPACES, SECTIONS_KEY};
use crate::loader::TemplateDocument;
use crate::resolver::EffectiveTemplate;
use crate::value::{Map, Value};

/// Result of rendering a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderOutput {
    Text(String),
    Structured(Value),
}

impl RenderOutput {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderOutput::Text(text) => Some(text),
            RenderOutput::Structured(_) => None,
        }
    }

    #[must_use]
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            RenderOutput::Text(_) => None,
            RenderOutput::Structured(value) => Some(value),
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            RenderOutput::Text(text) => Value::String(text),
            RenderOutput::Structured(value) => value,
        }
    }
}

impl fmt::Display for RenderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderOutput::Text(text) => f.write_str(text),
            RenderOutput::Structured(value) => {
                let json = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Renders templates with the built-in expression language.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    /// Whether ```` ```literal ```` fences are protected from rendering.
    literal_blocks: bool,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TemplateRenderer {
    #[must_use]
    pub fn new(literal_blocks: bool) -> Self {
        Self {
            literal_blocks,
        }
    }

    /// Render a resolved template.
    #[must_use]
    pub fn render(&self, effective: &EffectiveTemplate, context: &RenderContext) -> RenderOutput {
        self.render_document(effective.document(), context)
    }

    /// Render a document: flat content to text, a template map structurally,
    /// anything else to a diagnostic naming the available keys.
    #[must_use]
    pub fn render_document(&self, document: &TemplateDocument, context: &RenderContext) -> RenderOutput {
        let variables = self.prepare_variables(document.variables(), context);

        if let Some(content) = document.content() {
            return RenderOutput::Text(self.render_str_with_variables(content, context, &variables));
        }

        match document.template() {
            Some(Value::Map(template)) => {
                let rendered = template
                    .iter()
                    .map(|(key, value)| (key.clone(), self.render_value(value, context, &variables)))
                    .collect();
                RenderOutput::Structured(Value::Map(rendered))
            }
            _ => {
                let keys: Vec<&str> = document.keys().collect();
                tracing::warn!("Template has no renderable content; top-level keys: {:?}", keys);
                RenderOutput::Text(unavailable_placeholder(&keys))
            }
        }
    }

    /// Render a template string without document variables.
    #[must_use]
    pub fn render_str(&self, template: &str, context: &RenderContext) -> String {
        self.render_str_with_variables(template, context, &Map::new())
    }

    /// Render a template string, substituting `${name}` from `variables` last.
    #[must_use]
    pub fn render_str_with_variables(&self, template: &str, context: &RenderContext, variables: &Map) -> String {
        let (protected, placeholders) = if self.literal_blocks {
            self.protect_literal_blocks(template)
        } else {
            (template.to_string(), HashMap::new())
        };

        let rendered = self.render_text(&protected, context.as_value(), 0);
        let substituted = substitute_variables(&rendered, variables);

        if placeholders.is_empty() { substituted } else { self.restore_literal_blocks(&substituted, placeholders) }
    }

    /// Document variables are rendered against the context before use.
    fn prepare_variables(&self, variables: Option<&Map>, context: &RenderContext) -> Map {
        let Some(variables) = variables else {
            return Map::new();
        };
        variables
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(text) => Value::String(self.render_text(text, context.as_value(), 0)),
                    other => other.clone(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn render_value(&self, value: &Value, context: &RenderContext, variables: &Map) -> Value {
        match value {
            Value::String(text) => Value::String(self.render_str_with_variables(text, context, variables)),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => {
                            Value::String(self.render_str_with_variables(text, context, variables))
                        }
                        other => other.clone(),
                    })
                    .collect(),
            ),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.render_value(value, context, variables)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn render_text(&self, text: &str, context: &Value, depth: usize) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        let nodes = parse_template(text);
        let mut out = String::with_capacity(text.len());
        self.render_nodes(&nodes, &Scope::new(context), depth, &mut out);
        out
    }

    fn render_nodes(&self, nodes: &[Node<'_>], scope: &Scope<'_>, depth: usize, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => out.push_str(&expr.eval(scope).to_string()),
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let taken = branches.iter().find(|(condition, _)| condition.eval(scope).is_truthy());
                    match (taken, otherwise) {
                        (Some((_, body)), _) | (None, Some(body)) => self.render_nodes(body, scope, depth, out),
                        (None, None) => {}
                    }
                }
                Node::For {
                    header,
                    body,
                    empty,
                } => {
                    let iterations = self.render_loop(header, body, scope, depth, out);
                    if iterations == 0 {
                        if let Some(empty) = empty {
                            self.render_nodes(empty, scope, depth, out);
                        }
                    }
                }
                Node::Section {
                    name,
                    body,
                } => self.render_section(name, body, scope, depth, out),
            }
        }
    }

    /// Renders the loop body once per element; returns the iteration count.
    fn render_loop(
        &self,
        header: &ForHeader,
        body: &[Node<'_>],
        scope: &Scope<'_>,
        depth: usize,
        out: &mut String,
    ) -> usize {
        let entries: Vec<(Value, Value, Option<String>)> = match header.iterable.eval(scope) {
            Value::List(items) => {
                items.into_iter().enumerate().map(|(i, item)| (Value::from(i), item, None)).collect()
            }
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let mut entry = Map::new();
                    entry.insert("key".into(), Value::from(key.as_str()));
                    entry.insert("value".into(), value.clone());
                    if header.second.is_some() {
                        (Value::from(key.as_str()), value, Some(key))
                    } else {
                        (Value::from(key.as_str()), Value::Map(entry), Some(key))
                    }
                })
                .collect(),
            other => {
                if !other.is_null() {
                    tracing::debug!("Loop over a {} value renders nothing", other.kind());
                }
                Vec::new()
            }
        };

        let length = entries.len();
        for (index, (first_binding, item, key)) in entries.into_iter().enumerate() {
            let mut locals = Map::new();
            match &header.second {
                Some(second) => {
                    locals.insert(header.first.clone(), first_binding);
                    locals.insert(second.clone(), item.clone());
                }
                None => {
                    locals.insert(header.first.clone(), item.clone());
                }
            }
            locals.insert("this".into(), item);
            locals.insert("@index".into(), Value::from(index));
            locals.insert("@first".into(), Value::Bool(index == 0));
            locals.insert("@last".into(), Value::Bool(index + 1 == length));
            if let Some(key) = key {
                locals.insert("@key".into(), Value::String(key));
            }

            let mut loop_info = Map::new();
            loop_info.insert("index".into(), Value::from(index + 1));
            loop_info.insert("index0".into(), Value::from(index));
            loop_info.insert("first".into(), Value::Bool(index == 0));
            loop_info.insert("last".into(), Value::Bool(index + 1 == length));
            loop_info.insert("length".into(), Value::from(length));
            locals.insert("loop".into(), Value::Map(loop_info));

            self.render_nodes(body, &scope.child(locals), depth, out);
        }
        length
    }

    /// `{% section name %}`: the first preference namespace that sets
    /// `sections.<name>` decides; `false` removes the section, a string
    /// replaces its body and `true` keeps the default.
    fn render_section(&self, name: &str, body: &[Node<'_>], scope: &Scope<'_>, depth: usize, out: &mut String) {
        let preference = PREFERENCE_NAMESPACES.iter().find_map(|namespace| {
            scope
                .context()
                .get_path(&[*namespace, SECTIONS_KEY, name])
                .filter(|value| matches!(value, Value::Bool(_) | Value::String(_)))
                .map(|value| (*namespace, value))
        });

        match preference {
            Some((namespace, Value::Bool(false))) => {
                tracing::debug!("Section '{}' removed by {} preferences", name, namespace);
            }
            Some((namespace, Value::String(replacement))) => {
                if depth >= MAX_RENDER_DEPTH {
                    tracing::warn!("Section '{}' nested deeper than {} levels, not expanded", name, MAX_RENDER_DEPTH);
                    out.push_str(replacement);
                } else {
                    tracing::debug!("Section '{}' replaced by {} preferences", name, namespace);
                    out.push_str(&self.render_text(replacement, scope.context(), depth + 1));
                }
            }
            _ => self.render_nodes(body, scope, depth, out),
        }
    }

    /// Swap ```` ```literal ```` fences for placeholders so their content is
    /// never rendered.
    ///
    /// Returns the protected text and the placeholder → original content map.
    /// An unclosed fence is left in place as regular content.
    pub(crate) fn protect_literal_blocks(&self, content: &str) -> (String, HashMap<String, String>) {
        let mut placeholders = HashMap::new();
        let mut result = String::with_capacity(content.len());
        let mut in_literal_fence = false;
        let mut current_block = String::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if !in_literal_fence && trimmed.starts_with("```literal") {
                in_literal_fence = true;
                current_block.clear();
            } else if in_literal_fence && trimmed.starts_with("```") {
                in_literal_fence = false;
                let placeholder_id = format!("__TPLFORGE_LITERAL_BLOCK_{}__", placeholders.len());
                tracing::debug!("Protected literal block {} ({} bytes)", placeholder_id, current_block.len());
                result.push_str(&placeholder_id);
                result.push('\n');
                placeholders.insert(placeholder_id, std::mem::take(&mut current_block));
            } else if in_literal_fence {
                if !current_block.is_empty() {
                    current_block.push('\n');
                }
                current_block.push_str(line);
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        if in_literal_fence {
            tracing::warn!("Unclosed literal fence, rendering it as regular content");
            result.push_str("```literal\n");
            result.push_str(&current_block);
            result.push('\n');
        }

        if !content.ends_with('\n') && result.ends_with('\n') {
            result.pop();
        }

        (result, placeholders)
    }

    /// Put protected blocks back, wrapped in plain code fences.
    pub(crate) fn restore_literal_blocks(&self, content: &str, placeholders: HashMap<String, String>) -> String {
        placeholders.into_iter().fold(content.to_string(), |result, (placeholder_id, original)| {
            result.replace(&placeholder_id, &format!("```\n{original}\n```"))
        })
    }
}

/// Replace `${name}` (or `${name.path}`) with document variables. Unknown
/// names are left as written.
fn substitute_variables(text: &str, variables: &Map) -> String {
    if variables.is_empty() || !text.contains("${") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        let mut segments = name.split('.');
        let value = segments
            .next()
            .and_then(|first| variables.get(first))
            .and_then(|head| head.get_path(&segments.collect::<Vec<_>>()));
        match value {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn unavailable_placeholder(keys: &[&str]) -> String {
    let keys = if keys.is_empty() { "(none)".to_string() } else { keys.join(", ") };
    format!("[template unavailable: no content string or template map; available keys: {keys}]")
}
