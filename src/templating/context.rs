//! Caller-supplied render context.
//!
//! A [`RenderContext`] is a map of namespaces that expressions address by their
//! first path segment:
//!
//! | Namespace | Contents |
//! |-----------|----------|
//! | `design` | the subject of the document: component name, dimensions, identifiers, dependencies |
//! | `project` | project name, tech stack list, repository |
//! | `calculated` | computed metrics: complexity, estimated effort, confidence, risk factors |
//! | `organization`, `team`, `user` | preference maps, including `sections` overrides |
//!
//! Any namespace may be missing or partially populated; missing leaves evaluate
//! to null. The engine only borrows the context and never caches it.

use serde::Serialize;

use crate::core::{TemplateError, TemplateResult};
use crate::value::{Map, Value};

/// Named namespaces available to template expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    root: Value,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            root: Value::empty_map(),
        }
    }
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style namespace insertion.
    #[must_use]
    pub fn with(mut self, namespace: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(namespace, value);
        self
    }

    /// Sets a namespace, replacing any previous value.
    pub fn insert(&mut self, namespace: impl Into<String>, value: impl Into<Value>) {
        if let Value::Map(namespaces) = &mut self.root {
            namespaces.insert(namespace.into(), value.into());
        }
    }

    /// Context from a JSON object.
    pub fn from_json(value: serde_json::Value) -> TemplateResult<Self> {
        Self::from_value(Value::from(value))
    }

    pub fn from_json_str(text: &str) -> TemplateResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| TemplateError::Context {
            message: format!("invalid JSON: {e}"),
        })?;
        Self::from_json(value)
    }

    pub fn from_yaml_str(text: &str) -> TemplateResult<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| TemplateError::Context {
            message: format!("invalid YAML: {e}"),
        })?;
        Self::from_value(value)
    }

    /// Context from a map value. Null is accepted as an empty context.
    pub fn from_value(value: Value) -> TemplateResult<Self> {
        match value {
            Value::Map(_) => Ok(Self {
                root: value,
            }),
            Value::Null => Ok(Self::default()),
            other => Err(TemplateError::Context {
                message: format!("expected a map of namespaces, found {}", other.kind()),
            }),
        }
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    #[must_use]
    pub fn namespaces(&self) -> Option<&Map> {
        self.root.as_map()
    }

    /// The whole context as one map value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}
