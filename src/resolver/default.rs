//! Built-in document used when no candidate in the library is usable.

use super::ResolutionKey;
use crate::loader::TemplateDocument;
use crate::loader::document::{CONTENT_KEY, META_KEY, TEMPLATE_KEY};
use crate::value::{Map, Value};

const BUILT_IN_VERSION: &str = "1.0.0";
const BUILT_IN_STATUS: &str = "built-in";

const BUILT_IN_BODY: &str = "\
## Summary
{{ design.description | default('No description provided.') }}
{% if design.dimensions %}
## Dimensions
{{ design.dimensions.width || '?' }} x {{ design.dimensions.height || '?' }}
{% endif %}{% if project.name %}
## Project
{{ project.name }}{% if project.tech_stack %} ({{ project.tech_stack | join }}){% endif %}
{% endif %}{% if calculated.complexity %}
## Estimate
Complexity: {{ calculated.complexity }}
{% if calculated.confidence %}Confidence: {{ calculated.confidence | multiply }}%
{% endif %}{% endif %}{% section notes %}
## Notes
Generated from the built-in default template.
{% endsection %}";

/// Minimal document parameterized only by the resolution key.
#[must_use]
pub fn built_in_document(key: &ResolutionKey) -> TemplateDocument {
    let mut meta = Map::new();
    meta.insert("platform".into(), Value::from(key.platform.as_str()));
    meta.insert("document_type".into(), Value::from(key.document_type.as_str()));
    meta.insert("tech_stack".into(), Value::from(key.tech_stack.as_str()));
    meta.insert("version".into(), Value::from(BUILT_IN_VERSION));
    meta.insert("status".into(), Value::from(BUILT_IN_STATUS));

    let heading = format!(
        "# {{{{ design.component_name || 'Untitled component' }}}}\n\n_{} {} for {}_\n\n",
        display_or(&key.document_type, "document"),
        display_or(&key.platform, "any platform"),
        display_or(&key.tech_stack, "any tech stack"),
    );

    let mut template = Map::new();
    template.insert(CONTENT_KEY.into(), Value::String(heading + BUILT_IN_BODY));

    let mut tree = Map::new();
    tree.insert(META_KEY.into(), Value::Map(meta));
    tree.insert(TEMPLATE_KEY.into(), Value::Map(template));
    TemplateDocument::from_tree(tree)
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
