//! The template language: expressions, block tags and rendering.
//!
//! # Syntax
//!
//! - Output: `{{ design.component_name | uppercase }}`
//! - Comments: `{# not rendered #}`
//! - Conditionals: `{% if calculated.confidence %}...{% elif ... %}...{% else %}...{% endif %}`
//! - Loops: `{% for item in design.variants %}{{ item.name }}{% else %}none{% endfor %}`
//! - Sections: `{% section notes %}default body{% endsection %}`
//! - Document variables: `${summary}`, from the document's `variables` map
//! - Literal fences: ```` ```literal ```` blocks are emitted without rendering
//!
//! A `-` inside a delimiter (`{%-`, `-%}`, `{{-`, `-}}`) trims the whitespace
//! on that side.
//!
//! # Loops
//!
//! Inside a loop over a list, the loop variable and `this` name the current
//! element. `@index` (0-based), `@first` and `@last` are available, as is a
//! `loop` map with `index` (1-based), `index0`, `first`, `last` and `length`.
//!
//! Looping over a map binds each entry as `{key, value}` and sets `@key`;
//! `{% for k, v in map %}` binds the key and the value separately. Any other
//! value iterates zero times.
//!
//! # Sections
//!
//! A named section renders its default body unless a preference overrides it.
//! The `user`, `team` and `organization` namespaces are consulted in that order
//! for `sections.<name>`:
//!
//! | Preference | Effect |
//! |------------|--------|
//! | `false` | section removed |
//! | `true` | default body kept |
//! | a string | rendered in place of the body |
//!
//! # Truthiness
//!
//! Null, blank strings, empty lists, empty maps and `false` are falsy.
//! Every number is truthy, including `0`.

pub mod context;
pub mod expression;
pub mod filters;
pub mod renderer;
pub mod syntax;


pub use context::RenderContext;
pub use expression::{Expr, Scope, evaluate, evaluate_truthy};
pub use renderer::{RenderOutput, TemplateRenderer};
