//! Filters applied with `expr | name` or `expr | name(args)`.
//!
//! Filters never fail. A value a filter cannot handle passes through
//! unchanged, and an unknown filter name is the identity.

use std::fmt::Write;

use chrono::Local;

use crate::value::Value;

/// Every filter name [`apply`] recognizes.
pub const KNOWN_FILTERS: &[&str] = &[
    "lower",
    "lowercase",
    "upper",
    "uppercase",
    "capitalize",
    "trim",
    "join",
    "length",
    "replace",
    "date",
    "multiply",
    "default",
    "first",
    "last",
];

const DEFAULT_JOIN_SEPARATOR: &str = ", ";
const DEFAULT_REPLACEMENT: &str = "-";
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_FACTOR: f64 = 100.0;
const NOW_SENTINEL: &str = "now";

/// Applies the filter `name` to `value`.
pub fn apply(name: &str, value: Value, args: &[Value]) -> Value {
    match name {
        "lower" | "lowercase" => map_text(value, |text| text.to_lowercase()),
        "upper" | "uppercase" => map_text(value, |text| text.to_uppercase()),
        "capitalize" => map_text(value, capitalize),
        "trim" => map_text(value, |text| text.trim().to_string()),
        "join" => join(value, args.first()),
        "length" => length(&value),
        "replace" => replace(value, args),
        "date" => date(value, args.first()),
        "multiply" => multiply(value, args.first()),
        "default" => {
            if value.is_truthy() {
                value
            } else {
                args.first().cloned().unwrap_or_default()
            }
        }
        "first" => first_or_last(value, true),
        "last" => first_or_last(value, false),
        unknown => {
            match suggest(unknown) {
                Some(suggestion) => {
                    tracing::debug!("Unknown filter '{}', did you mean '{}'?", unknown, suggestion);
                }
                None => tracing::debug!("Unknown filter '{}', value passed through", unknown),
            }
            value
        }
    }
}

/// Closest known filter name, if any is within a small edit distance.
#[must_use]
pub fn suggest(name: &str) -> Option<&'static str> {
    KNOWN_FILTERS
        .iter()
        .map(|known| (strsim::levenshtein(name, known), *known))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, known)| known)
}

fn map_text(value: Value, transform: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(text) => Value::String(transform(&text)),
        other => Value::String(transform(&other.to_string())),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join(value: Value, separator: Option<&Value>) -> Value {
    let Value::List(items) = value else {
        return value;
    };
    let separator = separator.map_or_else(|| DEFAULT_JOIN_SEPARATOR.to_string(), ToString::to_string);
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    Value::String(parts.join(&separator))
}

fn length(value: &Value) -> Value {
    let len = match value {
        Value::Null => 0,
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::String(text) => text.chars().count(),
        other => other.to_string().chars().count(),
    };
    Value::from(len)
}

fn replace(value: Value, args: &[Value]) -> Value {
    let text = match value {
        Value::Null => return Value::Null,
        Value::String(text) => text,
        other => other.to_string(),
    };
    let replaced = match args {
        [from, to, ..] => text.replace(&from.to_string(), &to.to_string()),
        [to] => text.replace(' ', &to.to_string()),
        [] => text.replace(' ', DEFAULT_REPLACEMENT),
    };
    Value::String(replaced)
}

fn date(value: Value, format: Option<&Value>) -> Value {
    let is_now = value.as_str().is_some_and(|text| text.trim().eq_ignore_ascii_case(NOW_SENTINEL));
    if !is_now {
        return value;
    }

    let format = format.map_or_else(|| DEFAULT_DATE_FORMAT.to_string(), ToString::to_string);
    // Formatting an invalid strftime pattern reports an error instead of text.
    let mut formatted = String::new();
    match write!(formatted, "{}", Local::now().format(&format)) {
        Ok(()) => Value::String(formatted),
        Err(_) => {
            tracing::warn!("Invalid date format '{}' in date filter", format);
            value
        }
    }
}

fn multiply(value: Value, factor: Option<&Value>) -> Value {
    let factor = factor.and_then(Value::as_f64).unwrap_or(DEFAULT_FACTOR);
    match value.as_f64() {
        Some(n) => Value::Number((n * factor).round()),
        None => value,
    }
}

fn first_or_last(value: Value, first: bool) -> Value {
    match value {
        Value::List(mut items) => {
            if items.is_empty() {
                Value::Null
            } else if first {
                items.swap_remove(0)
            } else {
                items.pop().unwrap_or_default()
            }
        }
        Value::String(text) => {
            let picked = if first { text.chars().next() } else { text.chars().next_back() };
            picked.map_or(Value::Null, |c| Value::String(c.to_string()))
        }
        other => other,
    }
}
