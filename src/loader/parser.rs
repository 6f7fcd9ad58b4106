//! Parser for the line-oriented template document format.
//!
//! Documents are indentation-structured `key: value` lines:
//!
//! ```text
//! meta:
//!   platform: jira
//!   version: 1.2.0
//! template:
//!   labels: [frontend, "design system"]
//!   content: |
//!     # {{ design.component_name }}
//!     Implement the component.
//! ```
//!
//! Nesting uses 2-space units. Comment lines, fenced code delimiters and `---`
//! markers are ignored between keys but kept verbatim inside `|` blocks.

use std::fmt;

use crate::value::{Map, Value};

/// Position and reason of a grammar violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    pub message: String,
}

impl ParseFailure {
    fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseFailure {}

/// Parse document text into its top-level map.
///
/// Parsing is pure: the same input always yields a structurally equal tree.
pub fn parse_document(source: &str) -> Result<Map, ParseFailure> {
    let mut parser = LineParser {
        lines: source.lines().collect(),
        pos: 0,
    };
    parser.parse_map(0)
}

#[derive(Debug, Clone, Copy)]
struct StructuralLine<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

struct LineParser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineParser<'a> {
    /// Returns the next line that carries structure, skipping blanks, comments,
    /// fences and document markers. Skipped lines are consumed.
    fn peek_structural(&mut self) -> Result<Option<StructuralLine<'a>>, ParseFailure> {
        while self.pos < self.lines.len() {
            let raw = self.lines[self.pos];
            let trimmed = raw.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("```")
                || trimmed == "---"
            {
                self.pos += 1;
                continue;
            }

            let number = self.pos + 1;
            let leading = &raw[..raw.len() - raw.trim_start().len()];
            if let Some(tab) = leading.find('\t') {
                return Err(ParseFailure::new(number, tab + 1, "tabs are not allowed in indentation"));
            }
            let indent = leading.len();
            if indent % 2 != 0 {
                return Err(ParseFailure::new(
                    number,
                    indent + 1,
                    "indentation must be a multiple of 2 spaces",
                ));
            }
            return Ok(Some(StructuralLine {
                number,
                indent,
                text: raw.trim(),
            }));
        }
        Ok(None)
    }

    fn parse_map(&mut self, indent: usize) -> Result<Map, ParseFailure> {
        let mut map = Map::new();

        while let Some(line) = self.peek_structural()? {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseFailure::new(line.number, line.indent + 1, "unexpected indentation"));
            }
            if is_list_item(line.text) {
                return Err(ParseFailure::new(
                    line.number,
                    line.indent + 1,
                    "list item where a key was expected",
                ));
            }

            self.pos += 1;
            let (key, rest) = split_key(&line)?;
            let value = match rest {
                "|" | "|-" | "|+" => Value::String(self.collect_block(indent).join("\n")),
                ">" | ">-" => Value::String(fold_lines(&self.collect_block(indent))),
                "" => self.parse_nested(indent)?,
                scalar => parse_scalar(scalar),
            };

            if map.insert(key.clone(), value).is_some() {
                tracing::debug!("Duplicate key '{}' on line {}, keeping the later value", key, line.number);
            }
        }

        Ok(map)
    }

    /// Value of a key whose inline value is empty: a nested map, a `- item`
    /// list, or null when nothing deeper follows.
    fn parse_nested(&mut self, indent: usize) -> Result<Value, ParseFailure> {
        match self.peek_structural()? {
            Some(next) if is_list_item(next.text) && next.indent >= indent => {
                Ok(Value::List(self.parse_list(next.indent)?))
            }
            Some(next) if next.indent > indent => Ok(Value::Map(self.parse_map(next.indent)?)),
            _ => Ok(Value::Null),
        }
    }

    fn parse_list(&mut self, indent: usize) -> Result<Vec<Value>, ParseFailure> {
        let mut items = Vec::new();

        while let Some(line) = self.peek_structural()? {
            if line.indent < indent || (line.indent == indent && !is_list_item(line.text)) {
                break;
            }
            if line.indent > indent {
                return Err(ParseFailure::new(
                    line.number,
                    line.indent + 1,
                    "nested structures inside list items are not supported",
                ));
            }

            self.pos += 1;
            items.push(parse_scalar(line.text[1..].trim()));
        }

        Ok(items)
    }

    /// Collects the raw lines of a literal block opened by a key at `parent_indent`.
    ///
    /// The block ends at the first non-blank line indented at or below the key.
    /// Common leading indentation and trailing blank lines are removed.
    fn collect_block(&mut self, parent_indent: usize) -> Vec<String> {
        let mut raw_lines: Vec<&str> = Vec::new();

        while self.pos < self.lines.len() {
            let raw = self.lines[self.pos];
            if raw.trim().is_empty() {
                raw_lines.push("");
                self.pos += 1;
                continue;
            }
            if leading_width(raw) <= parent_indent {
                break;
            }
            raw_lines.push(raw);
            self.pos += 1;
        }

        while raw_lines.last() == Some(&"") {
            raw_lines.pop();
        }

        let base = raw_lines
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| leading_width(line))
            .min()
            .unwrap_or(0);

        raw_lines
            .into_iter()
            .map(|line| line.get(base..).unwrap_or("").trim_end().to_string())
            .collect()
    }
}

fn leading_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn is_list_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Folded (`>`) blocks join consecutive lines with spaces; blank lines become
/// paragraph breaks.
fn fold_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for line in lines {
        if line.is_empty() {
            out.push('\n');
            pending_space = false;
            continue;
        }
        if pending_space {
            out.push(' ');
        }
        out.push_str(line.trim());
        pending_space = true;
    }
    out
}

/// Splits `key: value` at the first colon followed by a space or line end.
fn split_key<'t>(line: &StructuralLine<'t>) -> Result<(String, &'t str), ParseFailure> {
    let text = line.text;
    let bytes = text.as_bytes();

    let colon = (0..bytes.len()).find(|&i| {
        bytes[i] == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ')
    });

    let Some(colon) = colon else {
        return Err(ParseFailure::new(line.number, line.indent + 1, "expected `key: value`"));
    };

    let key = unquote(text[..colon].trim());
    if key.is_empty() {
        return Err(ParseFailure::new(line.number, line.indent + 1, "empty key"));
    }

    Ok((key.to_string(), text[colon + 1..].trim()))
}

fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Coerces an inline value.
fn parse_scalar(raw: &str) -> Value {
    let text = raw.trim();
    let unquoted = unquote(text);
    if unquoted.len() != text.len() {
        return Value::String(unquoted.to_string());
    }

    if text.starts_with('[') && text.ends_with(']') {
        return Value::List(split_inline_list(&text[1..text.len() - 1]));
    }

    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "~" => Value::Null,
        _ if looks_numeric(text) => text.parse::<f64>().map_or_else(|_| Value::String(text.to_string()), Value::Number),
        _ => Value::String(text.to_string()),
    }
}

/// `-?digits(.digits)?`
fn looks_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let valid_whole = !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit());
    match parts.next() {
        None => valid_whole,
        Some(frac) => valid_whole && !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// Items of a bracketed list are always strings.
fn split_inline_list(inner: &str) -> Vec<Value> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, ',') => {
                items.push(Value::String(unquote(current.trim()).to_string()));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    items.push(Value::String(unquote(current.trim()).to_string()));
    items
}
