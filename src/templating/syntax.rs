//! Template text → node tree.
//!
//! Text is first split into segments (`{{ }}` outputs, `{% %}` tags, plain
//! text; `{# #}` comments are dropped), then block tags are matched into a
//! tree so that every construct is evaluated inside its enclosing block.
//!
//! Anything malformed (an unclosed delimiter, a bad expression, an unknown or
//! stray tag, a block without its end tag) is kept as literal text.

use super::expression::{Expr, ForHeader};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    Output {
        expr: &'a str,
        raw: &'a str,
    },
    Tag {
        body: &'a str,
        raw: &'a str,
    },
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'a> {
    Text(&'a str),
    Output(Expr),
    If {
        branches: Vec<(Expr, Vec<Node<'a>>)>,
        otherwise: Option<Vec<Node<'a>>>,
    },
    For {
        header: ForHeader,
        body: Vec<Node<'a>>,
        empty: Option<Vec<Node<'a>>>,
    },
    Section {
        name: &'a str,
        body: Vec<Node<'a>>,
    },
}

/// Parse template text into nodes.
#[must_use]
pub fn parse_template(source: &str) -> Vec<Node<'_>> {
    let mut builder = TreeBuilder {
        segments: lex(source),
        pos: 0,
    };
    let (nodes, _) = builder.parse_nodes(&[]);
    nodes
}

fn lex(source: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    loop {
        let Some(start) = find_open(rest) else {
            push_text(&mut segments, rest, trim_next, false);
            return segments;
        };

        let close = match &rest[start..start + 2] {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find(close) else {
            tracing::warn!("Unclosed '{}' in template, keeping it as text", &rest[start..start + 2]);
            push_text(&mut segments, &rest[..start + 2], trim_next, false);
            trim_next = false;
            rest = after_open;
            continue;
        };

        let inner = &after_open[..end];
        let trim_before = inner.starts_with('-');
        let trim_after = inner.len() > usize::from(trim_before) && inner.ends_with('-');
        push_text(&mut segments, &rest[..start], trim_next, trim_before);

        let body = inner.strip_prefix('-').unwrap_or(inner);
        let body = if trim_after { &body[..body.len() - 1] } else { body };
        let body = body.trim();
        let raw = &rest[start..start + 2 + end + 2];

        match close {
            "}}" => segments.push(Segment::Output {
                expr: body,
                raw,
            }),
            "%}" => segments.push(Segment::Tag {
                body,
                raw,
            }),
            _ => {}
        }

        trim_next = trim_after;
        rest = &after_open[end + 2..];
    }
}

fn find_open(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#'))
}

fn push_text<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    let text = if trim_end { text.trim_end() } else { text };
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}

/// A tag that ended a nested block.
struct Terminator<'a> {
    keyword: &'a str,
    argument: &'a str,
}

struct TreeBuilder<'a> {
    segments: Vec<Segment<'a>>,
    pos: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Parse nodes until one of `terminators` (consumed and returned) or the end.
    fn parse_nodes(&mut self, terminators: &[&str]) -> (Vec<Node<'a>>, Option<Terminator<'a>>) {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.get(self.pos).cloned() {
            self.pos += 1;
            match segment {
                Segment::Text(text) => nodes.push(Node::Text(text)),
                Segment::Output {
                    expr,
                    raw,
                } => match Expr::parse(expr) {
                    Ok(expr) => nodes.push(Node::Output(expr)),
                    Err(e) => {
                        tracing::warn!("{}; keeping '{}' as text", e, raw);
                        nodes.push(Node::Text(raw));
                    }
                },
                Segment::Tag {
                    body,
                    raw,
                } => {
                    let (keyword, argument) = split_tag(body);
                    if terminators.contains(&keyword) {
                        return (
                            nodes,
                            Some(Terminator {
                                keyword,
                                argument,
                            }),
                        );
                    }
                    let node = match keyword {
                        "if" => self.parse_if(argument, raw),
                        "for" => self.parse_for(argument, raw),
                        "section" => self.parse_section(argument, raw),
                        _ => {
                            tracing::warn!("Unexpected tag '{}' in template, keeping it as text", raw);
                            None
                        }
                    };
                    nodes.push(node.unwrap_or(Node::Text(raw)));
                }
            }
        }

        (nodes, None)
    }

    /// Runs `parse` after an opening tag; on failure rewinds to just after the tag.
    fn block<T>(&mut self, raw: &str, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.pos;
        let parsed = parse(self);
        if parsed.is_none() {
            tracing::warn!("Unclosed block '{}' in template, keeping it as text", raw);
            self.pos = checkpoint;
        }
        parsed
    }

    fn parse_if(&mut self, argument: &str, raw: &str) -> Option<Node<'a>> {
        let condition = parse_logged(argument, raw)?;
        self.block(raw, |builder| {
            let mut branches = Vec::new();
            let mut condition = condition;
            loop {
                let (body, terminator) = builder.parse_nodes(&["elif", "else", "endif"]);
                branches.push((condition, body));
                let terminator = terminator?;
                match terminator.keyword {
                    "elif" => {
                        // A broken elif condition never matches.
                        condition = parse_logged(terminator.argument, terminator.argument)
                            .unwrap_or(Expr::Literal(Value::Null));
                    }
                    "else" => {
                        let (otherwise, end) = builder.parse_nodes(&["endif"]);
                        end?;
                        return Some(Node::If {
                            branches,
                            otherwise: Some(otherwise),
                        });
                    }
                    _ => {
                        return Some(Node::If {
                            branches,
                            otherwise: None,
                        });
                    }
                }
            }
        })
    }

    fn parse_for(&mut self, argument: &str, raw: &str) -> Option<Node<'a>> {
        let header = match ForHeader::parse(argument) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!("{}; keeping '{}' as text", e, raw);
                return None;
            }
        };
        self.block(raw, |builder| {
            let (body, terminator) = builder.parse_nodes(&["else", "endfor"]);
            let empty = match terminator?.keyword {
                "else" => {
                    let (empty, end) = builder.parse_nodes(&["endfor"]);
                    end?;
                    Some(empty)
                }
                _ => None,
            };
            Some(Node::For {
                header,
                body,
                empty,
            })
        })
    }

    fn parse_section(&mut self, argument: &'a str, raw: &str) -> Option<Node<'a>> {
        let name = argument.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            tracing::warn!("Invalid section name in '{}', keeping it as text", raw);
            return None;
        }
        self.block(raw, |builder| {
            let (body, terminator) = builder.parse_nodes(&["endsection"]);
            terminator?;
            Some(Node::Section {
                name,
                body,
            })
        })
    }
}

fn split_tag(body: &str) -> (&str, &str) {
    match body.split_once(char::is_whitespace) {
        Some((keyword, argument)) => (keyword, argument.trim()),
        None => (body, ""),
    }
}

fn parse_logged(expression: &str, raw: &str) -> Option<Expr> {
    match Expr::parse(expression) {
        Ok(expr) => Some(expr),
        Err(e) => {
            tracing::warn!("{}; keeping '{}' as text", e, raw);
            None
        }
    }
}
