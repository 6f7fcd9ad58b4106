//! The expression language used inside `{{ }}` and block tags.
//!
//! Expressions are tokenized and parsed by recursive descent into an [`Expr`]
//! tree, then evaluated against a [`Scope`]. Evaluation never fails: missing
//! paths, non-numeric arithmetic and unknown filters all produce a value
//! (usually [`Value::Null`]).
//!
//! # Grammar
//!
//! From lowest to highest precedence:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `a \|\| b` | `a` if truthy, otherwise `b` |
//! | `a or b` | boolean or |
//! | `a and b`, `a && b` | boolean and |
//! | `not a`, `!a` | boolean negation |
//! | `a == b`, `!=`, `<`, `<=`, `>`, `>=` | comparison |
//! | `a + b`, `a - b` | addition, subtraction |
//! | `a * b`, `a / b` | multiplication (rounded), division (`x / 0 = 0`) |
//! | `-a` | numeric negation |
//! | `a \| name`, `a \| name(args)` | filter application |
//! | `'text'`, `42`, `true`, `null`, `(a)`, `a.b.c` | primaries |

use std::fmt;

use super::filters;
use crate::core::{TemplateError, TemplateResult};
use crate::value::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Pipe,
    OrOr,
    AndAnd,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Number(n) => write!(f, "{}", Value::Number(*n)),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Dot => f.write_str("'.'"),
            Token::Comma => f.write_str("','"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Pipe => f.write_str("'|'"),
            Token::OrOr => f.write_str("'||'"),
            Token::AndAnd => f.write_str("'&&'"),
            Token::Bang => f.write_str("'!'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::EqEq => f.write_str("'=='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '@'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '@'
}

fn tokenize(source: &str) -> TemplateResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        let (token, width) = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '.' => (Token::Dot, 1),
            ',' => (Token::Comma, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '|' if next == Some('|') => (Token::OrOr, 2),
            '|' => (Token::Pipe, 1),
            '&' if next == Some('&') => (Token::AndAnd, 2),
            '!' if next == Some('=') => (Token::NotEq, 2),
            '!' => (Token::Bang, 1),
            '=' if next == Some('=') => (Token::EqEq, 2),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '\'' | '"' => {
                let mut text = String::new();
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None => return Err(TemplateError::expression(source, "unterminated string literal")),
                        Some('\\') if j + 1 < chars.len() => {
                            text.push(chars[j + 1]);
                            j += 2;
                        }
                        Some(&ch) if ch == c => break,
                        Some(&ch) => {
                            text.push(ch);
                            j += 1;
                        }
                    }
                }
                (Token::Str(text), j + 1 - i)
            }
            c if c.is_ascii_digit() => {
                // Directly after a dot, digits are a list index segment.
                let index_segment = matches!(tokens.last(), Some(Token::Dot));
                let mut j = i;
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                if !index_segment
                    && j + 1 < chars.len()
                    && chars[j] == '.'
                    && chars[j + 1].is_ascii_digit()
                {
                    j += 1;
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                }
                let text: String = chars[i..j].iter().collect();
                let token = if index_segment {
                    Token::Ident(text)
                } else {
                    let number = text
                        .parse::<f64>()
                        .map_err(|_| TemplateError::expression(source, format!("invalid number '{text}'")))?;
                    Token::Number(number)
                };
                (token, j - i)
            }
            c if is_ident_start(c) => {
                let mut j = i;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                (Token::Ident(chars[i..j].iter().collect()), j - i)
            }
            other => {
                return Err(TemplateError::expression(source, format!("unexpected character '{other}'")));
            }
        };

        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean and fallback operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    /// `a || b`: the left value itself when truthy, otherwise the right value.
    Fallback,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Vec<String>),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Filter {
        input: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Parse a complete expression.
    pub fn parse(source: &str) -> TemplateResult<Self> {
        let mut parser = ExprParser::new(source)?;
        if parser.tokens.is_empty() {
            return Err(TemplateError::expression(source, "empty expression"));
        }
        let expr = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Evaluate against a scope. Never fails.
    #[must_use]
    pub fn eval(&self, scope: &Scope<'_>) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Path(segments) => scope.lookup(segments),
            Expr::Negate(inner) => inner.eval(scope).as_f64().map_or(Value::Null, |n| Value::Number(-n)),
            Expr::Not(inner) => Value::Bool(!inner.eval(scope).is_truthy()),
            Expr::Arithmetic {
                op,
                left,
                right,
            } => arithmetic(*op, &left.eval(scope), &right.eval(scope)),
            Expr::Compare {
                op,
                left,
                right,
            } => Value::Bool(compare(*op, &left.eval(scope), &right.eval(scope))),
            Expr::Logical {
                op,
                left,
                right,
            } => {
                let left = left.eval(scope);
                match op {
                    LogicalOp::Fallback if left.is_truthy() => left,
                    LogicalOp::Fallback => right.eval(scope),
                    LogicalOp::And => Value::Bool(left.is_truthy() && right.eval(scope).is_truthy()),
                    LogicalOp::Or => Value::Bool(left.is_truthy() || right.eval(scope).is_truthy()),
                }
            }
            Expr::Filter {
                input,
                name,
                args,
            } => {
                let args: Vec<Value> = args.iter().map(|arg| arg.eval(scope)).collect();
                filters::apply(name, input.eval(scope), &args)
            }
        }
    }
}

/// Applies an arithmetic operator.
///
/// Non-numeric operands yield null, division by zero yields 0 and
/// multiplication rounds to the nearest integer.
pub(crate) fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Value {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Value::Null;
    };

    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => (a * b).round(),
        ArithOp::Div if b == 0.0 => 0.0,
        ArithOp::Div => a / b,
    };

    if result.is_finite() {
        Value::Number(result)
    } else {
        Value::Null
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left.loose_eq(right),
        CompareOp::NotEq => !left.loose_eq(right),
        _ => {
            let ordering = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (left, right) {
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => None,
                },
            };
            ordering.is_some_and(|ordering| match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

struct ExprParser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s> ExprParser<'s> {
    fn new(source: &'s str) -> TemplateResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::expression(self.source, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> TemplateResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(other) => Err(self.error(format!("expected {what}, found {other}"))),
            None => Err(self.error(format!("expected {what}, found end of expression"))),
        }
    }

    fn expect_end(&self) -> TemplateResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected {token}"))),
        }
    }

    fn parse_expression(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_or()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_or()?;
            left = logical(LogicalOp::Fallback, left, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::AndAnd) || self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> TemplateResult<Expr> {
        if self.eat_keyword("not") || self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> TemplateResult<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::NotEq,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_additive()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = arith(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = arith(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> TemplateResult<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> TemplateResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::Pipe) {
            let name = self.expect_ident("filter name")?;
            let mut args = Vec::new();
            if self.eat(&Token::LParen) && !self.eat(&Token::RParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    if !self.eat(&Token::Comma) {
                        return Err(self.error(format!("expected ',' or ')' in arguments of filter '{name}'")));
                    }
                }
            }
            expr = Expr::Filter {
                input: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> TemplateResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::LParen) => {
                let inner = self.parse_expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "none" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ => {
                    let mut segments = vec![name];
                    while self.eat(&Token::Dot) {
                        segments.push(self.expect_ident("path segment after '.'")?);
                    }
                    Ok(Expr::Path(segments))
                }
            },
            Some(other) => Err(self.error(format!("unexpected {other}"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn arith(op: ArithOp, left: Expr, right: Expr) -> Expr {
    Expr::Arithmetic {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Header of a `{% for %}` tag: `item in expr` or `key, value in expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForHeader {
    pub first: String,
    pub second: Option<String>,
    pub iterable: Expr,
}

impl ForHeader {
    pub fn parse(source: &str) -> TemplateResult<Self> {
        let mut parser = ExprParser::new(source)?;
        let first = parser.expect_ident("loop variable")?;
        let second = if parser.eat(&Token::Comma) {
            Some(parser.expect_ident("second loop variable")?)
        } else {
            None
        };
        if !parser.eat_keyword("in") {
            return Err(parser.error("expected 'in' after loop variable"));
        }
        let iterable = parser.parse_expression()?;
        parser.expect_end()?;
        Ok(Self {
            first,
            second,
            iterable,
        })
    }
}

/// Variable lookup chain: loop bindings first, then the render context.
#[derive(Debug)]
pub struct Scope<'a> {
    locals: Map,
    parent: Option<&'a Scope<'a>>,
    context: &'a Value,
}

impl<'a> Scope<'a> {
    /// Root scope over a render context.
    #[must_use]
    pub fn new(context: &'a Value) -> Self {
        Self {
            locals: Map::new(),
            parent: None,
            context,
        }
    }

    /// Nested scope with additional bindings that shadow outer names.
    #[must_use]
    pub fn child(&self, locals: Map) -> Scope<'_> {
        Scope {
            locals,
            parent: Some(self),
            context: self.context,
        }
    }

    #[must_use]
    pub fn context(&self) -> &'a Value {
        self.context
    }

    fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.parent.and_then(|parent| parent.local(name)))
    }

    /// Resolve a dotted path. The first segment names a loop binding or a
    /// context namespace; any missing segment yields null.
    #[must_use]
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return Value::Null;
        };
        self.local(first.as_ref())
            .or_else(|| self.context.get(first.as_ref()))
            .and_then(|head| head.get_path(rest))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Evaluate `expression` against `context`.
///
/// Parse failures are logged and evaluate to null.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tplforge::templating::evaluate;
/// use tplforge::value::Value;
///
/// let context = Value::from(json!({ "calculated": { "confidence": 0.85 } }));
/// assert_eq!(evaluate("calculated.confidence * 100", &context), Value::Number(85.0));
/// assert_eq!(evaluate("10 / 0", &context), Value::Number(0.0));
/// assert_eq!(evaluate("calculated.missing.deeper", &context), Value::Null);
/// ```
#[must_use]
pub fn evaluate(expression: &str, context: &Value) -> Value {
    match Expr::parse(expression) {
        Ok(expr) => expr.eval(&Scope::new(context)),
        Err(e) => {
            tracing::debug!("{}", e);
            Value::Null
        }
    }
}

/// Truthiness of an evaluated value. See [`Value::is_truthy`].
#[must_use]
pub fn evaluate_truthy(value: &Value) -> bool {
    value.is_truthy()
}
