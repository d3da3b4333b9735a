//! Attribute filter expressions.
//!
//! A small boolean language over feature attributes, e.g.
//! `lower(trim("status")) = 'active' AND "kind" <> 'road'`.
//!
//! - string literals in single quotes, `''` escapes a quote,
//! - numbers, `NULL`, `TRUE`, `FALSE`,
//! - field names either bare (`status`) or double-quoted (`"land use"`),
//! - functions `lower`, `upper`, `trim`,
//! - operators `=`, `<>` (or `!=`), `AND`, `OR`, `NOT` and parentheses.
//!
//! Keywords and function names are case-insensitive. Comparisons involving a null are false.

use crate::error::{CaptureError, Result};
use crate::geofile::feature::{AttributeValue, Feature};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Number(f64),
    Ident(String),
    QuotedIdent(String),
    Eq,
    NotEq,
    LParen,
    RParen,
}

/// Runtime value of a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0,
            Value::Text(value) => !value.is_empty(),
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            Value::Boolean(value) => Some(value.to_string()),
        }
    }
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => Value::Null,
            AttributeValue::Integer(value) => Value::Number(*value as f64),
            AttributeValue::Real(value) => Value::Number(*value),
            AttributeValue::String(value) => Value::Text(value.clone()),
            AttributeValue::Boolean(value) => Value::Boolean(*value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Lower,
    Upper,
    Trim,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lower" => Some(Function::Lower),
            "upper" => Some(Function::Upper),
            "trim" => Some(Function::Trim),
            _ => None,
        }
    }

    fn apply(&self, value: Value) -> Value {
        match value.to_text() {
            None => Value::Null,
            Some(text) => Value::Text(match self {
                Function::Lower => text.to_lowercase(),
                Function::Upper => text.to_uppercase(),
                Function::Trim => text.trim().to_string(),
            }),
        }
    }
}

/// A node in the expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field { name: String, position: usize },
    Literal(Value),
    Call { function: Function, argument: Box<Expr> },
    Compare { negated: bool, left: Box<Expr>, right: Box<Expr> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    fn evaluate(&self, feature: &Feature) -> Value {
        match self {
            Expr::Field { name, .. } => feature.attribute(name).map_or(Value::Null, Value::from),
            Expr::Literal(value) => value.clone(),
            Expr::Call { function, argument } => function.apply(argument.evaluate(feature)),
            Expr::Compare {
                negated,
                left,
                right,
            } => match compare(&left.evaluate(feature), &right.evaluate(feature)) {
                Some(equal) => Value::Boolean(equal != *negated),
                None => Value::Null,
            },
            Expr::And(left, right) => Value::Boolean(
                left.evaluate(feature).is_truthy() && right.evaluate(feature).is_truthy(),
            ),
            Expr::Or(left, right) => Value::Boolean(
                left.evaluate(feature).is_truthy() || right.evaluate(feature).is_truthy(),
            ),
            Expr::Not(inner) => match inner.evaluate(feature) {
                Value::Null => Value::Null,
                value => Value::Boolean(!value.is_truthy()),
            },
        }
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<(&'a str, usize)>) {
        match self {
            Expr::Field { name, position } => fields.push((name, *position)),
            Expr::Literal(_) => {}
            Expr::Call { argument, .. } => argument.collect_fields(fields),
            Expr::Compare { left, right, .. } | Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Expr::Not(inner) => inner.collect_fields(fields),
        }
    }
}

/// Equality of two values, `None` if either side is null.
fn compare(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(left), Value::Number(right)) => Some(left == right),
        (Value::Boolean(left), Value::Boolean(right)) => Some(left == right),
        (left, right) => Some(left.to_text() == right.to_text()),
    }
}

/// A parsed filter expression. The empty expression matches every feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    root: Option<Expr>,
}

impl FilterExpression {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Ok(Self { root: None });
        }
        let mut parser = Parser::new(tokens, source.len());
        let root = parser.parse_or()?;
        if let Some((position, token)) = parser.peek() {
            return Err(CaptureError::filter_syntax(
                *position,
                format!("Unexpected token {:?}", token),
            ));
        }
        Ok(Self { root: Some(root) })
    }

    pub fn is_match_all(&self) -> bool {
        self.root.is_none()
    }

    /// Field names referenced by the expression, with their position in the source.
    pub fn referenced_fields(&self) -> Vec<(&str, usize)> {
        let mut fields = Vec::new();
        if let Some(root) = &self.root {
            root.collect_fields(&mut fields);
        }
        fields
    }

    /// Check that every referenced field exists in the layer schema.
    pub fn validate_fields(&self, field_names: &[String]) -> Result<()> {
        for (name, position) in self.referenced_fields() {
            if !field_names.iter().any(|field_name| field_name == name) {
                return Err(CaptureError::filter_syntax(
                    position,
                    format!("Field '{}' not found. Available: {:?}", name, field_names),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        match &self.root {
            Some(root) => root.evaluate(feature).is_truthy(),
            None => true,
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '(' => {
                tokens.push((position, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((position, Token::RParen));
                i += 1;
            }
            '=' => {
                tokens.push((position, Token::Eq));
                i += 1;
            }
            '<' | '!' => match chars.get(i + 1) {
                Some((_, '>')) if c == '<' => {
                    tokens.push((position, Token::NotEq));
                    i += 2;
                }
                Some((_, '=')) if c == '!' => {
                    tokens.push((position, Token::NotEq));
                    i += 2;
                }
                _ => {
                    return Err(CaptureError::filter_syntax(
                        position,
                        format!("Unsupported operator '{}'", c),
                    ))
                }
            },
            '\'' | '"' => {
                let (text, next) = read_quoted(&chars, i)?;
                let token = if c == '\'' {
                    Token::Text(text)
                } else {
                    Token::QuotedIdent(text)
                };
                tokens.push((position, token));
                i = next;
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let number: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let number = number.parse::<f64>().map_err(|_| {
                    CaptureError::filter_syntax(position, format!("Invalid number: {}", number))
                })?;
                tokens.push((position, Token::Number(number)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|(_, c)| c).collect();
                tokens.push((position, Token::Ident(name)));
            }
            c => {
                return Err(CaptureError::filter_syntax(
                    position,
                    format!("Unexpected character '{}'", c),
                ));
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `chars[start]`. A doubled quote character stands for
/// itself. Returns the unescaped contents and the index after the closing quote.
fn read_quoted(chars: &[(usize, char)], start: usize) -> Result<(String, usize)> {
    let (position, quote) = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            if matches!(chars.get(i + 1), Some((_, next)) if *next == quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    Err(CaptureError::filter_syntax(
        position,
        format!("Unterminated {} quote", quote),
    ))
}

/// Recursive descent parser, lowest precedence first: OR, AND, NOT, comparison.
struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |(position, _)| *position)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some((_, Token::Ident(name))) if name.eq_ignore_ascii_case(keyword))
    }

    /// or = and ('OR' and)*
    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// and = not ('AND' not)*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.peek_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// not = 'NOT' not | comparison
    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek_keyword("not") {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    /// comparison = operand (('=' | '<>') operand)?
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        let negated = match self.peek() {
            Some((_, Token::Eq)) => false,
            Some((_, Token::NotEq)) => true,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            negated,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// operand = literal | field | function '(' or ')' | '(' or ')'
    fn parse_operand(&mut self) -> Result<Expr> {
        let position = self.position();
        match self.advance() {
            Some((_, Token::Text(text))) => Ok(Expr::Literal(Value::Text(text))),
            Some((_, Token::Number(number))) => Ok(Expr::Literal(Value::Number(number))),
            Some((_, Token::QuotedIdent(name))) => Ok(Expr::Field { name, position }),
            Some((_, Token::LParen)) => {
                let inner = self.parse_or()?;
                self.expect_closing_paren()?;
                Ok(inner)
            }
            Some((_, Token::Ident(name))) => {
                if matches!(self.peek(), Some((_, Token::LParen))) {
                    let function = Function::from_name(&name).ok_or_else(|| {
                        CaptureError::filter_syntax(position, format!("Unknown function '{}'", name))
                    })?;
                    self.advance();
                    let argument = self.parse_or()?;
                    self.expect_closing_paren()?;
                    return Ok(Expr::Call {
                        function,
                        argument: Box::new(argument),
                    });
                }
                match name.to_ascii_lowercase().as_str() {
                    "null" => Ok(Expr::Literal(Value::Null)),
                    "true" => Ok(Expr::Literal(Value::Boolean(true))),
                    "false" => Ok(Expr::Literal(Value::Boolean(false))),
                    "and" | "or" | "not" => Err(CaptureError::filter_syntax(
                        position,
                        format!("Unexpected keyword '{}'", name),
                    )),
                    _ => Ok(Expr::Field { name, position }),
                }
            }
            Some((_, token)) => Err(CaptureError::filter_syntax(
                position,
                format!("Unexpected token {:?}", token),
            )),
            None => Err(CaptureError::filter_syntax(
                position,
                "Unexpected end of expression",
            )),
        }
    }

    fn expect_closing_paren(&mut self) -> Result<()> {
        let position = self.position();
        match self.advance() {
            Some((_, Token::RParen)) => Ok(()),
            _ => Err(CaptureError::filter_syntax(
                position,
                "Expected closing parenthesis",
            )),
        }
    }
}
