use std::fmt;

use crate::error::ExpressionParseError;
use crate::license::spdx;

/// A single-level license expression.
///
/// Only one operator kind per expression is supported; parentheses and mixed
/// `AND`/`OR` are rejected rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseExpression {
    Single(String),
    /// `A OR B OR ...`: the consumer picks one.
    AnyOf(Vec<String>),
    /// `A AND B AND ...`: all licenses apply together.
    AllOf(Vec<String>),
}

impl LicenseExpression {
    pub fn operands(&self) -> &[String] {
        match self {
            LicenseExpression::Single(id) => std::slice::from_ref(id),
            LicenseExpression::AnyOf(ids) | LicenseExpression::AllOf(ids) => ids,
        }
    }
}

impl fmt::Display for LicenseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseExpression::Single(id) => write!(f, "{}", id),
            LicenseExpression::AnyOf(ids) => write!(f, "{}", ids.join(" OR ")),
            LicenseExpression::AllOf(ids) => write!(f, "{}", ids.join(" AND ")),
        }
    }
}

/// Tokens produced by [`tokenize`].
#[derive(Debug, PartialEq, Clone)]
enum Token {
    Word(String),
    And,
    Or,
    LParen,
    RParen,
}

/// Split on whitespace and parentheses. Only upper-case `AND` / `OR` are
/// operators: lower-case "or" appears inside long-form license names.
fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::RParen);
            chars.next();
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                s.push(c);
                chars.next();
            }
            let token = match s.as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                _ => Token::Word(s),
            };
            tokens.push(token);
        }
    }
    tokens
}

/// Parse and alias-normalize a raw license expression.
pub fn parse(raw: &str) -> Result<LicenseExpression, ExpressionParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExpressionParseError::Empty);
    }

    // Whole-string aliases first: some long-form names contain parentheses.
    let whole = spdx::normalize(trimmed);
    if whole != trimmed {
        return Ok(LicenseExpression::Single(whole));
    }

    // "MIT/Apache-2.0" shorthand, but leave URLs alone.
    let expanded = if whole.contains("://") {
        whole
    } else {
        whole.replace('/', " OR ")
    };

    let mut operands: Vec<String> = Vec::new();
    let mut operator: Option<Token> = None;
    let mut words: Vec<String> = Vec::new();

    for token in tokenize(&expanded) {
        match token {
            Token::Word(w) => words.push(w),
            Token::LParen | Token::RParen => {
                return Err(ExpressionParseError::Nested(trimmed.to_string()));
            }
            op @ (Token::And | Token::Or) => {
                if words.is_empty() {
                    return Err(ExpressionParseError::DanglingOperator(trimmed.to_string()));
                }
                if operator.as_ref().is_some_and(|prev| *prev != op) {
                    return Err(ExpressionParseError::MixedOperators(trimmed.to_string()));
                }
                operator = Some(op);
                operands.push(spdx::normalize(&words.join(" ")));
                words.clear();
            }
        }
    }

    if words.is_empty() {
        return Err(ExpressionParseError::DanglingOperator(trimmed.to_string()));
    }
    operands.push(spdx::normalize(&words.join(" ")));

    Ok(match operator {
        None => LicenseExpression::Single(operands.remove(0)),
        Some(Token::Or) => LicenseExpression::AnyOf(operands),
        Some(_) => LicenseExpression::AllOf(operands),
    })
}

/// Canonical text of an expression, used as the candidate key during
/// evidence aggregation. Unparseable input is only trimmed and aliased.
pub fn normalize_expression(raw: &str) -> String {
    match parse(raw) {
        Ok(expr) => expr.to_string(),
        Err(_) => spdx::normalize(raw),
    }
}

/// True when the expression asserts no license: a bare placeholder, or an
/// expression whose operands are all placeholders (`NOASSERTION AND NONE`).
pub fn is_placeholder_only(raw: &str) -> bool {
    if spdx::is_placeholder(raw) {
        return true;
    }
    parse(raw).is_ok_and(|expr| expr.operands().iter().all(|op| spdx::is_placeholder(op)))
}
