//! XPath 1.0 value model and coercion rules

use super::document::{Document, XNode};

#[derive(Debug, Clone, PartialEq)]
pub enum XValue {
    Boolean(bool),
    Number(f64),
    String(String),
    /// Nodes in document order without duplicates
    NodeSet(Vec<XNode>),
}

impl XValue {
    pub fn empty() -> Self {
        XValue::NodeSet(Vec::new())
    }

    pub fn as_bool(&self) -> bool {
        match self {
            XValue::Boolean(b) => *b,
            XValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XValue::String(s) => !s.is_empty(),
            XValue::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    pub fn as_number(&self, doc: &Document<'_>) -> f64 {
        match self {
            XValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XValue::Number(n) => *n,
            XValue::String(s) => string_to_number(s),
            XValue::NodeSet(_) => string_to_number(&self.as_string(doc)),
        }
    }

    pub fn as_string(&self, doc: &Document<'_>) -> String {
        match self {
            XValue::Boolean(b) => b.to_string(),
            XValue::Number(n) => number_to_string(*n),
            XValue::String(s) => s.clone(),
            XValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| doc.string_value(*n))
                .unwrap_or_default(),
        }
    }

    pub fn into_nodes(self) -> Vec<XNode> {
        match self {
            XValue::NodeSet(nodes) => nodes,
            _ => Vec::new(),
        }
    }
}

/// XPath `number()` applied to a string
///
/// Accepts optional surrounding whitespace, an optional leading minus and
/// a plain decimal. Anything else (exponents, `+`, `inf`) is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath `string()` applied to a number
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
