//! Typed leaf values and leaf types

use std::fmt;

use crate::xpath::CompiledExpr;

/// A typed scalar stored in a leaf or leaf-list
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Uint(u64),
    Decimal(f64),
    Boolean(bool),
    Enum(String),
    /// Identity in `prefix:name` form
    Identity(String),
    Bits(Vec<String>),
    Empty,
}

impl Value {
    /// JSON rendering of the value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Empty => serde_json::Value::Array(vec![serde_json::Value::Null]),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Enum(s) | Value::Identity(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Bits(bits) => f.write_str(&bits.join(" ")),
            Value::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeafType {
    String,
    Int,
    Uint,
    Decimal,
    Boolean,
    Enumeration(Vec<String>),
    IdentityRef { base: String },
    Bits(Vec<String>),
    Empty,
    /// String-valued reference to the nodes selected by `path`
    LeafRef { path: CompiledExpr },
}

impl LeafType {
    pub fn leafref(path: &str) -> Self {
        LeafType::LeafRef {
            path: CompiledExpr::compile(path),
        }
    }

    pub fn enumeration(names: &[&str]) -> Self {
        LeafType::Enumeration(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn bits(names: &[&str]) -> Self {
        LeafType::Bits(names.iter().map(|n| n.to_string()).collect())
    }

    /// Parse a lexical value
    ///
    /// Identity references are only checked for shape here; the schema index
    /// resolves them against its identity table.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the text is not a value of this
    /// type.
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        match self {
            LeafType::String | LeafType::LeafRef { .. } => Ok(Value::String(text.to_string())),
            LeafType::Int => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("'{}' is not an integer", text)),
            LeafType::Uint => text
                .trim()
                .parse::<u64>()
                .map(Value::Uint)
                .map_err(|_| format!("'{}' is not an unsigned integer", text)),
            LeafType::Decimal => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Value::Decimal)
                .ok_or_else(|| format!("'{}' is not a decimal", text)),
            LeafType::Boolean => match text.trim() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", text)),
            },
            LeafType::Enumeration(names) => {
                if names.iter().any(|n| n == text) {
                    Ok(Value::Enum(text.to_string()))
                } else {
                    Err(format!("'{}' is not a valid enum", text))
                }
            }
            LeafType::IdentityRef { .. } => {
                if text.is_empty() || text.chars().any(char::is_whitespace) {
                    Err(format!("'{}' is not an identity", text))
                } else {
                    Ok(Value::Identity(text.to_string()))
                }
            }
            LeafType::Bits(names) => {
                let mut set = Vec::new();
                for bit in text.split_whitespace() {
                    if !names.iter().any(|n| n == bit) {
                        return Err(format!("'{}' is not a bit of this type", bit));
                    }
                    if !set.iter().any(|b: &String| b == bit) {
                        set.push(bit.to_string());
                    }
                }
                // canonical order is declaration order
                set.sort_by_key(|b| names.iter().position(|n| n == b));
                Ok(Value::Bits(set))
            }
            LeafType::Empty => {
                if text.is_empty() {
                    Ok(Value::Empty)
                } else {
                    Err("empty type takes no value".to_string())
                }
            }
        }
    }

    /// Position of an enum name, used by `enum-value()`
    pub fn enum_value(&self, name: &str) -> Option<usize> {
        match self {
            LeafType::Enumeration(names) => names.iter().position(|n| n == name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_types() {
        assert_eq!(LeafType::Int.parse("-4"), Ok(Value::Int(-4)));
        assert!(LeafType::Uint.parse("-4").is_err());
        assert_eq!(LeafType::Decimal.parse("2.5"), Ok(Value::Decimal(2.5)));
        assert!(LeafType::Decimal.parse("NaN").is_err());
    }

    #[test]
    fn test_parse_enumeration() {
        let t = LeafType::enumeration(&["fastdsl", "ptm"]);
        assert_eq!(t.parse("ptm"), Ok(Value::Enum("ptm".to_string())));
        assert!(t.parse("atm").is_err());
        assert_eq!(t.enum_value("ptm"), Some(1));
    }

    #[test]
    fn test_bits_canonical_order() {
        let t = LeafType::bits(&["a", "b", "c"]);
        assert_eq!(
            t.parse("c a a"),
            Ok(Value::Bits(vec!["a".to_string(), "c".to_string()]))
        );
        assert!(t.parse("d").is_err());
        assert_eq!(Value::Bits(vec!["a".into(), "c".into()]).to_string(), "a c");
    }

    #[test]
    fn test_empty_and_boolean() {
        assert_eq!(LeafType::Empty.parse(""), Ok(Value::Empty));
        assert!(LeafType::Empty.parse("x").is_err());
        assert_eq!(LeafType::Boolean.parse("true"), Ok(Value::Boolean(true)));
        assert_eq!(Value::Empty.to_json(), serde_json::json!([null]));
    }
}
