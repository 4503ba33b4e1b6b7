//! Typed results of expression evaluation and their XPath 1.0 coercions.
use core::fmt;

use crate::error::{Error, ErrorCode};
use crate::model::StoredNode;
use crate::node_set::NodeSet;

#[derive(Debug, Clone)]
pub enum Value<N: StoredNode> {
    NodeSet(NodeSet<N>),
    Number(f64),
    String(String),
    Boolean(bool),
}

impl<N: StoredNode> Value<N> {
    /// Effective boolean value: non-empty node-set, non-zero non-NaN number,
    /// non-empty string.
    pub fn boolean_value(&self) -> bool {
        match self {
            Value::NodeSet(set) => !set.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
        }
    }

    /// Numeric value; unparsable strings become NaN.
    pub fn number_value(&self) -> f64 {
        match self {
            Value::NodeSet(_) => string_to_number(&self.string_value()),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// String value; a node-set yields the string-value of its first node.
    pub fn string_value(&self) -> String {
        match self {
            Value::NodeSet(set) => set.first().map(StoredNode::string_value).unwrap_or_default(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Node-set view of the value. Only node-sets convert.
    pub fn into_node_set(self) -> Result<NodeSet<N>, Error> {
        match self {
            Value::NodeSet(set) => Ok(set),
            other => Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("expected a node-set, got {}", other.type_name()),
            )),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl<N: StoredNode> From<NodeSet<N>> for Value<N> {
    fn from(set: NodeSet<N>) -> Self {
        Value::NodeSet(set)
    }
}

impl<N: StoredNode> fmt::Display for Value<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NodeSet(set) => write!(f, "<node-set of {}>", set.len()),
            Value::String(s) => write!(f, "\"{s}\""),
            other => f.write_str(&other.string_value()),
        }
    }
}

/// Parse a textual value as a number (surrounding whitespace ignored).
///
/// Returns `None` for anything that is not a plain decimal or exponent
/// literal, including the empty string.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    // reject the special spellings f64::from_str accepts
    if t.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
        return None;
    }
    t.parse::<f64>().ok()
}

pub(crate) fn string_to_number(s: &str) -> f64 {
    parse_number(s).unwrap_or(f64::NAN)
}

/// XPath-style number formatting: integral values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;

    #[test]
    fn parse_number_rejects_words_and_specials() {
        assert_eq!(parse_number(" 10 "), Some(10.0));
        assert_eq!(parse_number("-2.5e1"), Some(-25.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("1x"), None);
    }

    #[test]
    fn coercions_follow_xpath_rules() {
        let v: Value<SimpleNode> = Value::Number(7.0);
        assert_eq!(v.string_value(), "7");
        assert!(v.boolean_value());
        let v: Value<SimpleNode> = Value::String("x".into());
        assert!(v.number_value().is_nan());
        assert!(Value::<SimpleNode>::Boolean(true).number_value() == 1.0);
        assert!(!Value::<SimpleNode>::NodeSet(NodeSet::new()).boolean_value());
        assert_eq!(format_number(0.25), "0.25");
        assert!(Value::<SimpleNode>::Number(f64::NAN).string_value() == "NaN");
    }

    #[test]
    fn only_node_sets_convert_to_node_sets() {
        let err = Value::<SimpleNode>::String("a".into()).into_node_set().unwrap_err();
        assert_eq!(err.code(), ErrorCode::XPTY0004);
    }
}
