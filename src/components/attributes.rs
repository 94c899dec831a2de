//! Typed attribute store for component settings.

use std::collections::BTreeMap;
use std::fmt;

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Float,
    Integer,
    Boolean,
    Text,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeKind::Float => "float",
            AttributeKind::Integer => "integer",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl AttributeValue {
    /// The kind of this value.
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::Integer(_) => AttributeKind::Integer,
            AttributeValue::Boolean(_) => AttributeKind::Boolean,
            AttributeValue::Text(_) => AttributeKind::Text,
        }
    }

    /// The value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Attribute values keyed by name, checked against a fixed schema.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    schema: BTreeMap<&'static str, AttributeKind>,
    values: BTreeMap<&'static str, AttributeValue>,
}

impl AttributeStore {
    /// Create a store for the given schema with no values set.
    pub fn new(schema: &[(&'static str, AttributeKind)]) -> Self {
        Self {
            schema: schema.iter().copied().collect(),
            values: BTreeMap::new(),
        }
    }

    /// Name to expected kind.
    pub fn schema(&self) -> &BTreeMap<&'static str, AttributeKind> {
        &self.schema
    }

    /// Store `value` under `key` if the schema allows it.
    ///
    /// Unknown keys and kind mismatches are rejected without touching the
    /// stored values.
    pub fn set(&mut self, key: &str, value: AttributeValue) -> bool {
        match self.schema.get_key_value(key) {
            Some((name, kind)) if *kind == value.kind() => {
                self.values.insert(*name, value);
                true
            }
            _ => false,
        }
    }

    /// Look up a stored value.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AttributeStore {
        AttributeStore::new(&[("voltage_selector_state", AttributeKind::Float)])
    }

    #[test]
    fn test_accepts_matching_kind() {
        let mut attrs = store();
        assert!(attrs.set("voltage_selector_state", 9.0.into()));
        assert_eq!(
            attrs.get("voltage_selector_state"),
            Some(&AttributeValue::Float(9.0))
        );
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let mut attrs = store();
        assert!(!attrs.set("voltage_selector_state", "nine".into()));
        assert!(attrs.get("voltage_selector_state").is_none());
    }

    #[test]
    fn test_rejects_unknown_key() {
        let mut attrs = store();
        assert!(!attrs.set("frequency", 50.0.into()));
        assert!(attrs.get("frequency").is_none());
    }
}
