//! Runtime value model for template rendering.
//!
//! `TemplateData` is what context dictionaries hold, what expressions
//! evaluate to, and what the serializer writes out. Dictionaries use a
//! `BTreeMap` so iteration (and therefore rendered output) is
//! deterministic.

use std::collections::BTreeMap;

/// A runtime template value.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateData {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<TemplateData>),
    Dictionary(BTreeMap<String, TemplateData>),
}

impl TemplateData {
    /// Truthiness for conditionals: `nil` and empty collections are
    /// false, numbers are false at zero, strings at empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateData::Nil => false,
            TemplateData::Bool(b) => *b,
            TemplateData::Int(i) => *i != 0,
            TemplateData::Double(d) => *d != 0.0,
            TemplateData::String(s) => !s.is_empty(),
            TemplateData::Array(a) => !a.is_empty(),
            TemplateData::Dictionary(d) => !d.is_empty(),
        }
    }

    /// True for `nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, TemplateData::Nil)
    }

    /// The element count of a countable value.
    pub fn len(&self) -> Option<usize> {
        match self {
            TemplateData::String(s) => Some(s.chars().count()),
            TemplateData::Array(a) => Some(a.len()),
            TemplateData::Dictionary(d) => Some(d.len()),
            _ => None,
        }
    }

    /// A short name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateData::Nil => "nil",
            TemplateData::Bool(_) => "bool",
            TemplateData::Int(_) => "int",
            TemplateData::Double(_) => "double",
            TemplateData::String(_) => "string",
            TemplateData::Array(_) => "array",
            TemplateData::Dictionary(_) => "dictionary",
        }
    }

    /// Converts a JSON value, where representable.
    ///
    /// Numbers outside `i64` fall back to doubles; anything else maps
    /// structurally. Returns `None` for unrepresentable numbers.
    pub fn from_json(value: serde_json::Value) -> Option<TemplateData> {
        match value {
            serde_json::Value::Null => Some(TemplateData::Nil),
            serde_json::Value::Bool(b) => Some(TemplateData::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(TemplateData::Int(i))
                } else {
                    n.as_f64().map(TemplateData::Double)
                }
            }
            serde_json::Value::String(s) => Some(TemplateData::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(TemplateData::from_json)
                .collect::<Option<Vec<_>>>()
                .map(TemplateData::Array),
            serde_json::Value::Object(entries) => {
                let mut dict = BTreeMap::new();
                for (key, value) in entries {
                    dict.insert(key, TemplateData::from_json(value)?);
                }
                Some(TemplateData::Dictionary(dict))
            }
        }
    }
}

impl std::fmt::Display for TemplateData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateData::Nil => Ok(()),
            TemplateData::Bool(b) => write!(f, "{b}"),
            TemplateData::Int(i) => write!(f, "{i}"),
            TemplateData::Double(d) => write!(f, "{d}"),
            TemplateData::String(s) => f.write_str(s),
            TemplateData::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            TemplateData::Dictionary(entries) => {
                f.write_str("[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<TemplateData> for serde_json::Value {
    fn from(data: TemplateData) -> Self {
        match data {
            TemplateData::Nil => serde_json::Value::Null,
            TemplateData::Bool(b) => serde_json::Value::Bool(b),
            TemplateData::Int(i) => serde_json::Value::from(i),
            TemplateData::Double(d) => {
                serde_json::Number::from_f64(d).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            TemplateData::String(s) => serde_json::Value::String(s),
            TemplateData::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            TemplateData::Dictionary(entries) => serde_json::Value::Object(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<bool> for TemplateData {
    fn from(b: bool) -> Self {
        TemplateData::Bool(b)
    }
}

impl From<i64> for TemplateData {
    fn from(i: i64) -> Self {
        TemplateData::Int(i)
    }
}

impl From<i32> for TemplateData {
    fn from(i: i32) -> Self {
        TemplateData::Int(i64::from(i))
    }
}

impl From<f64> for TemplateData {
    fn from(d: f64) -> Self {
        TemplateData::Double(d)
    }
}

impl From<&str> for TemplateData {
    fn from(s: &str) -> Self {
        TemplateData::String(s.to_string())
    }
}

impl From<String> for TemplateData {
    fn from(s: String) -> Self {
        TemplateData::String(s)
    }
}

impl From<Vec<TemplateData>> for TemplateData {
    fn from(items: Vec<TemplateData>) -> Self {
        TemplateData::Array(items)
    }
}

impl From<BTreeMap<String, TemplateData>> for TemplateData {
    fn from(entries: BTreeMap<String, TemplateData>) -> Self {
        TemplateData::Dictionary(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_emptiness_and_zero() {
        assert!(!TemplateData::Nil.is_truthy());
        assert!(!TemplateData::Int(0).is_truthy());
        assert!(TemplateData::Int(-1).is_truthy());
        assert!(!TemplateData::String(String::new()).is_truthy());
        assert!(TemplateData::from("x").is_truthy());
        assert!(!TemplateData::Array(vec![]).is_truthy());
        assert!(TemplateData::Array(vec![TemplateData::Nil]).is_truthy());
    }

    #[test]
    fn display_renders_scalars_plainly() {
        assert_eq!(TemplateData::from("world").to_string(), "world");
        assert_eq!(TemplateData::Int(42).to_string(), "42");
        assert_eq!(TemplateData::Bool(true).to_string(), "true");
        assert_eq!(TemplateData::Nil.to_string(), "");
    }

    #[test]
    fn display_renders_collections_bracketed() {
        let array = TemplateData::Array(vec![TemplateData::Int(1), TemplateData::Int(2)]);
        assert_eq!(array.to_string(), "[1, 2]");
        let mut dict = BTreeMap::new();
        dict.insert("a".to_string(), TemplateData::Int(1));
        dict.insert("b".to_string(), TemplateData::Int(2));
        assert_eq!(TemplateData::Dictionary(dict).to_string(), "[a: 1, b: 2]");
    }

    #[test]
    fn from_json_maps_structurally() {
        let json = serde_json::json!({"name": "world", "count": 3, "ratio": 0.5, "tags": ["a"]});
        let data = TemplateData::from_json(json).unwrap();
        match data {
            TemplateData::Dictionary(d) => {
                assert_eq!(d.get("name"), Some(&TemplateData::from("world")));
                assert_eq!(d.get("count"), Some(&TemplateData::Int(3)));
                assert_eq!(d.get("ratio"), Some(&TemplateData::Double(0.5)));
                assert_eq!(
                    d.get("tags"),
                    Some(&TemplateData::Array(vec![TemplateData::from("a")]))
                );
            }
            other => panic!("expected dictionary, got {other:?}"),
        }
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let json = serde_json::json!({"a": [1, 2], "b": null, "c": true});
        let data = TemplateData::from_json(json.clone()).unwrap();
        assert_eq!(serde_json::Value::from(data), json);
    }

    #[test]
    fn len_counts_collections_and_strings() {
        assert_eq!(TemplateData::from("abc").len(), Some(3));
        assert_eq!(TemplateData::Array(vec![TemplateData::Nil]).len(), Some(1));
        assert_eq!(TemplateData::Int(5).len(), None);
    }
}
