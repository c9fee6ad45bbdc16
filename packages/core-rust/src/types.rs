use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque runtime value for request parameters and event payloads.
///
/// The engine never interprets vendor fields; it only reads boolean request
/// flags that decide whether a dual-mode call is persistent. Adapters convert
/// vendor structures into this tree at the transport edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent or unset field.
    Null,
    Bool(bool),
    /// Signed 64-bit integer (vendor ids, sizes, codes).
    Int(i64),
    /// 64-bit IEEE 754 float (prices, greeks).
    Float(f64),
    String(String),
    /// Raw bytes (e.g. FA XML blobs before decoding).
    Bytes(Vec<u8>),
    /// Ordered sequence (bar lists, tick lists).
    Array(Vec<Value>),
    /// Named fields. Uses `BTreeMap` for deterministic serialization order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a named field when this value is a `Map`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) => fields.get(name),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Named request parameters passed through to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_builder_and_lookup() {
        let params = Params::new()
            .with("snapshot", false)
            .with("tickerId", 7_i64)
            .with("genericTickList", "233");

        assert_eq!(params.get("snapshot").and_then(Value::as_bool), Some(false));
        assert_eq!(params.get("tickerId").and_then(Value::as_i64), Some(7));
        assert_eq!(params.get("genericTickList").and_then(Value::as_str), Some("233"));
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn value_map_from_pairs() {
        let bar: Value = [("open", Value::from(1.5)), ("volume", Value::from(100_i64))]
            .into_iter()
            .collect();
        assert_eq!(bar.field("volume"), Some(&Value::Int(100)));
        assert!(Value::Null.field("volume").is_none());
    }

    #[test]
    fn params_serialize_as_plain_map() {
        let params = Params::new().with("keepUpToDate", true);
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"keepUpToDate":{"Bool":true}}"#);
    }
}
