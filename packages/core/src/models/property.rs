//! Ordered Property Bag
//!
//! Open-ended key-value data attached to a node. Values are restricted to a
//! fixed set of variants so downstream code can pattern-match instead of
//! poking at untyped JSON. Insertion order is preserved for display.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single property value
///
/// Serialized untagged, so a property bag round-trips as a plain JSON object:
/// `{"met_at": "RustConf", "intro_count": 2, "vip": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl TryFrom<serde_json::Value> for PropertyValue {
    type Error = String;

    /// Convert arbitrary JSON into a property value.
    ///
    /// `null` has no counterpart and is rejected; callers should drop the key instead.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Err("null is not a valid property value".to_string()),
            serde_json::Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(PropertyValue::Number)
                .ok_or_else(|| format!("number {} is not representable as f64", n)),
            serde_json::Value::String(s) => Ok(PropertyValue::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(PropertyValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::List),
            serde_json::Value::Object(map) => {
                let mut props = PropertyMap::new();
                for (key, value) in map {
                    props.insert(key, PropertyValue::try_from(value)?);
                }
                Ok(PropertyValue::Map(props))
            }
        }
    }
}

/// Insertion-ordered map of property values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(IndexMap<String, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    ///
    /// Replacing keeps the key's original position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Remove a key, shifting later keys down so order is preserved.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Shallow merge: keys in `other` overwrite keys here
    pub fn merge(&mut self, other: PropertyMap) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
