// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Option maps and layered merging.
//!
//! ## Overview
//!
//! [`Options`] is a string-keyed map of JSON values. Types declare options at
//! each level of their chain and callers supply more at construction time.
//! [`Options::merge`] folds the layers left to right, later layers winning.
//! The merge is shallow: a nested object in a later layer replaces the whole
//! value of an earlier one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A string-keyed map of configuration values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Fold `layers` left to right; values in later layers override earlier ones.
    pub fn merge<'a>(layers: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut out = Self::new();
        for layer in layers {
            out.extend_from(layer);
        }
        out
    }

    /// Copy every entry of `other` into `self`, overwriting existing keys.
    pub fn extend_from(&mut self, other: &Self) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Builder-style [`Options::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if `key` is present, whatever its value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if `key` is present with a truthy value (see [`is_truthy`]).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// Look up a string value.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrow the underlying JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Build from a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Loose truthiness for option values.
///
/// `null`, `false`, `0`, the empty string are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
