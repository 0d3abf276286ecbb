//! Request-local parameter and header mappings.

use http::HeaderMap;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Mapping from parameter name to value.
///
/// Values start out as strings (or arrays of strings) from the query string,
/// structured JSON from the body, or typed values from path coercion. Keys are
/// unique and keep their insertion order. A set created with
/// [`ParameterSet::case_insensitive`] folds keys to lowercase on every access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: IndexMap<String, Value>,
    case_insensitive: bool,
}

impl ParameterSet {
    /// Creates an empty, case-sensitive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set whose keys compare case-insensitively.
    pub fn case_insensitive() -> Self {
        Self {
            entries: IndexMap::new(),
            case_insensitive: true,
        }
    }

    /// Returns `true` if keys compare case-insensitively.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Sets `name` to `value`, returning the value it replaced.
    pub fn insert(&mut self, name: impl AsRef<str>, value: Value) -> Option<Value> {
        let key = self.key(name.as_ref());
        self.entries.insert(key, value)
    }

    /// Looks up a parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if self.case_insensitive {
            self.entries.get(&name.to_ascii_lowercase())
        } else {
            self.entries.get(name)
        }
    }

    /// Looks up a parameter mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let key = self.key(name);
        self.entries.get_mut(&key)
    }

    /// Returns `true` if the parameter is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a parameter, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let key = self.key(name);
        self.entries.shift_remove(&key)
    }

    /// Overlays `other` onto this set. Keys present in both take `other`'s value.
    pub fn merge(&mut self, other: ParameterSet) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    /// Returns a new set with `other` overlaid onto `self`.
    pub fn merged(mut self, other: ParameterSet) -> Self {
        self.merge(other);
        self
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over `(name, value)` pairs with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Converts the set into a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Builds a case-sensitive set from a JSON object. Non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Mapping from lowercased header name to value.
///
/// Repeated headers are joined with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderSet {
    entries: IndexMap<String, String>,
}

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header set from an [`HeaderMap`].
    ///
    /// Values that are not visible ASCII are decoded lossily.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut set = Self::new();
        for (name, value) in headers {
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            set.append(name.as_str(), value);
        }
        set
    }

    /// Sets a header, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Appends a header value, joining with any existing one.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.entries
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// Looks up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
