//! Per-request storage written by the orchestrator.

use std::collections::HashMap;

use crate::params::{HeaderSet, ParameterSet};

/// A value stored in a [`RequestEnv`] slot.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    /// A parameter mapping.
    Params(ParameterSet),
    /// A header mapping.
    Headers(HeaderSet),
}

/// Request-scoped key/value storage shared between the validator and the
/// handlers that run after it.
///
/// The hosting framework may also provide a native query hash: the query
/// mapping it parsed itself. When present, its values are replaced by the
/// validated ones for the same keys, and a copy is stored in the slot named
/// by `query_hash_key`.
#[derive(Debug, Clone, Default)]
pub struct RequestEnv {
    slots: HashMap<String, EnvValue>,
    native_query: Option<ParameterSet>,
}

impl RequestEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment carrying the framework's native query hash.
    pub fn with_native_query(native_query: ParameterSet) -> Self {
        Self {
            slots: HashMap::new(),
            native_query: Some(native_query),
        }
    }

    /// The framework's native query hash, if any.
    pub fn native_query(&self) -> Option<&ParameterSet> {
        self.native_query.as_ref()
    }

    /// Removes the framework's native query hash.
    pub fn take_native_query(&mut self) -> Option<ParameterSet> {
        self.native_query.take()
    }

    /// Sets the framework's native query hash.
    pub fn set_native_query(&mut self, native_query: ParameterSet) {
        self.native_query = Some(native_query);
    }

    /// Stores a parameter mapping.
    pub fn insert_params(&mut self, key: impl Into<String>, params: ParameterSet) {
        self.slots.insert(key.into(), EnvValue::Params(params));
    }

    /// Reads a parameter mapping.
    pub fn params(&self, key: &str) -> Option<&ParameterSet> {
        match self.slots.get(key) {
            Some(EnvValue::Params(params)) => Some(params),
            _ => None,
        }
    }

    /// Reads a parameter mapping mutably.
    pub fn params_mut(&mut self, key: &str) -> Option<&mut ParameterSet> {
        match self.slots.get_mut(key) {
            Some(EnvValue::Params(params)) => Some(params),
            _ => None,
        }
    }

    /// Returns the parameter mapping at `key`, creating an empty one if the
    /// slot is vacant or holds something else.
    pub fn params_entry(&mut self, key: &str) -> &mut ParameterSet {
        if self.params(key).is_none() {
            self.insert_params(key, ParameterSet::new());
        }
        match self.slots.get_mut(key) {
            Some(EnvValue::Params(params)) => params,
            _ => unreachable!("slot was just filled with parameters"),
        }
    }

    /// Stores a header mapping.
    pub fn insert_headers(&mut self, key: impl Into<String>, headers: HeaderSet) {
        self.slots.insert(key.into(), EnvValue::Headers(headers));
    }

    /// Reads a header mapping.
    pub fn headers(&self, key: &str) -> Option<&HeaderSet> {
        match self.slots.get(key) {
            Some(EnvValue::Headers(headers)) => Some(headers),
            _ => None,
        }
    }

    /// Returns `true` if a slot is occupied.
    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Removes a slot.
    pub fn remove(&mut self, key: &str) -> Option<EnvValue> {
        self.slots.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slots_are_typed() {
        let mut env = RequestEnv::new();
        env.insert_params("covenant.params", ParameterSet::new());
        env.insert_headers("covenant.headers", HeaderSet::new());

        assert!(env.params("covenant.params").is_some());
        assert!(env.headers("covenant.params").is_none());
        assert!(env.headers("covenant.headers").is_some());
        assert!(env.params("covenant.headers").is_none());
    }

    #[test]
    fn test_params_entry_creates_slot() {
        let mut env = RequestEnv::new();
        env.params_entry("echo").insert("a", json!(1));
        env.params_entry("echo").insert("b", json!(2));
        assert_eq!(env.params("echo").map(ParameterSet::len), Some(2));
    }

    #[test]
    fn test_native_query() {
        let mut native = ParameterSet::new();
        native.insert("limit", json!("10"));
        let env = RequestEnv::with_native_query(native);
        assert_eq!(
            env.native_query().and_then(|q| q.get("limit")),
            Some(&json!("10"))
        );
        assert!(RequestEnv::new().native_query().is_none());
    }

    #[test]
    fn test_take_native_query() {
        let mut env = RequestEnv::with_native_query(ParameterSet::new());
        assert!(env.take_native_query().is_some());
        assert!(env.native_query().is_none());
    }
}
