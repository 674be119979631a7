//! Per-session key/value store
//!
//! Loaded verbatim from the caller at the start of an invocation and
//! snapshotted at the end. Reads observe every earlier write in program
//! order; there are no transactions and nothing here is persisted.
//! The store is owned by the render pass and must not be handed to
//! background threads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GuiError;

/// Session State: an ordered map from string keys to JSON values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    values: Map<String, Value>,
}

impl SessionState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store
    pub fn load(&mut self, values: Map<String, Value>) {
        self.values = values;
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }

    /// Consume the store, returning its contents
    pub fn into_inner(self) -> Map<String, Value> {
        self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value under `key`, or `default` when absent
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// Typed read; `Ok(None)` when absent
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, GuiError> {
        match self.values.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| GuiError::invalid_state(key, e.to_string())),
            None => Ok(None),
        }
    }

    /// Typed read of a string entry
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Store `value` under `key`, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Serialize and store `value`
    pub fn set_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Option<Value>, GuiError> {
        let value = serde_json::to_value(value).map_err(GuiError::NotSerializable)?;
        Ok(self.set(key, value))
    }

    /// Store `default` only if `key` is absent; returns the stored value
    pub fn set_default(&mut self, key: impl Into<String>, default: impl Into<Value>) -> &mut Value {
        self.values.entry(key.into()).or_insert_with(|| default.into())
    }

    /// Remove and return the value under `key`
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Remove the value under `key`, or return `default` when absent
    pub fn pop_or(&mut self, key: &str, default: Value) -> Value {
        self.values.remove(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

impl From<Map<String, Value>> for SessionState {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}
