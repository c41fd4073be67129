//! Template variables for a single render call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("render context must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("failed to serialize context value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ordered mapping from template variable name to value.
///
/// Renderers only ever borrow the context, it is never mutated during a
/// render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderContext(Map<String, Value>);

impl RenderContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert any serializable record, e.g. a related entity.
    pub fn insert_serialized<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), ContextError> {
        self.0.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Build a context from a serializable struct or map.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, ContextError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ContextError::NotAnObject(value_kind(&other))),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContextError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ContextError::NotAnObject(value_kind(&other))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
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

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
