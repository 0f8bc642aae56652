//! Untyped values crossing the sandbox boundary.
//!
//! Depending on how an engine build serializes its answers, a mapping arrives
//! either as an accessor object (`has` / `get`, like a proxied dictionary) or
//! as a plain structured value. Nested values can be either shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Accessor-style mapping exposed by the engine.
pub trait MappingAccessor: Send + Sync {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<RawValue>;

    /// Keys in the order the engine reports them.
    fn keys(&self) -> Vec<String>;
}

/// A value returned by the engine, before normalization.
#[derive(Clone)]
pub enum RawValue {
    Accessor(Arc<dyn MappingAccessor>),
    Plain(Value),
}

impl RawValue {
    pub fn accessor(accessor: impl MappingAccessor + 'static) -> Self {
        Self::Accessor(Arc::new(accessor))
    }

    /// Capability probe: `Some` when the value supports `has` / `get`.
    #[must_use]
    pub fn as_accessor(&self) -> Option<&dyn MappingAccessor> {
        match self {
            Self::Accessor(accessor) => Some(accessor.as_ref()),
            Self::Plain(_) => None,
        }
    }

    #[must_use]
    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            Self::Accessor(_) => None,
            Self::Plain(value) => Some(value),
        }
    }

    /// `None` and Python's `None` (serialized as null) both count as absent.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Plain(Value::Null))
    }

    /// Truthiness as the host scripting layer would see it.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Accessor(_) => true,
            Self::Plain(Value::Null) => false,
            Self::Plain(Value::Bool(flag)) => *flag,
            Self::Plain(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Self::Plain(Value::String(s)) => !s.is_empty(),
            Self::Plain(Value::Array(_) | Value::Object(_)) => true,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_plain().and_then(Value::as_f64)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_plain().and_then(Value::as_str)
    }

    /// String elements of a list value. Non-string elements are rendered
    /// with their JSON text so no diagnostic is silently lost.
    #[must_use]
    pub fn to_string_list(&self) -> Vec<String> {
        let Some(Value::Array(items)) = self.as_plain() else {
            return Vec::new();
        };
        items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    /// Deep conversion to a plain JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Plain(value) => value.clone(),
            Self::Accessor(accessor) => {
                let mut map = Map::new();
                for key in accessor.keys() {
                    if let Some(value) = accessor.get(&key) {
                        map.insert(key, value.to_json());
                    }
                }
                Value::Object(map)
            }
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Self::Accessor(accessor) => {
                f.write_str("Accessor")?;
                let mut map = f.debug_map();
                for key in accessor.keys() {
                    if let Some(value) = accessor.get(&key) {
                        map.entry(&key, &value);
                    }
                }
                map.finish()
            }
        }
    }
}

/// Owned accessor mapping, the shape a proxied dictionary takes after it is
/// converted with a map-producing converter.
#[derive(Debug, Clone, Default)]
pub struct DictProxy {
    entries: BTreeMap<String, RawValue>,
}

impl DictProxy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Wrap a JSON value, turning every nested object into an accessor.
    #[must_use]
    pub fn wrap(value: Value) -> RawValue {
        match value {
            Value::Object(map) => {
                let entries = map
                    .into_iter()
                    .map(|(key, value)| (key, Self::wrap(value)))
                    .collect();
                RawValue::accessor(Self { entries })
            }
            other => RawValue::Plain(other),
        }
    }
}

impl MappingAccessor for DictProxy {
    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<RawValue> {
        self.entries.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
