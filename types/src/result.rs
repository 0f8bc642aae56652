//! Result normalization.
//!
//! A raw engine answer is decoded into a [`CanonicalResult`] by one of two
//! decoders. The decoder is picked by probing the value's capabilities
//! (accessor vs plain object), never by inspecting a type name, and both
//! decoders read the same fields with the same meaning.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::raw::{MappingAccessor, RawValue};

/// Quantity name to engine metadata. The metadata is opaque to this layer.
pub type QuantityCatalog = BTreeMap<String, Value>;

/// Shape-independent discovery response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalResult {
    pub success: bool,
    pub message: Option<String>,
    pub formula: Option<String>,
    /// `None` means no validation was performed, which is not a zero score.
    pub validation: Option<CanonicalValidation>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalValidation {
    /// Normalized to `[0, 1]`.
    pub confidence_score: f64,
    pub warnings: Vec<String>,
}

/// The engine returned something that is not a mapping at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a mapping, got {found}")]
pub struct UnrecognizedShape {
    pub found: &'static str,
}

impl UnrecognizedShape {
    fn of(raw: &RawValue) -> Self {
        let found = match raw.as_plain() {
            None => "accessor",
            Some(Value::Null) => "null",
            Some(Value::Bool(_)) => "boolean",
            Some(Value::Number(_)) => "number",
            Some(Value::String(_)) => "string",
            Some(Value::Array(_)) => "list",
            Some(Value::Object(_)) => "object",
        };
        Self { found }
    }
}

/// Field lookup shared by both decoders. Absent and null fields are `None`.
trait FieldDecoder {
    fn field(&self, key: &str) -> Option<RawValue>;

    fn text(&self, key: &str) -> Option<String> {
        let value = self.field(key)?;
        match value.as_plain()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn decode_result(&self) -> CanonicalResult {
        CanonicalResult {
            success: self.field("success").is_some_and(|v| v.is_truthy()),
            message: self.text("message"),
            formula: self.text("formula"),
            validation: self.field("validation").and_then(|v| validation_of(&v)),
        }
    }

    fn decode_validation(&self) -> CanonicalValidation {
        let confidence_score = self
            .field("confidence_score")
            .and_then(|v| v.as_f64())
            .filter(|score| score.is_finite())
            .map_or(0.0, |score| score.clamp(0.0, 1.0));
        let warnings = self
            .field("warnings")
            .map(|v| v.to_string_list())
            .unwrap_or_default();
        CanonicalValidation {
            confidence_score,
            warnings,
        }
    }
}

/// Reads fields through `has` / `get`.
struct AccessorDecoder<'a>(&'a dyn MappingAccessor);

impl FieldDecoder for AccessorDecoder<'_> {
    fn field(&self, key: &str) -> Option<RawValue> {
        if !self.0.has(key) {
            return None;
        }
        self.0.get(key).filter(|value| !value.is_null())
    }
}

/// Reads fields by direct property lookup.
struct PlainDecoder<'a>(&'a Map<String, Value>);

impl FieldDecoder for PlainDecoder<'_> {
    fn field(&self, key: &str) -> Option<RawValue> {
        self.0
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
            .map(RawValue::Plain)
    }
}

enum Shape<'a> {
    Accessor(AccessorDecoder<'a>),
    Plain(PlainDecoder<'a>),
}

impl Shape<'_> {
    fn decoder(&self) -> &dyn FieldDecoder {
        match self {
            Shape::Accessor(decoder) => decoder,
            Shape::Plain(decoder) => decoder,
        }
    }
}

fn probe(raw: &RawValue) -> Option<Shape<'_>> {
    if let Some(accessor) = raw.as_accessor() {
        return Some(Shape::Accessor(AccessorDecoder(accessor)));
    }
    match raw.as_plain() {
        Some(Value::Object(map)) => Some(Shape::Plain(PlainDecoder(map))),
        _ => None,
    }
}

fn validation_of(raw: &RawValue) -> Option<CanonicalValidation> {
    probe(raw).map(|shape| shape.decoder().decode_validation())
}

/// Decode a discovery response of either shape.
pub fn normalize_result(raw: &RawValue) -> Result<CanonicalResult, UnrecognizedShape> {
    probe(raw)
        .map(|shape| shape.decoder().decode_result())
        .ok_or_else(|| UnrecognizedShape::of(raw))
}

/// Decode the engine's quantity vocabulary of either shape.
pub fn decode_catalog(raw: &RawValue) -> Result<QuantityCatalog, UnrecognizedShape> {
    if let Some(accessor) = raw.as_accessor() {
        return Ok(accessor
            .keys()
            .into_iter()
            .map(|name| {
                let metadata = accessor.get(&name).map_or(Value::Null, |v| v.to_json());
                (name, metadata)
            })
            .collect());
    }
    match raw.as_plain() {
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(name, metadata)| (name.clone(), metadata.clone()))
            .collect()),
        _ => Err(UnrecognizedShape::of(raw)),
    }
}
