//! Document transformation: Azure AI Search documents → Milvus rows.
//!
//! A [`DataTransformer`] is built from the field conversions of a schema
//! conversion and coerces each source value to its target field type.
//! A document is dropped when its key is missing or a value cannot be
//! coerced; every other gap is filled with the type's default.

use base64::Engine;
use half::f16;
use serde_json::{json, Map, Number, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::collection::DataType;
use crate::config::VARCHAR_LIMIT;
use crate::schema_converter::FieldConversion;

/// A value coerced to a Milvus field type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `Bool`.
    Bool(bool),
    /// Any integer kind, range-checked against the target width.
    Int(i64),
    /// `Float` or `Double`; Milvus narrows `Float` on insert.
    Float(f64),
    /// `VarChar`.
    Text(String),
    /// `JSON`.
    Json(Value),
    /// `Array` elements, already coerced to the element type.
    Array(Vec<Value>),
    /// `FloatVector`.
    FloatVector(Vec<f32>),
    /// `Float16Vector` (little-endian IEEE 754 half) or `BinaryVector`.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// JSON form for the Milvus REST insert payload. Byte vectors are base64.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => json!(i),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Json(v) => v.clone(),
            Self::Array(items) => Value::Array(items.clone()),
            Self::FloatVector(v) => json!(v),
            Self::Bytes(bytes) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

/// A transformed document keyed by target field name.
pub type TargetRecord = BTreeMap<String, FieldValue>;

/// Converts a target record into a JSON row.
#[must_use]
pub fn record_to_json(record: &TargetRecord) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<String, Value>>(),
    )
}

/// Why a document was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The primary key value is absent or null.
    MissingKey(String),
    /// A value could not be coerced to its target type.
    InvalidValue {
        /// Source field name.
        field: String,
        /// Coercion failure.
        reason: String,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey(field) => write!(f, "missing key field '{field}'"),
            Self::InvalidValue { field, reason } => write!(f, "field '{field}': {reason}"),
        }
    }
}

/// A dropped document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDocument {
    /// Document key, when the document has one.
    pub key: Option<String>,
    /// Reason.
    pub rejection: Rejection,
}

/// Result of transforming a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Transformed records, in source order.
    pub records: Vec<TargetRecord>,
    /// Dropped documents, in source order.
    pub rejected: Vec<RejectedDocument>,
}

#[derive(Debug, Clone)]
struct FieldPlan {
    source_name: String,
    target_name: String,
    data_type: DataType,
    element_type: Option<DataType>,
    max_length: usize,
    is_key: bool,
}

/// Coerces source documents into target records.
#[derive(Debug, Clone)]
pub struct DataTransformer {
    plans: Vec<FieldPlan>,
    key_field: Option<String>,
}

/// Renders a key value as the string stored in checkpoints.
#[must_use]
pub fn key_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl DataTransformer {
    /// Builds a transformer from field conversions, ignoring skipped fields.
    #[must_use]
    pub fn new(conversions: &[FieldConversion]) -> Self {
        let mut key_field = None;
        let plans = conversions
            .iter()
            .filter(|fc| !fc.skipped)
            .filter_map(|fc| {
                let target = fc.target_field.as_ref()?;
                if fc.is_primary_key {
                    key_field = Some(fc.source_name.clone());
                }
                Some(FieldPlan {
                    source_name: fc.source_name.clone(),
                    target_name: target.name.clone(),
                    data_type: target.data_type,
                    element_type: target.element_type,
                    max_length: target.max_length.unwrap_or(VARCHAR_LIMIT) as usize,
                    is_key: fc.is_primary_key,
                })
            })
            .collect();
        Self { plans, key_field }
    }

    /// Source name of the primary key field.
    #[must_use]
    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Key of a source document, if the index has a key and the document carries it.
    #[must_use]
    pub fn document_key(&self, doc: &Map<String, Value>) -> Option<String> {
        self.key_field
            .as_ref()
            .and_then(|k| doc.get(k))
            .and_then(key_to_string)
    }

    /// Transforms one document, reporting why it was dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the key is missing or a value cannot be coerced.
    pub fn try_transform(&self, doc: &Map<String, Value>) -> Result<TargetRecord, Rejection> {
        let mut record = TargetRecord::new();

        for plan in &self.plans {
            let value = match doc.get(&plan.source_name) {
                None | Some(Value::Null) => {
                    if plan.is_key {
                        return Err(Rejection::MissingKey(plan.source_name.clone()));
                    }
                    match default_value(plan.data_type) {
                        Some(v) => v,
                        None => continue,
                    }
                }
                Some(v) => coerce(v, plan).map_err(|reason| Rejection::InvalidValue {
                    field: plan.source_name.clone(),
                    reason,
                })?,
            };
            record.insert(plan.target_name.clone(), value);
        }

        Ok(record)
    }

    /// Transforms one document; `None` when it has to be dropped.
    #[must_use]
    pub fn transform_document(&self, doc: &Map<String, Value>) -> Option<TargetRecord> {
        match self.try_transform(doc) {
            Ok(record) => Some(record),
            Err(rejection) => {
                warn!(key = ?self.document_key(doc), %rejection, "Skipping document");
                None
            }
        }
    }

    /// Transforms a batch, keeping the successful records in order.
    #[must_use]
    pub fn transform_batch(&self, docs: &[Map<String, Value>]) -> Vec<TargetRecord> {
        docs.iter()
            .filter_map(|doc| self.transform_document(doc))
            .collect()
    }

    /// Transforms a batch and reports the dropped documents.
    #[must_use]
    pub fn transform_batch_detailed(&self, docs: &[Map<String, Value>]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for doc in docs {
            match self.try_transform(doc) {
                Ok(record) => outcome.records.push(record),
                Err(rejection) => {
                    let key = self.document_key(doc);
                    warn!(key = ?key, %rejection, "Skipping document");
                    outcome.rejected.push(RejectedDocument { key, rejection });
                }
            }
        }
        outcome
    }
}

/// Default for an absent value; `None` means the field is omitted.
fn default_value(data_type: DataType) -> Option<FieldValue> {
    match data_type {
        DataType::VarChar => Some(FieldValue::Text(String::new())),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            Some(FieldValue::Int(0))
        }
        DataType::Float | DataType::Double => Some(FieldValue::Float(0.0)),
        DataType::Bool => Some(FieldValue::Bool(false)),
        DataType::Json => Some(FieldValue::Json(Value::Object(Map::new()))),
        DataType::Array => Some(FieldValue::Array(Vec::new())),
        DataType::FloatVector | DataType::Float16Vector | DataType::BinaryVector => None,
    }
}

type Coerced<T> = std::result::Result<T, String>;

fn coerce(value: &Value, plan: &FieldPlan) -> Coerced<FieldValue> {
    match plan.data_type {
        DataType::VarChar => Ok(FieldValue::Text(to_text(value, plan.max_length))),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            to_int(value, plan.data_type).map(FieldValue::Int)
        }
        DataType::Float | DataType::Double => to_float(value).map(FieldValue::Float),
        DataType::Bool => Ok(FieldValue::Bool(truthy(value))),
        DataType::Json => to_json_value(value).map(FieldValue::Json),
        DataType::Array => to_array(value, plan).map(FieldValue::Array),
        DataType::FloatVector => to_float_vector(value).map(FieldValue::FloatVector),
        DataType::Float16Vector => to_float16_bytes(value).map(FieldValue::Bytes),
        DataType::BinaryVector => to_binary_bytes(value).map(FieldValue::Bytes),
    }
}

/// Cuts `s` to at most `max_bytes` bytes on a character boundary.
#[must_use]
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn to_text(value: &Value, max_length: usize) -> String {
    match value {
        Value::String(s) => truncate_utf8(s, max_length).to_string(),
        other => truncate_utf8(&other.to_string(), max_length).to_string(),
    }
}

fn int_bounds(data_type: DataType) -> (i64, i64) {
    match data_type {
        DataType::Int8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
        DataType::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
        DataType::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        _ => (i64::MIN, i64::MAX),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_int(value: &Value, data_type: DataType) -> Coerced<i64> {
    let n = match value {
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.is_finite() && f.abs() < 9.2e18 => f.trunc() as i64,
            _ => return Err(format!("{n} does not fit in {data_type}")),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{s}' is not an integer"))?,
        other => return Err(format!("cannot convert {} to {data_type}", kind(other))),
    };
    let (min, max) = int_bounds(data_type);
    if n < min || n > max {
        return Err(format!("{n} is out of range for {data_type}"));
    }
    Ok(n)
}

fn to_float(value: &Value) -> Coerced<f64> {
    let f = match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a float")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number")),
        other => Err(format!("cannot convert {} to a float", kind(other))),
    }?;
    finite(f)
}

/// Milvus rejects NaN and infinities, which Azure reports as `"NaN"`, `"INF"`, `"-INF"`.
fn finite(f: f64) -> Coerced<f64> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(format!("{f} is not a finite number"))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn to_json_value(value: &Value) -> Coerced<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value.clone()),
        Value::String(s) => {
            serde_json::from_str(s).map_err(|e| format!("invalid JSON text: {e}"))
        }
        scalar => Ok(json!({ "value": scalar })),
    }
}

fn to_element(value: &Value, element_type: Option<DataType>, max_length: usize) -> Coerced<Value> {
    match element_type {
        Some(DataType::VarChar) => Ok(Value::String(to_text(value, max_length))),
        Some(dt) if dt.is_integer() => to_int(value, dt).map(|i| json!(i)),
        Some(DataType::Float | DataType::Double) => to_float(value).map(|f| json!(f)),
        Some(DataType::Bool) => Ok(Value::Bool(truthy(value))),
        _ => Ok(value.clone()),
    }
}

fn to_array(value: &Value, plan: &FieldPlan) -> Coerced<Vec<Value>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| to_element(v, plan.element_type, plan.max_length))
            .collect(),
        single => Ok(vec![to_element(single, plan.element_type, plan.max_length)?]),
    }
}

fn decode_base64(s: &str) -> Coerced<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map_err(|e| format!("invalid base64 vector: {e}"))
}

#[allow(clippy::cast_possible_truncation)]
fn to_float_vector(value: &Value) -> Coerced<Vec<f32>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                let f = v
                    .as_f64()
                    .ok_or_else(|| format!("vector element {v} is not a number"))?;
                let narrowed = f as f32;
                if narrowed.is_finite() {
                    Ok(narrowed)
                } else {
                    Err(format!("vector element {v} overflows float32"))
                }
            })
            .collect(),
        // Raw bytes: each byte is read as an unsigned magnitude
        Value::String(s) => Ok(decode_base64(s)?.into_iter().map(f32::from).collect()),
        other => Err(format!("cannot convert {} to a float vector", kind(other))),
    }
}

fn to_float16_bytes(value: &Value) -> Coerced<Vec<u8>> {
    match value {
        Value::Array(items) => {
            let mut buf = Vec::with_capacity(items.len() * 2);
            for v in items {
                let f = v
                    .as_f64()
                    .ok_or_else(|| format!("vector element {v} is not a number"))?;
                let half = f16::from_f64(f);
                if !half.is_finite() {
                    return Err(format!("vector element {v} overflows float16"));
                }
                buf.extend_from_slice(&half.to_le_bytes());
            }
            Ok(buf)
        }
        Value::String(s) => decode_base64(s),
        other => Err(format!("cannot convert {} to a float16 vector", kind(other))),
    }
}

fn to_binary_bytes(value: &Value) -> Coerced<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| format!("binary vector element {v} is not a byte"))
            })
            .collect(),
        Value::String(s) => decode_base64(s),
        other => Err(format!("cannot convert {} to a binary vector", kind(other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
