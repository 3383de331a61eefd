//! Milvus collection schema model.
//!
//! These types describe the target side of a conversion and serialize to the
//! payload shape accepted by the Milvus REST v2 `collections/create` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Milvus field data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Variable-length string bounded by `max_length`.
    VarChar,
    /// Free-form JSON document.
    #[serde(rename = "JSON")]
    Json,
    /// Homogeneous array bounded by `max_capacity`.
    Array,
    /// Dense float32 vector.
    FloatVector,
    /// Dense IEEE 754 half-precision vector.
    Float16Vector,
    /// Packed binary vector (8 dimensions per byte).
    BinaryVector,
}

impl DataType {
    /// Milvus REST name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::VarChar => "VarChar",
            Self::Json => "JSON",
            Self::Array => "Array",
            Self::FloatVector => "FloatVector",
            Self::Float16Vector => "Float16Vector",
            Self::BinaryVector => "BinaryVector",
        }
    }

    /// Returns true for the dense and binary vector kinds.
    #[must_use]
    pub const fn is_vector(&self) -> bool {
        matches!(
            self,
            Self::FloatVector | Self::Float16Vector | Self::BinaryVector
        )
    }

    /// Types Milvus accepts as a primary key (and as a partition key).
    #[must_use]
    pub const fn is_key_eligible(&self) -> bool {
        matches!(self, Self::Int64 | Self::VarChar)
    }

    /// Returns true for the integer kinds.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field of a target collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name in the target collection.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Primary key flag.
    #[serde(default)]
    pub is_primary: bool,
    /// Value is generated by the server (only meaningful on the primary key).
    #[serde(default)]
    pub auto_id: bool,
    /// Partition key flag.
    #[serde(default)]
    pub is_partition_key: bool,
    /// Maximum length for `VarChar` fields and `VarChar` array elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Vector dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<u32>,
    /// Element type for `Array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<DataType>,
    /// Maximum element count for `Array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
}

impl FieldSchema {
    /// Creates a plain field with no type parameters.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: String::new(),
            is_primary: false,
            auto_id: false,
            is_partition_key: false,
            max_length: None,
            dim: None,
            element_type: None,
            max_capacity: None,
        }
    }

    /// Field entry for the REST `collections/create` payload.
    #[must_use]
    pub fn to_rest_json(&self) -> Value {
        let mut params = serde_json::Map::new();
        if let Some(max_length) = self.max_length {
            params.insert("max_length".to_string(), json!(max_length));
        }
        if let Some(dim) = self.dim {
            params.insert("dim".to_string(), json!(dim));
        }
        if let Some(max_capacity) = self.max_capacity {
            params.insert("max_capacity".to_string(), json!(max_capacity));
        }

        let mut field = json!({
            "fieldName": self.name,
            "dataType": self.data_type.as_str(),
            "isPrimary": self.is_primary,
            "isPartitionKey": self.is_partition_key,
            "description": self.description,
        });
        if let Some(element_type) = self.element_type {
            field["elementDataType"] = json!(element_type.as_str());
        }
        if !params.is_empty() {
            field["elementTypeParams"] = Value::Object(params);
        }
        field
    }
}

/// Name of the primary field added when the source has no key field.
pub const AUTO_ID_FIELD: &str = "auto_id";

/// A complete target collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Ordered field list.
    pub fields: Vec<FieldSchema>,
    /// Collection description.
    #[serde(default)]
    pub description: String,
    /// Accept fields not declared in the schema.
    #[serde(default)]
    pub enable_dynamic_field: bool,
}

impl CollectionSchema {
    /// Returns the primary key field, if any.
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    /// Looks up a field by target name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns a copy with a server-generated `Int64` primary key prepended
    /// when no field is primary. Schemas that already have a key are
    /// returned unchanged.
    #[must_use]
    pub fn with_auto_id_fallback(&self) -> Self {
        if self.primary_field().is_some() {
            return self.clone();
        }
        let mut pk = FieldSchema::new(AUTO_ID_FIELD, DataType::Int64);
        pk.is_primary = true;
        pk.auto_id = true;
        pk.description = "Auto-generated primary key".to_string();

        let mut schema = self.clone();
        schema.fields.insert(0, pk);
        schema
    }

    /// Schema object for the REST `collections/create` payload.
    #[must_use]
    pub fn to_rest_json(&self) -> Value {
        json!({
            "autoId": self.fields.iter().any(|f| f.is_primary && f.auto_id),
            "enableDynamicField": self.enable_dynamic_field,
            "description": self.description,
            "fields": self.fields.iter().map(FieldSchema::to_rest_json).collect::<Vec<_>>(),
        })
    }
}
