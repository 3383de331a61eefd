//! Azure AI Search EDM type → Milvus `DataType` resolution.
//!
//! Azure AI Search field types follow the OData Entity Data Model (`Edm.*`).
//! Three fixed tables cover scalars, non-vector collections and vector
//! collections. They are built once on first use and never mutated.
//!
//! | Azure type | Milvus type | Confidence |
//! |------------|-------------|------------|
//! | `Edm.String` | `VarChar` | exact |
//! | `Edm.DateTimeOffset` | `VarChar` (ISO 8601) | semantic |
//! | `Edm.GeographyPoint` | `JSON` (GeoJSON point) | semantic |
//! | `Edm.Byte` | `Int16` | lossless |
//! | `Collection(Edm.Single)` | `FloatVector` | exact |
//! | `Collection(Edm.SByte)` | `FloatVector` | lossy |
//! | `Collection(Edm.Byte)` | `BinaryVector` | exact |
//!
//! Unknown identifiers resolve to `JSON` with [`MappingConfidence::Unsupported`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::collection::DataType;

/// How faithfully a conversion preserves meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingConfidence {
    /// Same representation on both sides.
    Exact,
    /// Safe upcast, no data loss.
    Lossless,
    /// Precision or representation may be lost.
    Lossy,
    /// Different structure, equivalent meaning.
    Semantic,
    /// No Milvus counterpart.
    Unsupported,
}

impl MappingConfidence {
    /// Lowercase label used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Lossless => "lossless",
            Self::Lossy => "lossy",
            Self::Semantic => "semantic",
            Self::Unsupported => "unsupported",
        }
    }
}

/// How one Azure type maps onto Milvus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Azure EDM type identifier.
    pub edm_type: String,
    /// Resolved Milvus type.
    pub milvus_type: DataType,
    /// Conversion confidence.
    pub confidence: MappingConfidence,
    /// Whether the target is a vector kind.
    pub is_vector: bool,
    /// Element type, set only for `Array` targets.
    pub element_type: Option<DataType>,
    /// Default `max_length`, set only for `VarChar` targets that need a non-global default.
    pub default_max_length: Option<u32>,
    /// Free-form notes for reports.
    pub notes: String,
    /// Caveats surfaced as conversion warnings.
    pub warnings: Vec<String>,
}

impl TypeMapping {
    fn new(edm_type: &str, milvus_type: DataType, confidence: MappingConfidence) -> Self {
        Self {
            edm_type: edm_type.to_string(),
            milvus_type,
            confidence,
            is_vector: milvus_type.is_vector(),
            element_type: None,
            default_max_length: None,
            notes: String::new(),
            warnings: Vec::new(),
        }
    }

    fn element(mut self, element_type: DataType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    fn max_length(mut self, max_length: u32) -> Self {
        self.default_max_length = Some(max_length);
        self
    }

    fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    fn warn(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }

    /// Fallback for identifiers missing from every table.
    fn unrecognized(edm_type: &str) -> Self {
        Self::new(edm_type, DataType::Json, MappingConfidence::Unsupported)
            .notes(&format!("Unknown type '{edm_type}': stored as JSON"))
            .warn(&format!(
                "Type '{edm_type}' is not recognized; values will be stored in a JSON field"
            ))
    }
}

type Table = HashMap<String, TypeMapping>;

fn table(entries: Vec<TypeMapping>) -> Table {
    entries
        .into_iter()
        .map(|m| (m.edm_type.clone(), m))
        .collect()
}

fn scalar_types() -> &'static Table {
    static SCALARS: OnceLock<Table> = OnceLock::new();
    SCALARS.get_or_init(|| {
        use MappingConfidence::{Exact, Lossless, Semantic};
        table(vec![
            TypeMapping::new("Edm.String", DataType::VarChar, Exact)
                .max_length(65_535)
                .notes("searchable/filterable attributes have no Milvus equivalent and are dropped"),
            TypeMapping::new("Edm.Int32", DataType::Int32, Exact),
            TypeMapping::new("Edm.Int64", DataType::Int64, Exact),
            TypeMapping::new("Edm.Double", DataType::Double, Exact),
            TypeMapping::new("Edm.Single", DataType::Float, Exact)
                .notes("Scalar Edm.Single; vectors use Collection(Edm.Single)"),
            TypeMapping::new("Edm.Boolean", DataType::Bool, Exact),
            TypeMapping::new("Edm.DateTimeOffset", DataType::VarChar, Semantic)
                .max_length(64)
                .notes("Stored as an ISO 8601 string; Milvus has no native datetime type")
                .warn(
                    "Date range filters become lexical string comparisons, not temporal \
                     comparisons; only uniformly formatted UTC timestamps compare correctly",
                ),
            TypeMapping::new("Edm.GeographyPoint", DataType::Json, Semantic)
                .notes(r#"Stored as JSON {"type":"Point","coordinates":[lon,lat]}"#)
                .warn(
                    "Milvus has no geospatial index or distance predicate; \
                     geo.distance() filters cannot be migrated",
                ),
            TypeMapping::new("Edm.ComplexType", DataType::Json, Semantic)
                .notes("Complex types are flattened into a JSON field")
                .warn(
                    "Nested filters such as rooms/any() must be rewritten as Milvus \
                     JSON path expressions",
                ),
            TypeMapping::new("Edm.Byte", DataType::Int16, Lossless)
                .notes("Milvus has no unsigned 8-bit type; upcast to Int16"),
            TypeMapping::new("Edm.Int16", DataType::Int16, Exact),
            TypeMapping::new("Edm.SByte", DataType::Int8, Exact),
        ])
    })
}

fn collection_types() -> &'static Table {
    static COLLECTIONS: OnceLock<Table> = OnceLock::new();
    COLLECTIONS.get_or_init(|| {
        use MappingConfidence::Exact;
        table(vec![
            TypeMapping::new("Collection(Edm.String)", DataType::Array, Exact)
                .element(DataType::VarChar)
                .notes("String collection mapped to ARRAY(VarChar)"),
            TypeMapping::new("Collection(Edm.Int32)", DataType::Array, Exact)
                .element(DataType::Int32),
            TypeMapping::new("Collection(Edm.Int64)", DataType::Array, Exact)
                .element(DataType::Int64),
            TypeMapping::new("Collection(Edm.Double)", DataType::Array, Exact)
                .element(DataType::Double),
        ])
    })
}

fn vector_types() -> &'static Table {
    static VECTORS: OnceLock<Table> = OnceLock::new();
    VECTORS.get_or_init(|| {
        use MappingConfidence::{Exact, Lossy};
        table(vec![
            TypeMapping::new("Collection(Edm.Single)", DataType::FloatVector, Exact)
                .notes(
                    "float32 vector, parameters map 1:1; treated as a vector even without a \
                     vector profile, so a plain float array of this type is misclassified",
                ),
            TypeMapping::new("Collection(Edm.Half)", DataType::Float16Vector, Exact)
                .notes("float16 vector, maps directly to FLOAT16_VECTOR"),
            TypeMapping::new("Collection(Edm.Int16)", DataType::FloatVector, Lossy)
                .notes("int16 quantized vector upcast to float32; Milvus has no INT16 vector")
                .warn("int16 to float32 conversion roughly doubles vector memory usage")
                .warn(
                    "Search quality is comparable but the original quantization \
                     semantics are lost",
                ),
            TypeMapping::new("Collection(Edm.SByte)", DataType::FloatVector, Lossy)
                .notes("int8 quantized vector upcast to float32; Milvus has no INT8 vector")
                .warn("int8 to float32 conversion roughly quadruples vector memory usage")
                .warn("Re-encode with the source embedding model and load float32 vectors instead"),
            TypeMapping::new("Collection(Edm.Byte)", DataType::BinaryVector, Exact)
                .notes("Packed-bit binary vector, maps directly to BINARY_VECTOR"),
        ])
    })
}

/// Resolves an Azure EDM type to its Milvus mapping.
///
/// Resolution order, first match wins:
///
/// 1. flagged vector field with a known vector type
/// 2. known vector type even without the flag
/// 3. known non-vector collection
/// 4. known scalar
/// 5. JSON fallback with [`MappingConfidence::Unsupported`]
///
/// Step 2 is a heuristic: `Collection(Edm.Single)` and friends hold embeddings
/// in nearly every Azure index, so an unflagged field of that type is still
/// treated as a vector. A genuine scalar float array sharing the identifier
/// is misclassified; the mapping's notes say so in reports.
#[must_use]
pub fn resolve_type(edm_type: &str, is_vector_field: bool) -> TypeMapping {
    if is_vector_field {
        if let Some(m) = vector_types().get(edm_type) {
            return m.clone();
        }
    }

    if let Some(m) = vector_types().get(edm_type) {
        return m.clone();
    }

    if let Some(m) = collection_types().get(edm_type) {
        return m.clone();
    }

    if let Some(m) = scalar_types().get(edm_type) {
        return m.clone();
    }

    TypeMapping::unrecognized(edm_type)
}

/// Every known mapping: scalars, collections, then vectors.
#[must_use]
pub fn all_mappings() -> Vec<TypeMapping> {
    let mut mappings = Vec::new();
    for t in [scalar_types(), collection_types(), vector_types()] {
        let mut group: Vec<TypeMapping> = t.values().cloned().collect();
        group.sort_by(|a, b| a.edm_type.cmp(&b.edm_type));
        mappings.extend(group);
    }
    mappings
}

/// Azure-only features with no Milvus counterpart, keyed by feature identifier.
pub const UNSUPPORTED_FEATURES: &[(&str, &str)] = &[
    (
        "scoringProfiles",
        "Scoring profiles have no Milvus equivalent; implement ranking logic in the application layer.",
    ),
    (
        "suggesters",
        "Suggesters (autocomplete) have no Milvus equivalent; use prefix queries or an application-side implementation.",
    ),
    (
        "semanticConfiguration",
        "The semantic ranker is specific to Azure AI Search; integrate a reranker model (e.g. a cross-encoder) with Milvus.",
    ),
    (
        "skillsets",
        "AI enrichment skillsets are an Azure ingestion pipeline; build the ingestion pipeline separately.",
    ),
    (
        "indexers",
        "Indexers automate Azure ingestion; consider Kafka/Spark connectors or CDC pipelines for Milvus.",
    ),
    (
        "synonymMaps",
        "Synonym maps are not supported; expand queries in the application or rely on the embedding model.",
    ),
    (
        "encryptionKey",
        "Customer-managed keys are Azure specific; use disk or cloud volume encryption for Milvus.",
    ),
    (
        "geo.distance()",
        "geo.distance() has no Milvus counterpart; pair Milvus with a geospatial store such as PostGIS.",
    ),
];

/// Description of an unsupported feature, if it is catalogued.
#[must_use]
pub fn unsupported_feature_description(feature: &str) -> Option<&'static str> {
    UNSUPPORTED_FEATURES
        .iter()
        .find(|(key, _)| *key == feature)
        .map(|(_, desc)| *desc)
}

#[cfg(test)]
#[path = "type_mapping_tests.rs"]
mod tests;
