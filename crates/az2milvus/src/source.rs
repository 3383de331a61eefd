//! Source index definition.
//!
//! [`SourceIndex`] is the one shape the schema converter works on. It is
//! produced by two independent paths:
//!
//! - [`AzureIndexDefinition`]: typed model of the index returned by the Azure
//!   AI Search REST API (`GET /indexes/{name}`), converted with `From`.
//! - [`SourceIndex::from_json`]: lenient adapter for exported definition
//!   files. Missing keys become empty collections, never errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type identifier substituted for fields that carry sub-fields.
pub const COMPLEX_TYPE: &str = "Edm.ComplexType";

/// A source index as seen by the converter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIndex {
    /// Index name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<SourceField>,
    /// Vector search configuration, if the index has one.
    pub vector_search: Option<VectorSearchConfig>,
    /// Scoring profile names.
    pub scoring_profiles: Vec<String>,
    /// Suggester names.
    pub suggesters: Vec<String>,
    /// Legacy `semanticSettings` block present.
    pub semantic_settings: bool,
    /// Current `semantic` block present.
    pub semantic_search: bool,
}

/// A source field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceField {
    /// Field name.
    pub name: String,
    /// EDM type identifier, e.g. `Edm.String` or `Collection(Edm.Single)`.
    pub field_type: String,
    /// Document key flag.
    pub key: bool,
    /// Vector search profile reference.
    pub vector_profile: Option<String>,
    /// Declared vector dimensions.
    pub dimensions: Option<u32>,
    /// Nested fields of a complex type.
    pub sub_fields: Vec<SourceField>,
}

impl SourceField {
    /// Creates a plain field.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            ..Self::default()
        }
    }

    /// Marks the field as the document key.
    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Attaches a vector profile and dimension count.
    #[must_use]
    pub fn vector(mut self, profile: impl Into<String>, dimensions: u32) -> Self {
        self.vector_profile = Some(profile.into());
        self.dimensions = Some(dimensions);
        self
    }

    /// Type the converter resolves: complex when sub-fields exist.
    #[must_use]
    pub fn effective_type(&self) -> &str {
        if self.sub_fields.is_empty() {
            &self.field_type
        } else {
            COMPLEX_TYPE
        }
    }

    /// Vector-ness: a profile reference, or dimensions on a collection type.
    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.vector_profile.is_some()
            || (self.effective_type().starts_with("Collection(Edm.") && self.dimensions.is_some())
    }
}

/// Named algorithms and the profiles that reference them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    /// Algorithm configurations.
    pub algorithms: Vec<VectorAlgorithm>,
    /// Vector profiles.
    pub profiles: Vec<VectorProfile>,
}

impl VectorSearchConfig {
    /// Looks up an algorithm by name.
    #[must_use]
    pub fn algorithm(&self, name: &str) -> Option<&VectorAlgorithm> {
        self.algorithms.iter().find(|a| a.name == name)
    }

    /// Looks up a profile by name.
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&VectorProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

/// A vector search algorithm configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorAlgorithm {
    /// Configuration name.
    pub name: String,
    /// `hnsw` or `exhaustiveKnn`.
    pub kind: String,
    /// Metric name; `None` means the service default (cosine).
    pub metric: Option<String>,
    /// HNSW tunables (empty for exhaustive KNN).
    pub tunables: HnswTunables,
}

impl VectorAlgorithm {
    /// Metric name with the service default applied.
    #[must_use]
    pub fn metric_or_default(&self) -> &str {
        self.metric.as_deref().unwrap_or("cosine")
    }
}

/// HNSW tunables; absent values take the mapper's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswTunables {
    /// Neighbor count.
    pub m: Option<u32>,
    /// Construction breadth.
    pub ef_construction: Option<u32>,
    /// Search breadth.
    pub ef_search: Option<u32>,
}

/// A named vector profile referencing one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorProfile {
    /// Profile name.
    pub name: String,
    /// Referenced algorithm configuration name.
    pub algorithm: String,
}

// =============================================================================
// Lenient JSON adapter
// =============================================================================

fn str_of(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn u32_of(v: &Value, key: &str) -> Option<u32> {
    v.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn array_of<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// JSON truthiness used for presence-only blocks.
fn present(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(_)) => true,
    }
}

fn names_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|item| str_of(item, "name").unwrap_or_default())
        .collect()
}

fn field_from_json(v: &Value) -> SourceField {
    SourceField {
        name: str_of(v, "name").unwrap_or_default(),
        field_type: str_of(v, "type").unwrap_or_default(),
        key: v.get("key").and_then(Value::as_bool).unwrap_or(false),
        vector_profile: str_of(v, "vectorSearchProfile"),
        dimensions: u32_of(v, "dimensions"),
        sub_fields: array_of(v, "fields").iter().map(field_from_json).collect(),
    }
}

fn algorithm_from_json(v: &Value) -> VectorAlgorithm {
    let hnsw = v.get("hnswParameters").filter(|p| present(Some(*p)));
    let knn = v.get("exhaustiveKnnParameters").filter(|p| present(Some(*p)));

    let tunables = hnsw.map_or_else(HnswTunables::default, |p| HnswTunables {
        m: u32_of(p, "m"),
        ef_construction: u32_of(p, "efConstruction"),
        ef_search: u32_of(p, "efSearch"),
    });
    let metric = hnsw
        .and_then(|p| str_of(p, "metric"))
        .or_else(|| knn.and_then(|p| str_of(p, "metric")));

    VectorAlgorithm {
        name: str_of(v, "name").unwrap_or_default(),
        kind: str_of(v, "kind").unwrap_or_else(|| "hnsw".to_string()),
        metric,
        tunables,
    }
}

fn profile_from_json(v: &Value) -> VectorProfile {
    VectorProfile {
        name: str_of(v, "name").unwrap_or_default(),
        algorithm: str_of(v, "algorithm")
            .or_else(|| str_of(v, "algorithmConfigurationName"))
            .unwrap_or_default(),
    }
}

impl SourceIndex {
    /// Builds a source index from an exported JSON definition.
    ///
    /// Never fails. A missing name becomes `"unknown"`; missing lists become
    /// empty. Profiles may name their algorithm under `algorithm` or
    /// `algorithmConfigurationName`.
    #[must_use]
    pub fn from_json(v: &Value) -> Self {
        let vector_search = v
            .get("vectorSearch")
            .filter(|vs| present(Some(*vs)))
            .map(|vs| VectorSearchConfig {
                algorithms: array_of(vs, "algorithms")
                    .iter()
                    .map(algorithm_from_json)
                    .collect(),
                profiles: array_of(vs, "profiles")
                    .iter()
                    .map(profile_from_json)
                    .collect(),
            });

        Self {
            name: str_of(v, "name").unwrap_or_else(|| "unknown".to_string()),
            fields: array_of(v, "fields").iter().map(field_from_json).collect(),
            vector_search,
            scoring_profiles: names_of(array_of(v, "scoringProfiles")),
            suggesters: names_of(array_of(v, "suggesters")),
            semantic_settings: present(v.get("semanticSettings")),
            semantic_search: present(v.get("semantic")),
        }
    }

    /// Returns the key field, if the index declares one.
    #[must_use]
    pub fn key_field(&self) -> Option<&SourceField> {
        self.fields.iter().find(|f| f.key)
    }
}

// =============================================================================
// Typed REST model
// =============================================================================

/// Index definition as returned by `GET /indexes/{name}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureIndexDefinition {
    /// Index name.
    pub name: String,
    /// Field definitions.
    #[serde(default)]
    pub fields: Vec<AzureField>,
    /// Vector search block.
    #[serde(default)]
    pub vector_search: Option<AzureVectorSearch>,
    /// Scoring profiles.
    #[serde(default)]
    pub scoring_profiles: Vec<AzureNamed>,
    /// Suggesters.
    #[serde(default)]
    pub suggesters: Vec<AzureNamed>,
    /// Semantic ranker configuration.
    #[serde(default)]
    pub semantic: Option<Value>,
}

/// REST field definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureField {
    /// Field name.
    pub name: String,
    /// EDM type.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Key flag.
    #[serde(default)]
    pub key: bool,
    /// Vector dimensions.
    #[serde(default)]
    pub dimensions: Option<u32>,
    /// Vector profile name.
    #[serde(default)]
    pub vector_search_profile: Option<String>,
    /// Sub-fields of a complex type.
    #[serde(default)]
    pub fields: Vec<AzureField>,
}

/// REST `vectorSearch` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureVectorSearch {
    /// Algorithm configurations.
    #[serde(default)]
    pub algorithms: Vec<AzureAlgorithm>,
    /// Profiles.
    #[serde(default)]
    pub profiles: Vec<AzureProfile>,
}

/// REST algorithm configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureAlgorithm {
    /// Configuration name.
    pub name: String,
    /// Algorithm kind.
    pub kind: String,
    /// HNSW parameters.
    #[serde(default)]
    pub hnsw_parameters: Option<AzureHnswParameters>,
    /// Exhaustive KNN parameters.
    #[serde(default)]
    pub exhaustive_knn_parameters: Option<AzureKnnParameters>,
}

/// REST HNSW parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureHnswParameters {
    /// Neighbor count.
    #[serde(default)]
    pub m: Option<u32>,
    /// Construction breadth.
    #[serde(default)]
    pub ef_construction: Option<u32>,
    /// Search breadth.
    #[serde(default)]
    pub ef_search: Option<u32>,
    /// Metric.
    #[serde(default)]
    pub metric: Option<String>,
}

/// REST exhaustive KNN parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureKnnParameters {
    /// Metric.
    #[serde(default)]
    pub metric: Option<String>,
}

/// REST vector profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureProfile {
    /// Profile name.
    pub name: String,
    /// Algorithm configuration name.
    pub algorithm: String,
}

/// Any REST object identified by name.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureNamed {
    /// Object name.
    pub name: String,
}

impl From<AzureField> for SourceField {
    fn from(f: AzureField) -> Self {
        Self {
            name: f.name,
            field_type: f.field_type,
            key: f.key,
            vector_profile: f.vector_search_profile,
            dimensions: f.dimensions,
            sub_fields: f.fields.into_iter().map(Self::from).collect(),
        }
    }
}

impl From<AzureAlgorithm> for VectorAlgorithm {
    fn from(a: AzureAlgorithm) -> Self {
        let (tunables, hnsw_metric) = match a.hnsw_parameters {
            Some(p) => (
                HnswTunables {
                    m: p.m,
                    ef_construction: p.ef_construction,
                    ef_search: p.ef_search,
                },
                p.metric,
            ),
            None => (HnswTunables::default(), None),
        };
        let metric = hnsw_metric.or_else(|| a.exhaustive_knn_parameters.and_then(|p| p.metric));

        Self {
            name: a.name,
            kind: a.kind,
            metric,
            tunables,
        }
    }
}

impl From<AzureIndexDefinition> for SourceIndex {
    fn from(def: AzureIndexDefinition) -> Self {
        let vector_search = def.vector_search.map(|vs| VectorSearchConfig {
            algorithms: vs.algorithms.into_iter().map(VectorAlgorithm::from).collect(),
            profiles: vs
                .profiles
                .into_iter()
                .map(|p| VectorProfile {
                    name: p.name,
                    algorithm: p.algorithm,
                })
                .collect(),
        });

        Self {
            name: def.name,
            fields: def.fields.into_iter().map(SourceField::from).collect(),
            vector_search,
            scoring_profiles: def.scoring_profiles.into_iter().map(|s| s.name).collect(),
            suggesters: def.suggesters.into_iter().map(|s| s.name).collect(),
            semantic_settings: false,
            semantic_search: present(def.semantic.as_ref()),
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
