//! Schema conversion: Azure AI Search index → Milvus collection schema.
//!
//! The converter is a total function over a [`SourceIndex`]: unknown types and
//! algorithms degrade to documented defaults, and every issue surfaces as a
//! [`ConversionWarning`] on the result instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::collection::{CollectionSchema, DataType, FieldSchema};
use crate::config::{FieldOverride, MigrationOptions};
use crate::index_mapping::{map_vector_index, MilvusIndexConfig};
use crate::source::{HnswTunables, SourceField, SourceIndex, VectorSearchConfig};
use crate::type_mapping::{resolve_type, unsupported_feature_description, MappingConfidence, TypeMapping};

/// Result of converting a single source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConversion {
    /// Source field name.
    pub source_name: String,
    /// Source EDM type (after complex-type substitution).
    pub source_type: String,
    /// Target field, `None` when skipped.
    pub target_field: Option<FieldSchema>,
    /// Mapping used for the conversion.
    pub mapping: TypeMapping,
    /// Field left out of the target schema.
    pub skipped: bool,
    /// Why the field was skipped.
    pub skip_reason: String,
    /// New target name, empty when unchanged.
    pub renamed_to: String,
    /// Field is the source document key.
    pub is_primary_key: bool,
    /// Vector profile referenced by the source field.
    pub vector_profile: Option<String>,
}

impl FieldConversion {
    /// Name of the field in the target collection.
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target_field
            .as_ref()
            .map_or(self.source_name.as_str(), |f| f.name.as_str())
    }
}

/// Result of converting the vector index of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConversion {
    /// Source profile name, empty when defaults were used.
    pub source_profile: String,
    /// Source algorithm kind.
    pub source_algorithm_kind: String,
    /// Source metric.
    pub source_metric: String,
    /// Resolved Milvus index.
    pub milvus_config: MilvusIndexConfig,
    /// Target vector field.
    pub target_field: String,
}

/// Warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    /// Caveat carried by a type mapping.
    TypeMapping,
    /// Conversion loses precision or representation.
    TypeLossy,
    /// Schema-level issue.
    Schema,
    /// Source feature with no target counterpart.
    UnsupportedFeature,
    /// Partition key assignment refused.
    PartitionKey,
}

impl WarningCategory {
    /// Snake-case label used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMapping => "type_mapping",
            Self::TypeLossy => "type_lossy",
            Self::Schema => "schema",
            Self::UnsupportedFeature => "unsupported_feature",
            Self::PartitionKey => "partition_key",
        }
    }
}

/// A warning raised during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    /// Category.
    pub category: WarningCategory,
    /// Message.
    pub message: String,
    /// Source field the warning is about, empty for index-level warnings.
    pub field_name: String,
}

impl ConversionWarning {
    fn new(category: WarningCategory, message: impl Into<String>, field_name: &str) -> Self {
        Self {
            category,
            message: message.into(),
            field_name: field_name.to_string(),
        }
    }
}

/// Complete result of a schema conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConversionResult {
    /// Source index name.
    pub source_index: String,
    /// Target collection name.
    pub collection_name: String,
    /// Target schema, without the auto-id fallback.
    pub schema: CollectionSchema,
    /// One entry per source field, in source order.
    pub field_conversions: Vec<FieldConversion>,
    /// One entry per converted vector field.
    pub index_conversions: Vec<IndexConversion>,
    /// Conversion warnings.
    pub warnings: Vec<ConversionWarning>,
    /// Unsupported feature identifiers, each at most once.
    pub unsupported_features: Vec<String>,
}

/// Totals over a [`SchemaConversionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// Source index name.
    pub source_index: String,
    /// Target collection name.
    pub collection_name: String,
    /// Source fields.
    pub fields_total: usize,
    /// Fields present in the target.
    pub fields_converted: usize,
    /// Fields left out.
    pub fields_skipped: usize,
    /// Vector fields.
    pub vector_fields: usize,
    /// Vector indexes.
    pub indexes: usize,
    /// Warnings.
    pub warnings: usize,
    /// Unsupported feature identifiers.
    pub unsupported_features: Vec<String>,
}

impl SchemaConversionResult {
    /// Summarizes the conversion.
    #[must_use]
    pub fn summary(&self) -> ConversionSummary {
        let skipped = self.field_conversions.iter().filter(|f| f.skipped).count();
        ConversionSummary {
            source_index: self.source_index.clone(),
            collection_name: self.collection_name.clone(),
            fields_total: self.field_conversions.len(),
            fields_converted: self.field_conversions.len() - skipped,
            fields_skipped: skipped,
            vector_fields: self
                .field_conversions
                .iter()
                .filter(|f| f.mapping.is_vector)
                .count(),
            indexes: self.index_conversions.len(),
            warnings: self.warnings.len(),
            unsupported_features: self.unsupported_features.clone(),
        }
    }

    /// Returns the conversion of the primary key field, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldConversion> {
        self.field_conversions
            .iter()
            .find(|f| f.is_primary_key && !f.skipped)
    }
}

/// Converts source index definitions into Milvus schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaConverter {
    options: MigrationOptions,
    collection_name: Option<String>,
}

impl SchemaConverter {
    /// Creates a converter with the given options.
    #[must_use]
    pub fn new(options: MigrationOptions) -> Self {
        Self {
            options,
            collection_name: None,
        }
    }

    /// Overrides the target collection name.
    #[must_use]
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.collection_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Converts an exported JSON index definition.
    #[must_use]
    pub fn convert_from_json(&self, index: &Value) -> SchemaConversionResult {
        self.convert(&SourceIndex::from_json(index))
    }

    /// Converts a source index definition.
    #[must_use]
    pub fn convert(&self, index: &SourceIndex) -> SchemaConversionResult {
        let collection_name = self
            .collection_name
            .clone()
            .unwrap_or_else(|| index.name.replace('-', "_"));

        let mut warnings = Vec::new();
        let mut key_seen = false;
        let field_conversions: Vec<FieldConversion> = index
            .fields
            .iter()
            .map(|f| {
                let is_key = f.key && !key_seen;
                if f.key && key_seen {
                    warn!(field = %f.name, "Index declares more than one key field; keeping the first");
                    warnings.push(ConversionWarning::new(
                        WarningCategory::Schema,
                        format!(
                            "Field '{}' is also marked as key; only the first key field becomes the primary key",
                            f.name
                        ),
                        &f.name,
                    ));
                }
                let fc = self.convert_field(f, is_key, &mut warnings);
                key_seen |= fc.is_primary_key;
                fc
            })
            .collect();

        let fields: Vec<FieldSchema> = field_conversions
            .iter()
            .filter(|fc| !fc.skipped)
            .filter_map(|fc| fc.target_field.clone())
            .collect();

        let index_conversions = build_index_conversions(&field_conversions, index.vector_search.as_ref());

        let mut unsupported_features = Vec::new();
        detect_unsupported_features(index, &mut warnings, &mut unsupported_features);

        for fc in &field_conversions {
            for w in &fc.mapping.warnings {
                warnings.push(ConversionWarning::new(
                    WarningCategory::TypeMapping,
                    w.clone(),
                    &fc.source_name,
                ));
            }
            if fc.mapping.confidence == MappingConfidence::Lossy {
                warnings.push(ConversionWarning::new(
                    WarningCategory::TypeLossy,
                    format!(
                        "Field '{}' ({}) uses a lossy conversion",
                        fc.source_name, fc.source_type
                    ),
                    &fc.source_name,
                ));
            }
        }

        if !fields.iter().any(|f| f.is_primary) {
            warnings.push(ConversionWarning::new(
                WarningCategory::Schema,
                "No key field found in the source index; an auto-generated ID will be used",
                "",
            ));
        }

        debug!(
            index = %index.name,
            collection = %collection_name,
            fields = fields.len(),
            warnings = warnings.len(),
            "Converted schema"
        );

        SchemaConversionResult {
            source_index: index.name.clone(),
            collection_name,
            schema: CollectionSchema {
                fields,
                description: format!("Migrated from Azure AI Search index: {}", index.name),
                enable_dynamic_field: self.options.enable_dynamic_field,
            },
            field_conversions,
            index_conversions,
            warnings,
            unsupported_features,
        }
    }

    fn convert_field(
        &self,
        field: &SourceField,
        is_key: bool,
        warnings: &mut Vec<ConversionWarning>,
    ) -> FieldConversion {
        let name = field.name.as_str();

        if self.options.exclude_fields.iter().any(|f| f == name) {
            return FieldConversion {
                source_name: name.to_string(),
                source_type: field.field_type.clone(),
                target_field: None,
                mapping: resolve_type(&field.field_type, false),
                skipped: true,
                skip_reason: "excluded by exclude_fields".to_string(),
                renamed_to: String::new(),
                is_primary_key: false,
                vector_profile: field.vector_profile.clone(),
            };
        }

        let edm_type = field.effective_type();
        let mapping = resolve_type(edm_type, field.is_vector());

        let no_override = FieldOverride::default();
        let ov = self.options.field_overrides.get(name).unwrap_or(&no_override);
        let target_name = ov.milvus_name.clone().unwrap_or_else(|| name.to_string());

        let mut target = FieldSchema::new(target_name.clone(), mapping.milvus_type);
        target.description = format!("Migrated from Azure field: {name} ({edm_type})");

        if is_key {
            target.is_primary = true;
            if !mapping.milvus_type.is_key_eligible() {
                target.data_type = DataType::VarChar;
                target.max_length = Some(self.options.varchar_max_length);
            }
        }

        if mapping.milvus_type == DataType::VarChar {
            target.max_length = Some(
                ov.max_length
                    .or(mapping.default_max_length)
                    .unwrap_or(self.options.varchar_max_length),
            );
        }

        if mapping.is_vector {
            target.dim = field.dimensions;
        }

        if mapping.milvus_type == DataType::Array {
            let element = mapping.element_type.unwrap_or(DataType::VarChar);
            target.element_type = Some(element);
            target.max_capacity = Some(ov.max_capacity.unwrap_or(self.options.array_max_capacity));
            if element == DataType::VarChar {
                target.max_length = Some(ov.max_length.unwrap_or(self.options.varchar_max_length));
            }
        }

        if self.options.partition_key_field.as_deref() == Some(name) {
            if target.data_type.is_key_eligible() {
                target.is_partition_key = true;
            } else {
                let message = format!(
                    "Partition key '{name}' has type {}; only Int64 and VarChar are supported, ignoring",
                    target.data_type
                );
                warn!(field = name, data_type = %target.data_type, "Partition key type not supported");
                warnings.push(ConversionWarning::new(WarningCategory::PartitionKey, message, name));
            }
        }

        FieldConversion {
            source_name: name.to_string(),
            source_type: edm_type.to_string(),
            target_field: Some(target),
            mapping,
            skipped: false,
            skip_reason: String::new(),
            renamed_to: if target_name == name {
                String::new()
            } else {
                target_name
            },
            is_primary_key: is_key,
            vector_profile: field.vector_profile.clone(),
        }
    }
}

/// Resolves the algorithm for a vector field: its own profile when that
/// profile references a known algorithm, else the first profile that does.
fn associate<'a>(
    fc: &FieldConversion,
    vector_search: Option<&'a VectorSearchConfig>,
) -> Option<(&'a str, &'a crate::source::VectorAlgorithm)> {
    let vs = vector_search?;
    let own = fc
        .vector_profile
        .as_deref()
        .and_then(|name| vs.profile(name))
        .and_then(|p| vs.algorithm(&p.algorithm).map(|a| (p.name.as_str(), a)));

    own.or_else(|| {
        vs.profiles
            .iter()
            .find_map(|p| vs.algorithm(&p.algorithm).map(|a| (p.name.as_str(), a)))
    })
}

fn build_index_conversions(
    field_conversions: &[FieldConversion],
    vector_search: Option<&VectorSearchConfig>,
) -> Vec<IndexConversion> {
    field_conversions
        .iter()
        .filter(|fc| fc.mapping.is_vector && !fc.skipped)
        .map(|fc| {
            let (profile, kind, metric, tunables) = match associate(fc, vector_search) {
                Some((profile, algo)) => (
                    profile.to_string(),
                    algo.kind.clone(),
                    algo.metric_or_default().to_string(),
                    algo.tunables,
                ),
                None => (
                    String::new(),
                    "hnsw".to_string(),
                    "cosine".to_string(),
                    HnswTunables::default(),
                ),
            };
            let milvus_config = map_vector_index(
                &kind,
                &metric,
                (kind == "hnsw").then_some(&tunables),
            );
            IndexConversion {
                source_profile: profile,
                source_algorithm_kind: kind,
                source_metric: metric,
                milvus_config,
                target_field: fc.target_name().to_string(),
            }
        })
        .collect()
}

fn detect_unsupported_features(
    index: &SourceIndex,
    warnings: &mut Vec<ConversionWarning>,
    unsupported: &mut Vec<String>,
) {
    let detected = [
        ("scoringProfiles", !index.scoring_profiles.is_empty()),
        ("suggesters", !index.suggesters.is_empty()),
        ("semanticConfiguration", index.semantic_settings),
        ("semanticConfiguration", index.semantic_search),
    ];

    for (feature, present) in detected {
        if !present || unsupported.iter().any(|f| f == feature) {
            continue;
        }
        let message = unsupported_feature_description(feature)
            .map_or_else(|| format!("{feature} is not migrated"), str::to_string);
        warnings.push(ConversionWarning::new(WarningCategory::UnsupportedFeature, message, ""));
        unsupported.push(feature.to_string());
    }
}

#[cfg(test)]
#[path = "schema_converter_tests.rs"]
mod tests;
