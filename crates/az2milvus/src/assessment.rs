//! Pre-migration assessment.
//!
//! Summarizes a schema conversion for a human reviewer: per-field and
//! per-index mappings, feature gaps, Milvus capabilities the workload could
//! use, and an overall feasibility verdict.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::index_mapping::{IndexType, MetricType, MilvusOnlyIndex, MILVUS_EXCLUSIVE_INDEXES};
use crate::schema_converter::{ConversionWarning, SchemaConversionResult};
use crate::type_mapping::{unsupported_feature_description, MappingConfidence};

/// How much of the index carries over unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Feasibility {
    /// Every field converts without loss.
    Full,
    /// Some fields are skipped or lossy.
    Partial,
    /// Nothing converts cleanly.
    Complex,
}

impl Feasibility {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::Complex => "complex",
        }
    }
}

/// One row of the field mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDetail {
    /// Source field name.
    pub source_name: String,
    /// Source EDM type.
    pub source_type: String,
    /// Target field name, `N/A` when skipped.
    pub target_name: String,
    /// Target type, `N/A` when skipped.
    pub target_type: String,
    /// Mapping confidence.
    pub confidence: MappingConfidence,
    /// Vector field.
    pub is_vector: bool,
    /// Primary key.
    pub is_primary_key: bool,
    /// Left out of the target.
    pub skipped: bool,
    /// Mapping notes.
    pub notes: String,
    /// Override name, when renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<String>,
}

/// One row of the index mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDetail {
    /// Source vector profile.
    pub source_profile: String,
    /// Source algorithm kind.
    pub source_algorithm: String,
    /// Source metric.
    pub source_metric: String,
    /// Target index type.
    pub index_type: IndexType,
    /// Target metric.
    pub metric_type: MetricType,
    /// Target build parameters.
    pub params: BTreeMap<String, u32>,
    /// Target vector field.
    pub target_field: String,
}

/// An unsupported source feature with its migration advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureGap {
    /// Feature identifier.
    pub feature: String,
    /// What to do instead.
    pub description: String,
}

/// A Milvus capability relevant to the migrated workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MilvusAdvantage {
    /// Capability name.
    pub feature: &'static str,
    /// What it offers.
    pub description: &'static str,
}

/// Complete pre-migration assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    /// Source index.
    pub index_name: String,
    /// Target collection.
    pub collection_name: String,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Documents in the source index.
    pub document_count: u64,
    /// Source fields.
    pub total_fields: usize,
    /// Fields that convert (including lossy ones).
    pub convertible_fields: usize,
    /// Fields that convert with loss.
    pub lossy_fields: usize,
    /// Fields left out.
    pub skipped_fields: usize,
    /// Vector fields.
    pub vector_fields: usize,
    /// Unsupported features found on the index.
    pub unsupported_features: Vec<FeatureGap>,
    /// Conversion warnings.
    pub warnings: Vec<ConversionWarning>,
    /// Field mapping table.
    pub field_details: Vec<FieldDetail>,
    /// Index mapping table.
    pub index_details: Vec<IndexDetail>,
    /// Milvus capabilities worth knowing about.
    pub applicable_advantages: Vec<MilvusAdvantage>,
    /// Index types to consider beyond the mapped ones.
    pub alternative_indexes: Vec<MilvusOnlyIndex>,
    /// Overall verdict.
    pub migration_feasibility: Feasibility,
}

impl AssessmentReport {
    /// Writes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

const VECTOR_ADVANTAGES: &[MilvusAdvantage] = &[
    MilvusAdvantage {
        feature: "Index variety",
        description: "Beyond HNSW and exhaustive KNN: IVF_FLAT, IVF_SQ8, IVF_PQ, SCANN, DiskANN and GPU indexes, chosen per workload",
    },
    MilvusAdvantage {
        feature: "GPU acceleration",
        description: "GPU_IVF_FLAT and GPU_CAGRA indexes on NVIDIA GPU virtual machines",
    },
    MilvusAdvantage {
        feature: "Sparse vectors",
        description: "Native SPARSE_FLOAT_VECTOR for BM25 or SPLADE, enabling dense plus sparse hybrid search",
    },
    MilvusAdvantage {
        feature: "Range search",
        description: "Search by distance threshold instead of only top-k",
    },
    MilvusAdvantage {
        feature: "Iterator API",
        description: "Stream large result sets without the 100,000 document $skip limit",
    },
];

const GENERAL_ADVANTAGES: &[MilvusAdvantage] = &[
    MilvusAdvantage {
        feature: "Partition keys",
        description: "Native multi-tenancy with per-tenant data isolation and efficient filtered queries",
    },
    MilvusAdvantage {
        feature: "Dynamic schema",
        description: "With the dynamic field enabled, undeclared fields are stored without rebuilding the collection",
    },
    MilvusAdvantage {
        feature: "Cost control",
        description: "Self-hosted Milvus costs only its infrastructure, with no per-query pricing",
    },
    MilvusAdvantage {
        feature: "Change data capture",
        description: "Milvus CDC streams changes for disaster recovery and synchronization pipelines",
    },
    MilvusAdvantage {
        feature: "Null and default values",
        description: "Milvus 2.6 stores NULL and default values natively",
    },
];

/// Builds an assessment from a conversion result.
#[must_use]
pub fn generate_assessment(
    conversion: &SchemaConversionResult,
    document_count: u64,
) -> AssessmentReport {
    let mut convertible = 0;
    let mut lossy = 0;
    let mut skipped = 0;
    let mut vectors = 0;

    let field_details = conversion
        .field_conversions
        .iter()
        .map(|fc| {
            if fc.skipped {
                skipped += 1;
            } else if fc.mapping.confidence == MappingConfidence::Lossy {
                lossy += 1;
                convertible += 1;
            } else if fc.mapping.confidence != MappingConfidence::Unsupported {
                convertible += 1;
            }
            if fc.mapping.is_vector {
                vectors += 1;
            }

            FieldDetail {
                source_name: fc.source_name.clone(),
                source_type: fc.source_type.clone(),
                target_name: fc
                    .target_field
                    .as_ref()
                    .map_or_else(|| "N/A".to_string(), |f| f.name.clone()),
                target_type: fc
                    .target_field
                    .as_ref()
                    .map_or("N/A", |f| f.data_type.as_str())
                    .to_string(),
                confidence: fc.mapping.confidence,
                is_vector: fc.mapping.is_vector,
                is_primary_key: fc.is_primary_key,
                skipped: fc.skipped,
                notes: fc.mapping.notes.clone(),
                renamed_to: Some(fc.renamed_to.clone()).filter(|r| !r.is_empty()),
            }
        })
        .collect::<Vec<_>>();

    let index_details = conversion
        .index_conversions
        .iter()
        .map(|ic| IndexDetail {
            source_profile: ic.source_profile.clone(),
            source_algorithm: ic.source_algorithm_kind.clone(),
            source_metric: ic.source_metric.clone(),
            index_type: ic.milvus_config.index_type,
            metric_type: ic.milvus_config.metric_type,
            params: ic.milvus_config.params.clone(),
            target_field: ic.target_field.clone(),
        })
        .collect();

    let unsupported_features = conversion
        .unsupported_features
        .iter()
        .map(|feature| FeatureGap {
            feature: feature.clone(),
            description: unsupported_feature_description(feature)
                .unwrap_or(feature.as_str())
                .to_string(),
        })
        .collect();

    let has_vectors = vectors > 0;
    let mut applicable_advantages = Vec::new();
    if has_vectors {
        applicable_advantages.extend_from_slice(VECTOR_ADVANTAGES);
    }
    applicable_advantages.extend_from_slice(GENERAL_ADVANTAGES);

    let alternative_indexes = if has_vectors {
        MILVUS_EXCLUSIVE_INDEXES.to_vec()
    } else {
        Vec::new()
    };

    let migration_feasibility = if skipped == 0 && lossy == 0 {
        Feasibility::Full
    } else if convertible > 0 {
        Feasibility::Partial
    } else {
        Feasibility::Complex
    };

    AssessmentReport {
        index_name: conversion.source_index.clone(),
        collection_name: conversion.collection_name.clone(),
        generated_at: Utc::now(),
        document_count,
        total_fields: field_details.len(),
        convertible_fields: convertible,
        lossy_fields: lossy,
        skipped_fields: skipped,
        vector_fields: vectors,
        unsupported_features,
        warnings: conversion.warnings.clone(),
        field_details,
        index_details,
        applicable_advantages,
        alternative_indexes,
        migration_feasibility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationOptions;
    use crate::schema_converter::SchemaConverter;
    use crate::source::{SourceField, SourceIndex};
    use tempfile::TempDir;

    fn assess(fields: Vec<SourceField>, options: MigrationOptions) -> AssessmentReport {
        let index = SourceIndex {
            name: "products".to_string(),
            fields,
            ..SourceIndex::default()
        };
        generate_assessment(&SchemaConverter::new(options).convert(&index), 42)
    }

    #[test]
    fn test_clean_schema_is_full() {
        // Arrange
        let fields = vec![
            SourceField::new("id", "Edm.String").key(),
            SourceField::new("count", "Edm.Int32"),
            SourceField::new("embedding", "Collection(Edm.Single)").vector("p", 4),
        ];

        // Act
        let report = assess(fields, MigrationOptions::default());

        // Assert
        assert_eq!(report.migration_feasibility, Feasibility::Full);
        assert_eq!(report.total_fields, 3);
        assert_eq!(report.convertible_fields, 3);
        assert_eq!(report.vector_fields, 1);
        assert_eq!(report.document_count, 42);
        assert_eq!(report.index_details.len(), 1);
        assert_eq!(report.index_details[0].index_type, IndexType::Hnsw);
        assert!(!report.alternative_indexes.is_empty());
        assert!(report
            .applicable_advantages
            .iter()
            .any(|a| a.feature == "GPU acceleration"));
    }

    #[test]
    fn test_skipped_field_makes_partial() {
        let options = MigrationOptions {
            exclude_fields: vec!["secret".to_string()],
            ..MigrationOptions::default()
        };
        let report = assess(
            vec![
                SourceField::new("id", "Edm.String").key(),
                SourceField::new("secret", "Edm.String"),
            ],
            options,
        );

        assert_eq!(report.migration_feasibility, Feasibility::Partial);
        assert_eq!(report.skipped_fields, 1);
        let secret = &report.field_details[1];
        assert!(secret.skipped);
        assert_eq!(secret.target_type, "N/A");
    }

    #[test]
    fn test_lossy_field_makes_partial() {
        let report = assess(
            vec![
                SourceField::new("id", "Edm.String").key(),
                SourceField::new("quantized", "Collection(Edm.Int16)").vector("p", 8),
            ],
            MigrationOptions::default(),
        );

        assert_eq!(report.lossy_fields, 1);
        assert_eq!(report.convertible_fields, 2);
        assert_eq!(report.migration_feasibility, Feasibility::Partial);
    }

    #[test]
    fn test_nothing_convertible_is_complex() {
        let options = MigrationOptions {
            exclude_fields: vec!["a".to_string()],
            ..MigrationOptions::default()
        };
        let report = assess(vec![SourceField::new("a", "Edm.String")], options);

        assert_eq!(report.migration_feasibility, Feasibility::Complex);
    }

    #[test]
    fn test_scalar_only_index_has_no_vector_advice() {
        let report = assess(
            vec![SourceField::new("id", "Edm.String").key()],
            MigrationOptions::default(),
        );

        assert!(report.alternative_indexes.is_empty());
        assert_eq!(report.applicable_advantages.len(), GENERAL_ADVANTAGES.len());
    }

    #[test]
    fn test_unsupported_features_are_described() {
        let index = SourceIndex {
            name: "products".to_string(),
            fields: vec![SourceField::new("id", "Edm.String").key()],
            scoring_profiles: vec!["boost".to_string()],
            ..SourceIndex::default()
        };
        let conversion = SchemaConverter::default().convert(&index);

        let report = generate_assessment(&conversion, 0);

        assert_eq!(report.unsupported_features.len(), 1);
        assert_eq!(report.unsupported_features[0].feature, "scoringProfiles");
        assert!(report.unsupported_features[0].description.contains("Scoring profiles"));
    }

    #[test]
    fn test_save_json() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let report = assess(
            vec![SourceField::new("id", "Edm.String").key()],
            MigrationOptions::default(),
        );

        // Act
        let path = report.save_json(dir.path().join("assessment.json")).unwrap();

        // Assert
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["index_name"], "products");
        assert_eq!(saved["migration_feasibility"], "full");
        assert_eq!(saved["field_details"][0]["confidence"], "exact");
    }
}
