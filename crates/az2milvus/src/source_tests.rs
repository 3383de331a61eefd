//! Tests for source module.

use super::*;
use serde_json::json;

fn exported_index() -> Value {
    json!({
        "name": "products",
        "fields": [
            {"name": "id", "type": "Edm.String", "key": true},
            {"name": "embedding", "type": "Collection(Edm.Single)",
             "dimensions": 1536, "vectorSearchProfile": "vp"},
            {"name": "address", "type": "Edm.ComplexType", "fields": [
                {"name": "city", "type": "Edm.String"}
            ]}
        ],
        "vectorSearch": {
            "algorithms": [
                {"name": "algo", "kind": "hnsw",
                 "hnswParameters": {"m": 8, "efConstruction": 512, "metric": "dotProduct"}},
                {"name": "flat", "kind": "exhaustiveKnn",
                 "exhaustiveKnnParameters": {"metric": "euclidean"}}
            ],
            "profiles": [
                {"name": "vp", "algorithm": "algo"},
                {"name": "legacy", "algorithmConfigurationName": "flat"}
            ]
        },
        "scoringProfiles": [{"name": "boost"}],
        "suggesters": [],
        "semantic": {"configurations": [{"name": "default"}]}
    })
}

// ==================== Lenient JSON adapter ====================

#[test]
fn test_from_json_reads_fields() {
    // Act
    let index = SourceIndex::from_json(&exported_index());

    // Assert
    assert_eq!(index.name, "products");
    assert_eq!(index.fields.len(), 3);
    assert!(index.fields[0].key);
    assert_eq!(index.fields[1].vector_profile.as_deref(), Some("vp"));
    assert_eq!(index.fields[1].dimensions, Some(1536));
    assert_eq!(index.fields[2].sub_fields.len(), 1);
    assert_eq!(index.key_field().map(|f| f.name.as_str()), Some("id"));
}

#[test]
fn test_from_json_reads_vector_search() {
    let index = SourceIndex::from_json(&exported_index());
    let vs = index.vector_search.expect("vector search");

    let algo = vs.algorithm("algo").expect("algo");
    assert_eq!(algo.kind, "hnsw");
    assert_eq!(algo.metric.as_deref(), Some("dotProduct"));
    assert_eq!(algo.tunables.m, Some(8));
    assert_eq!(algo.tunables.ef_construction, Some(512));
    assert_eq!(algo.tunables.ef_search, None);

    let flat = vs.algorithm("flat").expect("flat");
    assert_eq!(flat.metric_or_default(), "euclidean");

    // Both profile key spellings are accepted
    assert_eq!(vs.profile("legacy").map(|p| p.algorithm.as_str()), Some("flat"));
}

#[test]
fn test_from_json_presence_flags() {
    let index = SourceIndex::from_json(&exported_index());

    assert_eq!(index.scoring_profiles, vec!["boost".to_string()]);
    assert!(index.suggesters.is_empty());
    assert!(index.semantic_search);
    assert!(!index.semantic_settings);
}

#[test]
fn test_from_json_legacy_semantic_settings() {
    let index = SourceIndex::from_json(&json!({"name": "x", "semanticSettings": {"a": 1}}));
    assert!(index.semantic_settings);
    assert!(!index.semantic_search);
}

#[test]
fn test_from_json_tolerates_missing_keys() {
    // Arrange
    let empty = json!({});

    // Act
    let index = SourceIndex::from_json(&empty);

    // Assert
    assert_eq!(index.name, "unknown");
    assert!(index.fields.is_empty());
    assert!(index.vector_search.is_none());
    assert!(index.key_field().is_none());
}

#[test]
fn test_algorithm_kind_defaults_to_hnsw() {
    let index = SourceIndex::from_json(&json!({
        "name": "x",
        "vectorSearch": {"algorithms": [{"name": "a"}]}
    }));
    let vs = index.vector_search.expect("vector search");
    assert_eq!(vs.algorithms[0].kind, "hnsw");
    assert_eq!(vs.algorithms[0].metric_or_default(), "cosine");
}

// ==================== Field helpers ====================

#[test]
fn test_effective_type_for_sub_fields() {
    let mut field = SourceField::new("address", "Edm.String");
    assert_eq!(field.effective_type(), "Edm.String");

    field.sub_fields.push(SourceField::new("city", "Edm.String"));
    assert_eq!(field.effective_type(), COMPLEX_TYPE);
}

#[test]
fn test_vector_detection() {
    assert!(SourceField::new("v", "Collection(Edm.Single)").vector("p", 3).is_vector());

    let mut by_dims = SourceField::new("v", "Collection(Edm.Half)");
    by_dims.dimensions = Some(8);
    assert!(by_dims.is_vector());

    let mut scalar_dims = SourceField::new("n", "Edm.Int32");
    scalar_dims.dimensions = Some(8);
    assert!(!scalar_dims.is_vector());

    assert!(!SourceField::new("tags", "Collection(Edm.String)").is_vector());
}

// ==================== Typed REST model ====================

#[test]
fn test_typed_and_lenient_paths_agree() {
    // Arrange
    let raw = exported_index();
    let mut typed_raw = raw.clone();
    // The REST API only emits `algorithm` on profiles
    typed_raw["vectorSearch"]["profiles"][1] = json!({"name": "legacy", "algorithm": "flat"});

    // Act
    let typed: AzureIndexDefinition = serde_json::from_value(typed_raw).unwrap();
    let from_typed = SourceIndex::from(typed);
    let from_json = SourceIndex::from_json(&raw);

    // Assert
    assert_eq!(from_typed, from_json);
}

#[test]
fn test_typed_definition_minimal() {
    let def: AzureIndexDefinition = serde_json::from_value(json!({
        "name": "minimal",
        "fields": [{"name": "id", "type": "Edm.String", "key": true}]
    }))
    .unwrap();

    let index = SourceIndex::from(def);

    assert_eq!(index.name, "minimal");
    assert_eq!(index.fields.len(), 1);
    assert!(index.vector_search.is_none());
    assert!(!index.semantic_search);
}
