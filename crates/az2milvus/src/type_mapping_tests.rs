//! Tests for type_mapping module.

use super::*;
use proptest::prelude::*;

// ==================== Fixed table ====================

#[test]
fn test_scalar_table_exact_targets() {
    let cases = [
        ("Edm.String", DataType::VarChar, MappingConfidence::Exact),
        ("Edm.Int32", DataType::Int32, MappingConfidence::Exact),
        ("Edm.Int64", DataType::Int64, MappingConfidence::Exact),
        ("Edm.Double", DataType::Double, MappingConfidence::Exact),
        ("Edm.Single", DataType::Float, MappingConfidence::Exact),
        ("Edm.Boolean", DataType::Bool, MappingConfidence::Exact),
        ("Edm.DateTimeOffset", DataType::VarChar, MappingConfidence::Semantic),
        ("Edm.GeographyPoint", DataType::Json, MappingConfidence::Semantic),
        ("Edm.ComplexType", DataType::Json, MappingConfidence::Semantic),
        ("Edm.Byte", DataType::Int16, MappingConfidence::Lossless),
        ("Edm.Int16", DataType::Int16, MappingConfidence::Exact),
        ("Edm.SByte", DataType::Int8, MappingConfidence::Exact),
    ];

    for (edm, expected_type, expected_confidence) in cases {
        // Act
        let m = resolve_type(edm, false);

        // Assert
        assert_eq!(m.milvus_type, expected_type, "{edm}");
        assert_eq!(m.confidence, expected_confidence, "{edm}");
        assert!(!m.is_vector, "{edm}");
        assert!(m.element_type.is_none(), "{edm}");
    }
}

#[test]
fn test_collection_table_element_types() {
    let cases = [
        ("Collection(Edm.String)", DataType::VarChar),
        ("Collection(Edm.Int32)", DataType::Int32),
        ("Collection(Edm.Int64)", DataType::Int64),
        ("Collection(Edm.Double)", DataType::Double),
    ];

    for (edm, element) in cases {
        let m = resolve_type(edm, false);
        assert_eq!(m.milvus_type, DataType::Array, "{edm}");
        assert_eq!(m.element_type, Some(element), "{edm}");
        assert_eq!(m.confidence, MappingConfidence::Exact, "{edm}");
        assert!(!m.is_vector, "{edm}");
    }
}

#[test]
fn test_vector_table_targets() {
    let cases = [
        ("Collection(Edm.Single)", DataType::FloatVector, MappingConfidence::Exact),
        ("Collection(Edm.Half)", DataType::Float16Vector, MappingConfidence::Exact),
        ("Collection(Edm.Int16)", DataType::FloatVector, MappingConfidence::Lossy),
        ("Collection(Edm.SByte)", DataType::FloatVector, MappingConfidence::Lossy),
        ("Collection(Edm.Byte)", DataType::BinaryVector, MappingConfidence::Exact),
    ];

    for (edm, expected_type, expected_confidence) in cases {
        let m = resolve_type(edm, true);
        assert_eq!(m.milvus_type, expected_type, "{edm}");
        assert_eq!(m.confidence, expected_confidence, "{edm}");
        assert!(m.is_vector, "{edm}");
        assert!(m.element_type.is_none(), "{edm}");
    }
}

#[test]
fn test_string_default_max_length() {
    assert_eq!(resolve_type("Edm.String", false).default_max_length, Some(65_535));
    assert_eq!(
        resolve_type("Edm.DateTimeOffset", false).default_max_length,
        Some(64)
    );
}

#[test]
fn test_datetime_keeps_lexical_comparison_caveat() {
    let m = resolve_type("Edm.DateTimeOffset", false);
    assert_eq!(m.warnings.len(), 1);
    assert!(m.warnings[0].contains("string comparisons"));
}

#[test]
fn test_geography_point_warns_about_geo_distance() {
    let m = resolve_type("Edm.GeographyPoint", false);
    assert!(m.notes.contains("\"Point\""));
    assert!(m.warnings.iter().any(|w| w.contains("geo.distance()")));
}

#[test]
fn test_lossy_vectors_warn_about_memory() {
    let int16 = resolve_type("Collection(Edm.Int16)", true);
    assert!(int16.warnings.iter().any(|w| w.contains("doubles")));

    let int8 = resolve_type("Collection(Edm.SByte)", true);
    assert!(int8.warnings.iter().any(|w| w.contains("quadruples")));
    assert!(int8.warnings.iter().any(|w| w.contains("Re-encode")));
}

// ==================== Heuristics and fallback ====================

#[test]
fn test_single_collection_is_vector_without_flag() {
    // A bare Collection(Edm.Single) is treated as an embedding. A genuine
    // scalar float array using the same type id is misclassified here.
    let flagged = resolve_type("Collection(Edm.Single)", true);
    let unflagged = resolve_type("Collection(Edm.Single)", false);

    assert_eq!(flagged, unflagged);
    assert!(unflagged.is_vector);
    assert_eq!(unflagged.milvus_type, DataType::FloatVector);
}

#[test]
fn test_vector_flag_on_scalar_type_is_ignored() {
    let m = resolve_type("Edm.String", true);
    assert_eq!(m.milvus_type, DataType::VarChar);
    assert!(!m.is_vector);
}

#[test]
fn test_unknown_type_falls_back_to_json() {
    let m = resolve_type("Edm.Unknown", false);

    assert_eq!(m.milvus_type, DataType::Json);
    assert_eq!(m.confidence, MappingConfidence::Unsupported);
    assert_eq!(m.edm_type, "Edm.Unknown");
    assert!(m.notes.contains("Edm.Unknown"));
    assert_eq!(m.warnings.len(), 1);
    assert!(!m.is_vector);
}

proptest! {
    #[test]
    fn prop_unrecognized_ids_always_fall_back(id in "[A-Za-z0-9_.()]{0,40}") {
        prop_assume!(!all_mappings().iter().any(|m| m.edm_type == id));

        let m = resolve_type(&id, false);
        prop_assert_eq!(m.milvus_type, DataType::Json);
        prop_assert_eq!(m.confidence, MappingConfidence::Unsupported);
        prop_assert!(!m.warnings.is_empty());

        let flagged = resolve_type(&id, true);
        prop_assert_eq!(flagged.milvus_type, DataType::Json);
    }
}

// ==================== Catalogs ====================

#[test]
fn test_all_mappings_covers_every_table() {
    let all = all_mappings();
    assert_eq!(all.len(), 12 + 4 + 5);
    for m in &all {
        // is_vector implies a vector kind; element_type only on arrays
        assert_eq!(m.is_vector, m.milvus_type.is_vector(), "{}", m.edm_type);
        assert_eq!(
            m.element_type.is_some(),
            m.milvus_type == DataType::Array,
            "{}",
            m.edm_type
        );
    }
}

#[test]
fn test_unsupported_feature_catalog() {
    for key in ["scoringProfiles", "suggesters", "semanticConfiguration"] {
        assert!(unsupported_feature_description(key).is_some(), "{key}");
    }
    assert!(unsupported_feature_description("vectorSearch").is_none());
}
