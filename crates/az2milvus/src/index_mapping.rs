//! Azure vector algorithm → Milvus index configuration.
//!
//! Azure AI Search supports two vector algorithms, `hnsw` and
//! `exhaustiveKnn`. Both map onto Milvus index types with their tunables
//! carried over; anything else falls back to HNSW with fixed defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::source::HnswTunables;

/// Milvus similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    /// Cosine similarity.
    Cosine,
    /// Euclidean distance.
    L2,
    /// Inner product.
    Ip,
    /// Hamming distance (binary vectors).
    Hamming,
}

impl MetricType {
    /// Translates an Azure metric name. Unknown names default to cosine.
    #[must_use]
    pub fn from_azure(metric: &str) -> Self {
        match metric {
            "euclidean" => Self::L2,
            "dotProduct" => Self::Ip,
            "hamming" => Self::Hamming,
            _ => Self::Cosine,
        }
    }

    /// Milvus metric name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "COSINE",
            Self::L2 => "L2",
            Self::Ip => "IP",
            Self::Hamming => "HAMMING",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milvus index type produced by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    /// Graph-based approximate search.
    Hnsw,
    /// Brute-force search.
    Flat,
}

impl IndexType {
    /// Milvus index type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hnsw => "HNSW",
            Self::Flat => "FLAT",
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved Milvus index settings for one vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusIndexConfig {
    /// Index type.
    pub index_type: IndexType,
    /// Similarity metric.
    pub metric_type: MetricType,
    /// Build-time parameters (`M`, `efConstruction`).
    pub params: BTreeMap<String, u32>,
    /// Search-time parameters (`ef`).
    pub search_params: BTreeMap<String, u32>,
    /// Human-readable explanation of the mapping.
    pub notes: String,
}

const DEFAULT_M: u32 = 4;
const DEFAULT_EF_CONSTRUCTION: u32 = 400;
const DEFAULT_EF_SEARCH: u32 = 500;

const FALLBACK_M: u32 = 16;
const FALLBACK_EF_CONSTRUCTION: u32 = 256;
const FALLBACK_EF_SEARCH: u32 = 256;

fn hnsw_params(m: u32, ef_construction: u32, ef: u32) -> (BTreeMap<String, u32>, BTreeMap<String, u32>) {
    let params = BTreeMap::from([
        ("M".to_string(), m),
        ("efConstruction".to_string(), ef_construction),
    ]);
    let search_params = BTreeMap::from([("ef".to_string(), ef)]);
    (params, search_params)
}

/// Maps an Azure vector algorithm onto a Milvus index configuration.
///
/// Never fails: unknown kinds fall back to HNSW (`M=16`, `efConstruction=256`,
/// `ef=256`) with a note naming the kind, unknown metrics to `COSINE`.
#[must_use]
pub fn map_vector_index(
    algorithm_kind: &str,
    metric: &str,
    tunables: Option<&HnswTunables>,
) -> MilvusIndexConfig {
    let metric_type = MetricType::from_azure(metric);

    match algorithm_kind {
        "hnsw" => {
            let t = tunables.copied().unwrap_or_default();
            let (params, search_params) = hnsw_params(
                t.m.unwrap_or(DEFAULT_M),
                t.ef_construction.unwrap_or(DEFAULT_EF_CONSTRUCTION),
                t.ef_search.unwrap_or(DEFAULT_EF_SEARCH),
            );
            MilvusIndexConfig {
                index_type: IndexType::Hnsw,
                metric_type,
                params,
                search_params,
                notes: "HNSW parameters carried over 1:1".to_string(),
            }
        }
        "exhaustiveKnn" => MilvusIndexConfig {
            index_type: IndexType::Flat,
            metric_type,
            params: BTreeMap::new(),
            search_params: BTreeMap::new(),
            notes: "Exhaustive KNN mapped to FLAT (brute force)".to_string(),
        },
        other => {
            let (params, search_params) =
                hnsw_params(FALLBACK_M, FALLBACK_EF_CONSTRUCTION, FALLBACK_EF_SEARCH);
            MilvusIndexConfig {
                index_type: IndexType::Hnsw,
                metric_type,
                params,
                search_params,
                notes: format!("Unknown algorithm '{other}': falling back to HNSW defaults"),
            }
        }
    }
}

/// A Milvus index type with no Azure AI Search counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MilvusOnlyIndex {
    /// Index type name.
    pub name: &'static str,
    /// What the index is.
    pub description: &'static str,
    /// When it is worth using.
    pub use_case: &'static str,
    /// Example build parameters as a JSON object literal.
    pub params_example: &'static str,
    /// Needs a GPU-enabled Milvus deployment.
    pub requires_gpu: bool,
}

/// Index types available after migration that Azure AI Search lacks.
pub const MILVUS_EXCLUSIVE_INDEXES: &[MilvusOnlyIndex] = &[
    MilvusOnlyIndex {
        name: "IVF_FLAT",
        description: "Inverted file index with flat storage",
        use_case: "Balanced memory and speed for millions to tens of millions of vectors",
        params_example: r#"{"nlist": 1024}"#,
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "IVF_SQ8",
        description: "IVF with 8-bit scalar quantization",
        use_case: "Cuts memory by 70-75% when a small recall loss is acceptable",
        params_example: r#"{"nlist": 1024}"#,
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "IVF_PQ",
        description: "IVF with product quantization",
        use_case: "Very large datasets with tight memory budgets",
        params_example: r#"{"nlist": 1024, "m": 8, "nbits": 8}"#,
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "SCANN",
        description: "Score-aware anisotropic vector quantization",
        use_case: "Higher recall than IVF_PQ at similar memory",
        params_example: r#"{"nlist": 1024, "with_raw_data": true}"#,
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "DISKANN",
        description: "Disk-resident graph index",
        use_case: "Datasets that do not fit in memory, backed by SSD or NVMe",
        params_example: "{}",
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "GPU_IVF_FLAT",
        description: "IVF_FLAT on GPU",
        use_case: "High-throughput search on GPU virtual machines",
        params_example: r#"{"nlist": 1024}"#,
        requires_gpu: true,
    },
    MilvusOnlyIndex {
        name: "GPU_IVF_PQ",
        description: "IVF_PQ on GPU",
        use_case: "Fast search over large datasets on GPU",
        params_example: r#"{"nlist": 1024, "m": 8, "nbits": 8}"#,
        requires_gpu: true,
    },
    MilvusOnlyIndex {
        name: "GPU_CAGRA",
        description: "GPU-native graph index",
        use_case: "Lowest latency real-time vector search on GPU",
        params_example: r#"{"intermediate_graph_degree": 64, "graph_degree": 32}"#,
        requires_gpu: true,
    },
    MilvusOnlyIndex {
        name: "GPU_BRUTE_FORCE",
        description: "Brute-force search on GPU",
        use_case: "Small to medium datasets that need 100% recall",
        params_example: "{}",
        requires_gpu: true,
    },
    MilvusOnlyIndex {
        name: "SPARSE_INVERTED_INDEX",
        description: "Inverted index for sparse vectors",
        use_case: "Hybrid search with BM25 or SPLADE sparse representations",
        params_example: r#"{"drop_ratio_build": 0.2}"#,
        requires_gpu: false,
    },
    MilvusOnlyIndex {
        name: "SPARSE_WAND",
        description: "WAND traversal for sparse vectors",
        use_case: "Fast top-k over large sparse vector sets",
        params_example: r#"{"drop_ratio_build": 0.2}"#,
        requires_gpu: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_translation_is_total() {
        let cases = [
            ("cosine", "COSINE"),
            ("euclidean", "L2"),
            ("dotProduct", "IP"),
            ("hamming", "HAMMING"),
            ("anything-else", "COSINE"),
            ("", "COSINE"),
        ];
        for (azure, milvus) in cases {
            let config = map_vector_index("hnsw", azure, None);
            assert_eq!(config.metric_type.as_str(), milvus, "{azure}");
        }
    }

    #[test]
    fn test_hnsw_defaults_when_tunables_absent() {
        // Act
        let config = map_vector_index("hnsw", "cosine", None);

        // Assert
        assert_eq!(config.index_type, IndexType::Hnsw);
        assert_eq!(config.params["M"], 4);
        assert_eq!(config.params["efConstruction"], 400);
        assert_eq!(config.search_params["ef"], 500);
    }

    #[test]
    fn test_hnsw_tunables_carry_over() {
        // Arrange
        let tunables = HnswTunables {
            m: Some(8),
            ef_construction: Some(512),
            ef_search: None,
        };

        // Act
        let config = map_vector_index("hnsw", "dotProduct", Some(&tunables));

        // Assert
        assert_eq!(config.params["M"], 8);
        assert_eq!(config.params["efConstruction"], 512);
        assert_eq!(config.search_params["ef"], 500);
        assert_eq!(config.metric_type, MetricType::Ip);
    }

    #[test]
    fn test_exhaustive_knn_maps_to_flat() {
        let config = map_vector_index("exhaustiveKnn", "euclidean", None);

        assert_eq!(config.index_type, IndexType::Flat);
        assert_eq!(config.metric_type, MetricType::L2);
        assert!(config.params.is_empty());
        assert!(config.search_params.is_empty());
    }

    #[test]
    fn test_unknown_kind_falls_back_to_fixed_hnsw() {
        let config = map_vector_index("ivfPq", "cosine", None);

        assert_eq!(config.index_type, IndexType::Hnsw);
        assert_eq!(config.params["M"], 16);
        assert_eq!(config.params["efConstruction"], 256);
        assert_eq!(config.search_params["ef"], 256);
        assert!(config.notes.contains("ivfPq"));
    }

    #[test]
    fn test_exclusive_index_catalog_names_unique() {
        let mut names: Vec<&str> = MILVUS_EXCLUSIVE_INDEXES.iter().map(|i| i.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MILVUS_EXCLUSIVE_INDEXES.len());
        assert!(MILVUS_EXCLUSIVE_INDEXES.iter().any(|i| i.requires_gpu));
    }

    #[test]
    fn test_config_serializes_uppercase_names() {
        let config = map_vector_index("exhaustiveKnn", "hamming", None);
        let v = serde_json::to_value(&config).unwrap();
        assert_eq!(v["index_type"], "FLAT");
        assert_eq!(v["metric_type"], "HAMMING");
    }
}
