//! Connectors for the source search service and the target vector database.
//!
//! The orchestrator only sees the two traits below, so tests drive it with
//! in-memory implementations and the CLI plugs in the REST clients.

pub mod azure_search;
pub mod common;
pub mod milvus;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collection::CollectionSchema;
use crate::error::Result;
use crate::index_mapping::MilvusIndexConfig;
use crate::source::SourceIndex;

pub use azure_search::AzureSearchClient;
pub use milvus::MilvusClient;

/// A source document: flat field name to value mapping.
pub type Document = Map<String, Value>;

/// Position and size of the next batch to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// Documents already consumed, in key order.
    pub offset: u64,
    /// Key of the last consumed document, when known.
    pub after_key: Option<String>,
    /// Maximum documents to return.
    pub batch_size: usize,
}

impl ExtractRequest {
    /// First batch of a fresh extraction.
    #[must_use]
    pub const fn first(batch_size: usize) -> Self {
        Self {
            offset: 0,
            after_key: None,
            batch_size,
        }
    }
}

/// Trait for the service documents and schemas are read from.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Get the source type name.
    fn source_type(&self) -> &'static str;

    /// Fetch the index definition.
    async fn get_index(&self, index_name: &str) -> Result<SourceIndex>;

    /// Number of documents in the index.
    async fn document_count(&self, index_name: &str) -> Result<u64>;

    /// Extract the next batch, ordered by `key_field` ascending when given.
    ///
    /// Returns fewer than `request.batch_size` documents only at the end of
    /// the index.
    async fn extract_batch(
        &self,
        index_name: &str,
        key_field: Option<&str>,
        request: &ExtractRequest,
    ) -> Result<Vec<Document>>;
}

/// Trait for the vector database collections are written to.
#[async_trait]
pub trait TargetSink: Send + Sync {
    /// Get the target type name.
    fn target_type(&self) -> &'static str;

    /// Connect and verify the server is reachable. Must precede every other call.
    async fn connect(&mut self) -> Result<()>;

    /// Whether a collection exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Create a collection from a schema.
    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()>;

    /// Drop a collection. Missing collections are not an error.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Build an index on a vector field.
    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        config: &MilvusIndexConfig,
    ) -> Result<()>;

    /// Insert rows and return the number the server accepted.
    async fn insert(&self, collection: &str, rows: &[Value]) -> Result<u64>;

    /// Insert or replace rows by primary key and return the number written.
    ///
    /// Replaying the same rows leaves the collection unchanged, so callers may
    /// retry it. Only valid when rows carry their own primary key.
    async fn upsert(&self, collection: &str, rows: &[Value]) -> Result<u64>;

    /// Load a collection into memory so it is queryable.
    async fn load_collection(&self, name: &str) -> Result<()>;

    /// Number of rows in a collection.
    async fn count(&self, collection: &str) -> Result<u64>;

    /// Up to `limit` rows with all fields.
    async fn query_sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>>;

    /// Number of fields declared on a collection.
    async fn field_count(&self, collection: &str) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request() {
        let req = ExtractRequest::first(500);
        assert_eq!(req.offset, 0);
        assert!(req.after_key.is_none());
        assert_eq!(req.batch_size, 500);
    }

    #[test]
    fn test_request_serialization() {
        let req = ExtractRequest {
            offset: 1000,
            after_key: Some("doc-999".to_string()),
            batch_size: 500,
        };

        let json = serde_json::to_string(&req).unwrap();
        let parsed: ExtractRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, req);
    }
}
