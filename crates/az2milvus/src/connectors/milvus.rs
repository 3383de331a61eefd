//! Milvus connector over the REST v2 API (`/v2/vectordb/...`).
//!
//! Every endpoint is a POST with a JSON body and answers HTTP 200 with a
//! `{"code", "message", "data"}` envelope; a non-zero code is a failure.
//! Works against self-hosted Milvus and Zilliz Cloud alike.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::collection::CollectionSchema;
use crate::config::MilvusConfig;
use crate::connectors::common::{check_status, create_http_client, join_url, Side};
use crate::connectors::{Document, TargetSink};
use crate::error::{Error, Result};
use crate::index_mapping::MilvusIndexConfig;

const SERVICE: &str = "Milvus";

/// Milvus response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// Milvus REST client.
pub struct MilvusClient {
    config: MilvusConfig,
    client: Client,
    connected: bool,
}

impl MilvusClient {
    /// Create a new, unconnected client.
    #[must_use]
    pub fn new(config: MilvusConfig) -> Self {
        Self {
            config,
            client: create_http_client(),
            connected: false,
        }
    }

    /// Whether [`TargetSink::connect`] has succeeded.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    fn require_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected(SERVICE))
        }
    }

    /// Sends rows to an entities endpoint and reads the written count from `count_key`.
    async fn write_rows(
        &self,
        endpoint: &str,
        count_key: &str,
        collection: &str,
        rows: &[Value],
    ) -> Result<u64> {
        self.require_connected()?;
        if rows.is_empty() {
            return Ok(0);
        }
        let data = self
            .call(
                endpoint,
                json!({ "collectionName": collection, "data": rows }),
                Error::Loading,
            )
            .await?;
        let written = data
            .get(count_key)
            .and_then(Value::as_u64)
            .unwrap_or(rows.len() as u64);
        debug!(collection, endpoint, written, "Wrote batch");
        Ok(written)
    }

    fn with_db(&self, mut body: Value) -> Value {
        body["dbName"] = json!(self.config.db_name);
        body
    }

    /// Posts `body` to `endpoint` and returns the envelope's `data`.
    ///
    /// `fail` builds the error for a non-zero response code.
    async fn call(&self, endpoint: &str, body: Value, fail: fn(String) -> Error) -> Result<Value> {
        let url = join_url(&self.config.uri, &format!("v2/vectordb/{endpoint}"));
        let mut req = self.client.post(&url).json(&self.with_db(body));
        if !self.config.token.is_empty() {
            req = req.bearer_auth(&self.config.token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::DestinationConnection(format!("{SERVICE} request failed: {e}")))?;
        let response = check_status(response, SERVICE, Side::Destination).await?;

        let envelope: Envelope = response.json().await.map_err(|e| {
            Error::DestinationConnection(format!("Failed to parse {endpoint} response: {e}"))
        })?;

        if envelope.code != 0 {
            return Err(fail(format!(
                "{endpoint} failed with code {}: {}",
                envelope.code, envelope.message
            )));
        }
        Ok(envelope.data)
    }

    async fn query(&self, collection: &str, output_fields: &[&str], limit: Option<usize>) -> Result<Vec<Document>> {
        let mut body = json!({
            "collectionName": collection,
            "filter": "",
            "outputFields": output_fields,
        });
        if let Some(limit) = limit {
            body["limit"] = json!(limit);
        }

        let data = self.call("entities/query", body, Error::DestinationConnection).await?;
        match data {
            Value::Array(rows) => Ok(rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::DestinationConnection(format!(
                "Unexpected query response: {other}"
            ))),
        }
    }
}

#[async_trait]
impl TargetSink for MilvusClient {
    fn target_type(&self) -> &'static str {
        "milvus"
    }

    async fn connect(&mut self) -> Result<()> {
        info!(uri = %self.config.uri, db = %self.config.db_name, "Connecting to Milvus");
        self.call("collections/list", json!({}), Error::DestinationConnection)
            .await?;
        self.connected = true;
        info!("Connected to Milvus");
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.require_connected()?;
        let data = self
            .call(
                "collections/has",
                json!({ "collectionName": name }),
                Error::DestinationConnection,
            )
            .await?;
        Ok(data.get("has").and_then(Value::as_bool).unwrap_or(false))
    }

    async fn create_collection(&self, name: &str, schema: &CollectionSchema) -> Result<()> {
        self.require_connected()?;
        info!(collection = name, fields = schema.fields.len(), "Creating collection");
        self.call(
            "collections/create",
            json!({
                "collectionName": name,
                "schema": schema.to_rest_json(),
            }),
            Error::DestinationConnection,
        )
        .await?;
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.require_connected()?;
        if !self.has_collection(name).await? {
            return Ok(());
        }
        warn!(collection = name, "Dropping collection");
        self.call(
            "collections/drop",
            json!({ "collectionName": name }),
            Error::DestinationConnection,
        )
        .await?;
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        config: &MilvusIndexConfig,
    ) -> Result<()> {
        self.require_connected()?;
        info!(
            collection,
            field,
            index_type = %config.index_type,
            metric = %config.metric_type,
            "Creating index"
        );
        self.call(
            "indexes/create",
            json!({
                "collectionName": collection,
                "indexParams": [{
                    "fieldName": field,
                    "indexName": field,
                    "indexType": config.index_type.as_str(),
                    "metricType": config.metric_type.as_str(),
                    "params": config.params,
                }],
            }),
            Error::DestinationConnection,
        )
        .await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, rows: &[Value]) -> Result<u64> {
        self.write_rows("entities/insert", "insertCount", collection, rows)
            .await
    }

    async fn upsert(&self, collection: &str, rows: &[Value]) -> Result<u64> {
        self.write_rows("entities/upsert", "upsertCount", collection, rows)
            .await
    }

    async fn load_collection(&self, name: &str) -> Result<()> {
        self.require_connected()?;
        info!(collection = name, "Loading collection into memory");
        self.call(
            "collections/load",
            json!({ "collectionName": name }),
            Error::DestinationConnection,
        )
        .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        self.require_connected()?;
        let rows = self.query(collection, &["count(*)"], None).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count(*)"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    async fn query_sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>> {
        self.require_connected()?;
        self.query(collection, &["*"], Some(limit)).await
    }

    async fn field_count(&self, collection: &str) -> Result<usize> {
        self.require_connected()?;
        let data = self
            .call(
                "collections/describe",
                json!({ "collectionName": collection }),
                Error::DestinationConnection,
            )
            .await?;
        Ok(data
            .get("fields")
            .and_then(Value::as_array)
            .map_or(0, Vec::len))
    }
}

#[cfg(test)]
#[path = "milvus_tests.rs"]
mod tests;
