//! Azure AI Search connector.
//!
//! Reads the index definition and pages documents through the REST API
//! (`/indexes/{name}`, `/docs/$count`, `/docs/search`), authenticating with
//! an `api-key` header.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AzureSearchConfig;
use crate::connectors::common::{check_status, create_http_client, join_url, Side};
use crate::connectors::{Document, ExtractRequest, SourceConnector};
use crate::error::{Error, Result};
use crate::source::{AzureIndexDefinition, SourceIndex};

/// Largest `$skip` the service accepts.
pub const MAX_SKIP: u64 = 100_000;

const SERVICE: &str = "Azure AI Search";

#[derive(Debug, Serialize)]
struct SearchRequest {
    search: &'static str,
    top: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orderby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    count: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Document>,
}

/// Azure AI Search REST client.
pub struct AzureSearchClient {
    config: AzureSearchConfig,
    client: Client,
}

impl AzureSearchClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: AzureSearchConfig) -> Self {
        Self {
            config,
            client: create_http_client(),
        }
    }

    fn index_url(&self, index_name: &str, suffix: &str) -> String {
        join_url(
            &self.config.endpoint,
            &format!("indexes/{index_name}{suffix}"),
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("api-key", &self.config.api_key)
            .query(&[("api-version", self.config.api_version.as_str())])
    }

    fn build_search(key_field: Option<&str>, request: &ExtractRequest) -> Result<SearchRequest> {
        let orderby = key_field.map(|k| format!("{k} asc"));

        let (skip, filter) = match (key_field, request.after_key.as_deref()) {
            (Some(key), Some(last)) => (None, Some(format!("{key} gt '{}'", escape_odata(last)))),
            _ if request.offset > MAX_SKIP => {
                return Err(Error::Extraction(format!(
                    "offset {} exceeds the service's $skip limit of {MAX_SKIP}; \
                     key-based paging needs a key field and a recorded last key",
                    request.offset
                )));
            }
            _ => ((request.offset > 0).then_some(request.offset), None),
        };

        Ok(SearchRequest {
            search: "*",
            top: request.batch_size,
            skip,
            orderby,
            filter,
            count: false,
        })
    }
}

/// Escapes a string literal for an OData filter.
fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

/// Drops service metadata such as `@search.score`.
fn strip_metadata(mut doc: Document) -> Document {
    doc.retain(|k, _| !k.starts_with('@'));
    doc
}

#[async_trait]
impl SourceConnector for AzureSearchClient {
    fn source_type(&self) -> &'static str {
        "azure_ai_search"
    }

    async fn get_index(&self, index_name: &str) -> Result<SourceIndex> {
        let url = self.index_url(index_name, "");
        debug!(index = index_name, "Fetching index definition");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::SourceConnection(format!("{SERVICE} request failed: {e}")))?;
        let response = check_status(response, SERVICE, Side::Source).await?;

        let definition: AzureIndexDefinition = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse index definition: {e}")))?;

        Ok(SourceIndex::from(definition))
    }

    async fn document_count(&self, index_name: &str) -> Result<u64> {
        let url = self.index_url(index_name, "/docs/$count");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::SourceConnection(format!("{SERVICE} request failed: {e}")))?;
        let response = check_status(response, SERVICE, Side::Source).await?;

        let body = response.text().await?;
        body.trim_start_matches('\u{feff}')
            .trim()
            .parse()
            .map_err(|e| Error::Extraction(format!("Failed to parse document count '{body}': {e}")))
    }

    async fn extract_batch(
        &self,
        index_name: &str,
        key_field: Option<&str>,
        request: &ExtractRequest,
    ) -> Result<Vec<Document>> {
        let url = self.index_url(index_name, "/docs/search");
        let body = Self::build_search(key_field, request)?;
        debug!(
            index = index_name,
            offset = request.offset,
            after_key = ?request.after_key,
            top = request.batch_size,
            "Extracting batch"
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::SourceConnection(format!("{SERVICE} request failed: {e}")))?;
        let response = check_status(response, SERVICE, Side::Source).await?;

        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse search response: {e}")))?;

        Ok(page.value.into_iter().map(strip_metadata).collect())
    }
}

#[cfg(test)]
#[path = "azure_search_tests.rs"]
mod tests;
