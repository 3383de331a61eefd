//! Tests for Azure AI Search connector.

use super::*;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AzureSearchClient {
    AzureSearchClient::new(AzureSearchConfig {
        endpoint: server.uri(),
        index_name: "products".to_string(),
        api_key: "test-key".to_string(),
        ..AzureSearchConfig::default()
    })
}

fn request(offset: u64, after_key: Option<&str>) -> ExtractRequest {
    ExtractRequest {
        offset,
        after_key: after_key.map(str::to_string),
        batch_size: 2,
    }
}

// ==================== Request building ====================

#[test]
fn test_first_page_has_no_skip_or_filter() {
    let body = AzureSearchClient::build_search(Some("id"), &request(0, None)).unwrap();

    assert_eq!(body.skip, None);
    assert_eq!(body.filter, None);
    assert_eq!(body.orderby.as_deref(), Some("id asc"));
    assert_eq!(body.top, 2);
}

#[test]
fn test_key_paging_preferred_over_skip() {
    let body = AzureSearchClient::build_search(Some("id"), &request(500_000, Some("doc-9"))).unwrap();

    assert_eq!(body.skip, None);
    assert_eq!(body.filter.as_deref(), Some("id gt 'doc-9'"));
}

#[test]
fn test_filter_escapes_quotes() {
    let body = AzureSearchClient::build_search(Some("id"), &request(1, Some("o'brien"))).unwrap();
    assert_eq!(body.filter.as_deref(), Some("id gt 'o''brien'"));
}

#[test]
fn test_skip_used_without_key_field() {
    let body = AzureSearchClient::build_search(None, &request(40, Some("ignored"))).unwrap();

    assert_eq!(body.skip, Some(40));
    assert_eq!(body.filter, None);
    assert_eq!(body.orderby, None);
}

#[test]
fn test_skip_beyond_service_limit_is_an_error() {
    let result = AzureSearchClient::build_search(None, &request(MAX_SKIP + 1, None));
    assert!(matches!(result, Err(Error::Extraction(_))));
    assert!(AzureSearchClient::build_search(None, &request(MAX_SKIP, None)).is_ok());
}

#[test]
fn test_strip_metadata() {
    let doc = json!({"id": "1", "@search.score": 1.0, "title": "t"});
    let Value::Object(map) = doc else { unreachable!() };

    let stripped = strip_metadata(map);

    assert_eq!(stripped.len(), 2);
    assert!(!stripped.contains_key("@search.score"));
}

// ==================== HTTP ====================

#[tokio::test]
async fn test_get_index_parses_definition() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/products"))
        .and(header("api-key", "test-key"))
        .and(query_param("api-version", "2024-07-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "products",
            "fields": [
                {"name": "id", "type": "Edm.String", "key": true},
                {"name": "embedding", "type": "Collection(Edm.Single)",
                 "dimensions": 3, "vectorSearchProfile": "p1"}
            ],
            "vectorSearch": {
                "algorithms": [{"name": "a1", "kind": "hnsw",
                                "hnswParameters": {"m": 8, "metric": "dotProduct"}}],
                "profiles": [{"name": "p1", "algorithm": "a1"}]
            },
            "scoringProfiles": [{"name": "boost"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let index = client_for(&server).get_index("products").await.unwrap();

    // Assert
    assert_eq!(index.name, "products");
    assert_eq!(index.key_field().map(|f| f.name.as_str()), Some("id"));
    assert_eq!(index.scoring_profiles, vec!["boost".to_string()]);
    let vs = index.vector_search.expect("vector search");
    assert_eq!(vs.algorithms[0].tunables.m, Some(8));
    assert_eq!(vs.algorithms[0].metric.as_deref(), Some("dotProduct"));
}

#[tokio::test]
async fn test_get_index_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/products"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let result = client_for(&server).get_index("products").await;

    assert!(matches!(result, Err(Error::Authentication(_))));
}

#[tokio::test]
async fn test_document_count_handles_bom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/products/docs/$count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\u{feff}1234"))
        .mount(&server)
        .await;

    let count = client_for(&server).document_count("products").await.unwrap();

    assert_eq!(count, 1234);
}

#[tokio::test]
async fn test_rate_limit_uses_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/products/docs/$count"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = client_for(&server).document_count("products").await;

    assert!(matches!(result, Err(Error::RateLimit(7))));
}

#[tokio::test]
async fn test_extract_batch_pages_by_key() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes/products/docs/search"))
        .and(body_partial_json(json!({
            "search": "*",
            "top": 2,
            "orderby": "id asc",
            "filter": "id gt 'b'"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"@search.score": 1.0, "id": "c", "title": "C"},
                {"@search.score": 1.0, "id": "d", "title": "D"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let docs = client_for(&server)
        .extract_batch("products", Some("id"), &request(2, Some("b")))
        .await
        .unwrap();

    // Assert
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["id"], "c");
    assert!(docs.iter().all(|d| !d.contains_key("@search.score")));
}

#[tokio::test]
async fn test_extract_batch_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes/products/docs/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .extract_batch("products", Some("id"), &request(0, None))
        .await;

    assert!(matches!(result, Err(Error::SourceConnection(ref m)) if m.contains("503")));
}

#[test]
fn test_source_type() {
    let client = AzureSearchClient::new(AzureSearchConfig::default());
    assert_eq!(client.source_type(), "azure_ai_search");
}
