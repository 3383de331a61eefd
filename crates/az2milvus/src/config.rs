//! Configuration types for az2milvus.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Mask substituted for secrets in [`MigrationConfig::redacted`].
pub const REDACTED: &str = "***";

/// Largest `max_length` Milvus accepts for a `VarChar` field.
pub const VARCHAR_LIMIT: u32 = 65_535;

/// Largest `max_capacity` Milvus accepts for an `Array` field.
pub const ARRAY_CAPACITY_LIMIT: u32 = 4096;

/// Largest page Azure AI Search returns from one search request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Main migration configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source Azure AI Search service.
    #[serde(default)]
    pub azure_search: AzureSearchConfig,
    /// Target Milvus deployment.
    #[serde(default)]
    pub milvus: MilvusConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Azure AI Search connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureSearchConfig {
    /// Service endpoint (e.g., `https://my-service.search.windows.net`).
    #[serde(default)]
    pub endpoint: String,
    /// Index to migrate.
    #[serde(default)]
    pub index_name: String,
    /// Admin or query API key.
    #[serde(default)]
    pub api_key: String,
    /// REST API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AzureSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index_name: String::new(),
            api_key: String::new(),
            api_version: default_api_version(),
        }
    }
}

/// Milvus connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusConfig {
    /// Server URI.
    #[serde(default = "default_milvus_uri")]
    pub uri: String,
    /// Token (`user:password` or a Zilliz Cloud API key).
    #[serde(default)]
    pub token: String,
    /// Database name.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Target collection; defaults to the index name with `-` replaced by `_`.
    #[serde(default)]
    pub collection_name: String,
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            uri: default_milvus_uri(),
            token: String::new(),
            db_name: default_db_name(),
            collection_name: String::new(),
        }
    }
}

/// Per-field overrides keyed by source field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverride {
    /// Target field name.
    #[serde(default)]
    pub milvus_name: Option<String>,
    /// `max_length` for `VarChar` fields and `VarChar` array elements.
    #[serde(default)]
    pub max_length: Option<u32>,
    /// `max_capacity` for `Array` fields.
    #[serde(default)]
    pub max_capacity: Option<u32>,
}

/// Migration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Documents per extraction and insert batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Directory holding checkpoint and lock files.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Drop and recreate the target collection.
    #[serde(default)]
    pub drop_existing_collection: bool,
    /// Extract and transform without writing to Milvus.
    #[serde(default)]
    pub dry_run: bool,
    /// Per-field overrides.
    #[serde(default)]
    pub field_overrides: HashMap<String, FieldOverride>,
    /// Source fields left out of the target schema.
    #[serde(default)]
    pub exclude_fields: Vec<String>,
    /// Accept fields not declared in the schema.
    #[serde(default = "default_true")]
    pub enable_dynamic_field: bool,
    /// Source field to use as the Milvus partition key.
    #[serde(default)]
    pub partition_key_field: Option<String>,
    /// Global `VarChar` `max_length`.
    #[serde(default = "default_varchar_max_length")]
    pub varchar_max_length: u32,
    /// Global `Array` `max_capacity`.
    #[serde(default = "default_array_max_capacity")]
    pub array_max_capacity: u32,
    /// Retries for transient connector failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            checkpoint_dir: default_checkpoint_dir(),
            drop_existing_collection: false,
            dry_run: false,
            field_overrides: HashMap::new(),
            exclude_fields: Vec::new(),
            enable_dynamic_field: true,
            partition_key_field: None,
            varchar_max_length: default_varchar_max_length(),
            array_max_capacity: default_array_max_capacity(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_version() -> String {
    "2024-07-01".to_string()
}

fn default_milvus_uri() -> String {
    "http://localhost:19530".to_string()
}

fn default_db_name() -> String {
    "default".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from(".checkpoints")
}

fn default_true() -> bool {
    true
}

fn default_varchar_max_length() -> u32 {
    VARCHAR_LIMIT
}

fn default_array_max_capacity() -> u32 {
    ARRAY_CAPACITY_LIMIT
}

fn default_max_retries() -> u32 {
    3
}

fn fill(slot: &mut String, var: &str, lookup: &impl Fn(&str) -> Option<String>) {
    if slot.is_empty() {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            *slot = value;
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a YAML file and resolve environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.resolve_env();
        Ok(config)
    }

    /// Parse configuration from YAML text without touching the environment.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Fill empty connection values from the process environment.
    pub fn resolve_env(&mut self) {
        self.resolve_with(|var| std::env::var(var).ok());
    }

    /// Fill empty connection values from `lookup`.
    ///
    /// Reads `AZURE_SEARCH_ENDPOINT`, `AZURE_SEARCH_API_KEY`,
    /// `AZURE_SEARCH_INDEX_NAME`, `MILVUS_URI` and `MILVUS_TOKEN`.
    pub fn resolve_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill(&mut self.azure_search.endpoint, "AZURE_SEARCH_ENDPOINT", &lookup);
        fill(&mut self.azure_search.api_key, "AZURE_SEARCH_API_KEY", &lookup);
        fill(&mut self.azure_search.index_name, "AZURE_SEARCH_INDEX_NAME", &lookup);
        fill(&mut self.milvus.token, "MILVUS_TOKEN", &lookup);

        if self.milvus.uri.is_empty() || self.milvus.uri == default_milvus_uri() {
            if let Some(uri) = lookup("MILVUS_URI").filter(|v| !v.is_empty()) {
                self.milvus.uri = uri;
            }
        }
        if self.milvus.uri.is_empty() {
            self.milvus.uri = default_milvus_uri();
        }
    }

    /// Target collection name: configured value, else the index name with
    /// `-` replaced by `_`.
    #[must_use]
    pub fn collection_name(&self, index_name: &str) -> String {
        if self.milvus.collection_name.is_empty() {
            index_name.replace('-', "_")
        } else {
            self.milvus.collection_name.clone()
        }
    }

    /// Validate the options section.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is zero or above what Milvus accepts.
    pub fn validate_options(&self) -> Result<()> {
        let o = &self.options;
        if o.batch_size == 0 || o.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if o.varchar_max_length == 0 || o.varchar_max_length > VARCHAR_LIMIT {
            return Err(Error::Config(format!(
                "varchar_max_length must be between 1 and {VARCHAR_LIMIT}"
            )));
        }
        if o.array_max_capacity == 0 || o.array_max_capacity > ARRAY_CAPACITY_LIMIT {
            return Err(Error::Config(format!(
                "array_max_capacity must be between 1 and {ARRAY_CAPACITY_LIMIT}"
            )));
        }
        for (field, ov) in &o.field_overrides {
            if ov.max_length.is_some_and(|n| n == 0 || n > VARCHAR_LIMIT) {
                return Err(Error::Config(format!(
                    "field_overrides.{field}.max_length must be between 1 and {VARCHAR_LIMIT}"
                )));
            }
            if ov
                .max_capacity
                .is_some_and(|n| n == 0 || n > ARRAY_CAPACITY_LIMIT)
            {
                return Err(Error::Config(format!(
                    "field_overrides.{field}.max_capacity must be between 1 and {ARRAY_CAPACITY_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    /// Validate the configuration for a run against live services.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection setting is missing or an option is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.azure_search.endpoint.is_empty() {
            return Err(Error::Config(
                "azure_search.endpoint is required (or set AZURE_SEARCH_ENDPOINT)".to_string(),
            ));
        }
        if self.azure_search.index_name.is_empty() {
            return Err(Error::Config(
                "azure_search.index_name is required (or set AZURE_SEARCH_INDEX_NAME)".to_string(),
            ));
        }
        if self.azure_search.api_key.is_empty() {
            return Err(Error::Config(
                "azure_search.api_key is required (or set AZURE_SEARCH_API_KEY)".to_string(),
            ));
        }
        if self.milvus.uri.is_empty() {
            return Err(Error::Config("milvus.uri cannot be empty".to_string()));
        }
        self.validate_options()
    }

    /// Copy with secrets masked, for logging and display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.azure_search.api_key.is_empty() {
            copy.azure_search.api_key = REDACTED.to_string();
        }
        if !copy.milvus.token.is_empty() {
            copy.milvus.token = REDACTED.to_string();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_config() -> MigrationConfig {
        let mut config = MigrationConfig::default();
        config.azure_search.endpoint = "https://svc.search.windows.net".to_string();
        config.azure_search.index_name = "products".to_string();
        config.azure_search.api_key = "secret".to_string();
        config
    }

    #[test]
    fn test_config_defaults() {
        let options = MigrationOptions::default();
        assert_eq!(options.batch_size, 500);
        assert_eq!(options.checkpoint_dir, PathBuf::from(".checkpoints"));
        assert_eq!(options.varchar_max_length, 65_535);
        assert_eq!(options.array_max_capacity, 4096);
        assert!(options.enable_dynamic_field);
        assert!(!options.dry_run);

        let config = MigrationConfig::default();
        assert_eq!(config.azure_search.api_version, "2024-07-01");
        assert_eq!(config.milvus.uri, "http://localhost:19530");
        assert_eq!(config.milvus.db_name, "default");
    }

    #[test]
    fn test_config_yaml_parse() {
        let yaml = r#"
azure_search:
  endpoint: https://svc.search.windows.net
  index_name: products-v2
milvus:
  uri: http://milvus:19530
options:
  batch_size: 200
  exclude_fields: [internal_notes]
  partition_key_field: category
  field_overrides:
    title:
      milvus_name: product_title
      max_length: 1024
"#;
        let config = MigrationConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.azure_search.index_name, "products-v2");
        assert_eq!(config.azure_search.api_version, "2024-07-01");
        assert_eq!(config.milvus.uri, "http://milvus:19530");
        assert_eq!(config.options.batch_size, 200);
        assert_eq!(config.options.exclude_fields, vec!["internal_notes".to_string()]);
        assert_eq!(config.options.partition_key_field.as_deref(), Some("category"));
        let title = &config.options.field_overrides["title"];
        assert_eq!(title.milvus_name.as_deref(), Some("product_title"));
        assert_eq!(title.max_length, Some(1024));
        assert_eq!(title.max_capacity, None);
        assert_eq!(config.collection_name("products-v2"), "products_v2");
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        assert_eq!(MigrationConfig::from_yaml("  \n").unwrap(), MigrationConfig::default());
    }

    #[test]
    fn test_from_file_reads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration.yaml");
        std::fs::write(&path, "milvus:\n  collection_name: target\n").unwrap();

        let config = MigrationConfig::from_file(&path).unwrap();

        assert_eq!(config.collection_name("ignored"), "target");
    }

    #[test]
    fn test_resolve_fills_only_empty_values() {
        // Arrange
        let mut config = MigrationConfig::default();
        config.azure_search.index_name = "explicit".to_string();
        let env = HashMap::from([
            ("AZURE_SEARCH_ENDPOINT", "https://env.search.windows.net"),
            ("AZURE_SEARCH_INDEX_NAME", "from-env"),
            ("AZURE_SEARCH_API_KEY", "env-key"),
            ("MILVUS_URI", "http://env-milvus:19530"),
            ("MILVUS_TOKEN", "root:Milvus"),
        ]);

        // Act
        config.resolve_with(|var| env.get(var).map(|v| (*v).to_string()));

        // Assert
        assert_eq!(config.azure_search.endpoint, "https://env.search.windows.net");
        assert_eq!(config.azure_search.index_name, "explicit");
        assert_eq!(config.azure_search.api_key, "env-key");
        assert_eq!(config.milvus.uri, "http://env-milvus:19530");
        assert_eq!(config.milvus.token, "root:Milvus");
    }

    #[test]
    fn test_resolve_keeps_explicit_milvus_uri() {
        let mut config = MigrationConfig::default();
        config.milvus.uri = "http://explicit:19530".to_string();

        config.resolve_with(|_| Some("http://env:19530".to_string()));

        assert_eq!(config.milvus.uri, "http://explicit:19530");
    }

    #[test]
    fn test_validate_requires_connection_settings() {
        let config = MigrationConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(live_config().validate().is_ok());
    }

    #[test]
    fn test_validate_option_limits() {
        let mut config = live_config();
        config.options.varchar_max_length = 70_000;
        assert!(config.validate().is_err());

        let mut config = live_config();
        config.options.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = live_config();
        config.options.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());

        let mut config = live_config();
        config.options.field_overrides.insert(
            "tags".to_string(),
            FieldOverride {
                max_capacity: Some(5000),
                ..FieldOverride::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("field_overrides.tags"));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = live_config();
        config.milvus.token = "root:Milvus".to_string();

        let redacted = config.redacted();

        assert_eq!(redacted.azure_search.api_key, REDACTED);
        assert_eq!(redacted.milvus.token, REDACTED);
        assert_eq!(redacted.azure_search.endpoint, config.azure_search.endpoint);
        // Original untouched
        assert_eq!(config.azure_search.api_key, "secret");
    }
}
