// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # Azure AI Search to Milvus migration
//!
//! `az2milvus` is a CLI tool and library that converts an Azure AI Search
//! index definition into a Milvus collection schema and moves its documents
//! across in resumable, checkpointed batches.
//!
//! ## Type mapping
//!
//! | Azure (EDM) | Milvus | Confidence |
//! |-------------|--------|------------|
//! | `Edm.String` | `VarChar` | exact |
//! | `Edm.Int32` / `Edm.Int64` | `Int32` / `Int64` | exact |
//! | `Edm.DateTimeOffset` | `VarChar` (ISO 8601) | semantic |
//! | `Edm.GeographyPoint` / `Edm.ComplexType` | `JSON` | semantic |
//! | `Collection(Edm.Single)` | `FloatVector` | exact |
//! | `Collection(Edm.Half)` | `Float16Vector` | exact |
//! | `Collection(Edm.Int16)` / `Collection(Edm.SByte)` | `FloatVector` | lossy |
//! | `Collection(Edm.Byte)` | `BinaryVector` | exact |
//!
//! ## Quick Start
//!
//! ```bash
//! # Pre-migration assessment
//! az2milvus --config migration.yaml assess
//!
//! # Convert an exported index definition offline
//! az2milvus schema --from-json index.json
//!
//! # Migrate, then check the result
//! az2milvus --config migration.yaml migrate --dry-run
//! az2milvus --config migration.yaml migrate
//! az2milvus --config migration.yaml validate
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! azure_search:
//!   endpoint: https://my-service.search.windows.net
//!   index_name: products
//!   api_key: ${AZURE_SEARCH_API_KEY}
//!
//! milvus:
//!   uri: http://localhost:19530
//!   collection_name: products
//!
//! options:
//!   batch_size: 500
//!   exclude_fields: [internal_notes]
//! ```

#![warn(missing_docs)]

pub mod assessment;
pub mod checkpoint;
pub mod collection;
pub mod config;
pub mod connectors;
pub mod error;
pub mod index_mapping;
pub mod pipeline;
pub mod retry;
pub mod schema_converter;
pub mod source;
pub mod transform;
pub mod type_mapping;
pub mod validation;

pub use assessment::{generate_assessment, AssessmentReport, Feasibility};
pub use checkpoint::{CheckpointManager, CheckpointStatus, MigrationCheckpoint};
pub use collection::{CollectionSchema, DataType, FieldSchema};
pub use config::{MigrationConfig, MigrationOptions};
pub use connectors::{AzureSearchClient, MilvusClient, SourceConnector, TargetSink};
pub use error::{Error, Result};
pub use pipeline::{CancelFlag, DataMigrator, MigrationOutcome, MigrationStats};
pub use schema_converter::{SchemaConversionResult, SchemaConverter};
pub use source::SourceIndex;
pub use transform::DataTransformer;
pub use validation::{MigrationValidator, ValidationReport};
