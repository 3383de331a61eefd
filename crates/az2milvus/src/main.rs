//! Azure AI Search to Milvus migration CLI
//!
//! Assesses, converts, migrates and validates an Azure AI Search index
//! against a Milvus collection.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use az2milvus::assessment::AssessmentReport;
use az2milvus::connectors::{AzureSearchClient, MilvusClient, SourceConnector, TargetSink};
use az2milvus::pipeline::create_progress_bar;
use az2milvus::schema_converter::SchemaConversionResult;
use az2milvus::{
    generate_assessment, CancelFlag, DataMigrator, MigrationConfig, MigrationValidator,
    SchemaConverter,
};

#[derive(Parser)]
#[command(name = "az2milvus")]
#[command(version)]
#[command(about = "Migrate an Azure AI Search index to Milvus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true, default_value = "migration.yaml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess the source index before migrating
    Assess {
        /// Write the report as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Convert the index schema without migrating data
    Schema {
        /// Read the index definition from an exported JSON file instead of the service
        #[arg(long, value_name = "FILE")]
        from_json: Option<PathBuf>,

        /// Write the conversion result as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Migrate documents into Milvus
    Migrate {
        /// Extract and transform without writing to Milvus
        #[arg(long)]
        dry_run: bool,

        /// Drop the target collection first
        #[arg(long)]
        drop_existing: bool,

        /// Batch size override
        #[arg(long)]
        batch_size: Option<usize>,

        /// Ignore an in-progress checkpoint and start over
        #[arg(long)]
        no_resume: bool,
    },

    /// Compare the migrated collection against the source index
    Validate {
        /// Rows to read back from Milvus
        #[arg(long, default_value_t = 10)]
        sample_size: usize,

        /// Allowed document count difference, in percent
        #[arg(long, default_value_t = 0.0)]
        tolerance: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Assess { output } => {
            assess(&cli.config, output.as_deref()).await?;
        }
        Commands::Schema { from_json, output } => {
            show_schema(&cli.config, from_json.as_deref(), output.as_deref()).await?;
        }
        Commands::Migrate {
            dry_run,
            drop_existing,
            batch_size,
            no_resume,
        } => {
            let mut config = load_config(&cli.config)?;
            if dry_run {
                config.options.dry_run = true;
            }
            if drop_existing {
                config.options.drop_existing_collection = true;
            }
            if let Some(bs) = batch_size {
                config.options.batch_size = bs;
            }
            config.validate_options()?;
            run_migration(config, !no_resume).await?;
        }
        Commands::Validate {
            sample_size,
            tolerance,
        } => {
            validate(&cli.config, sample_size, tolerance).await?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", path);
    let config = MigrationConfig::from_file(path)
        .with_context(|| format!("cannot load configuration from {}", path.display()))?;
    config.validate()?;
    info!(config = ?config.redacted(), "Configuration loaded");
    Ok(config)
}

/// Fetches the live index definition and converts it.
async fn convert_live(
    config: &MigrationConfig,
    source: &AzureSearchClient,
) -> anyhow::Result<SchemaConversionResult> {
    let index = source.get_index(&config.azure_search.index_name).await?;
    Ok(SchemaConverter::new(config.options.clone())
        .with_collection_name(config.collection_name(&index.name))
        .convert(&index))
}

async fn assess(config_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let source = AzureSearchClient::new(config.azure_search.clone());

    let conversion = convert_live(&config, &source).await?;
    let count = source
        .document_count(&config.azure_search.index_name)
        .await?;
    let report = generate_assessment(&conversion, count);

    print_assessment(&report);

    if let Some(path) = output {
        let path = report.save_json(path)?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

fn print_assessment(report: &AssessmentReport) {
    println!(
        "\n{} {} -> {}",
        style("Assessment:").bold(),
        report.index_name,
        report.collection_name
    );
    println!("   Documents:    {}", report.document_count);
    println!(
        "   Fields:       {} total, {} convertible, {} lossy, {} skipped",
        report.total_fields, report.convertible_fields, report.lossy_fields, report.skipped_fields
    );
    println!("   Vectors:      {}", report.vector_fields);
    let verdict = report.migration_feasibility.as_str();
    let verdict = match report.migration_feasibility {
        az2milvus::Feasibility::Full => style(verdict).green(),
        az2milvus::Feasibility::Partial => style(verdict).yellow(),
        az2milvus::Feasibility::Complex => style(verdict).red(),
    };
    println!("   Feasibility:  {}", verdict.bold());

    println!("\n{}", style("Fields").bold());
    for f in &report.field_details {
        let marker = if f.skipped {
            style("skip").dim()
        } else {
            style(f.confidence.as_str()).cyan()
        };
        println!(
            "   {:<24} {:<28} -> {:<14} [{}]",
            f.source_name, f.source_type, f.target_type, marker
        );
    }

    if !report.index_details.is_empty() {
        println!("\n{}", style("Vector indexes").bold());
        for i in &report.index_details {
            println!(
                "   {:<24} {} / {} -> {} / {}",
                i.target_field, i.source_algorithm, i.source_metric, i.index_type, i.metric_type
            );
        }
    }

    if !report.unsupported_features.is_empty() {
        println!("\n{}", style("Not carried over").bold().yellow());
        for gap in &report.unsupported_features {
            println!("   - {}: {}", gap.feature, gap.description);
        }
    }

    if !report.warnings.is_empty() {
        println!("\n{}", style("Warnings").bold().yellow());
        for w in &report.warnings {
            println!("   - [{}] {}", w.category.as_str(), w.message);
        }
    }
}

async fn show_schema(
    config_path: &Path,
    from_json: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let conversion = match from_json {
        Some(path) => {
            // The config file is optional offline; its options still apply when present.
            let config = if config_path.exists() {
                let config = MigrationConfig::from_file(config_path)?;
                config.validate_options()?;
                config
            } else {
                MigrationConfig::default()
            };
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&content)?;
            let converter = SchemaConverter::new(config.options.clone())
                .with_collection_name(config.milvus.collection_name.clone());
            converter.convert_from_json(&json)
        }
        None => {
            let config = load_config(config_path)?;
            let source = AzureSearchClient::new(config.azure_search.clone());
            convert_live(&config, &source).await?
        }
    };

    let summary = conversion.summary();
    println!(
        "\n{} {} -> {}",
        style("Schema:").bold(),
        summary.source_index,
        summary.collection_name
    );
    println!(
        "   Fields:    {} total, {} converted, {} skipped ({} vector)",
        summary.fields_total, summary.fields_converted, summary.fields_skipped, summary.vector_fields
    );
    println!("   Indexes:   {}", summary.indexes);
    println!("   Warnings:  {}", summary.warnings);
    if !summary.unsupported_features.is_empty() {
        println!("   Unsupported: {}", summary.unsupported_features.join(", "));
    }
    println!(
        "\n{}",
        serde_json::to_string_pretty(&conversion.schema.to_rest_json())?
    );

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&conversion)?)?;
        println!("\nConversion written to {}", path.display());
    }
    Ok(())
}

async fn run_migration(config: MigrationConfig, resume: bool) -> anyhow::Result<()> {
    let source = AzureSearchClient::new(config.azure_search.clone());
    let conversion = convert_live(&config, &source).await?;
    let total = source
        .document_count(&config.azure_search.index_name)
        .await?;

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current batch");
            on_signal.cancel();
        }
    });

    let pb = create_progress_bar(total);
    let progress = pb.clone();

    info!(
        index = %conversion.source_index,
        collection = %conversion.collection_name,
        documents = total,
        "Starting migration..."
    );

    let target = MilvusClient::new(config.milvus.clone());
    let mut migrator = DataMigrator::new(
        config.options.clone(),
        conversion,
        Box::new(source),
        Box::new(target),
    )
    .with_progress(Box::new(move |migrated, total| {
        progress.set_length(total);
        progress.set_position(migrated);
    }))
    .with_cancel_flag(cancel)
    .resume(resume);

    let result = migrator.run().await;
    pb.finish_and_clear();
    let outcome = result?;

    let stats = &outcome.stats;
    let heading = if config.options.dry_run {
        "Dry run complete"
    } else {
        "Migration complete"
    };
    println!("\n{}", style(heading).green().bold());
    println!("   Extracted:  {}", stats.extracted);
    println!("   Loaded:     {}", stats.loaded);
    println!("   Rejected:   {}", stats.rejected);
    if stats.resumed_from > 0 {
        println!("   Resumed at: {}", stats.resumed_from);
    }
    println!("   Duration:   {:.2}s", stats.duration_secs);
    println!("   Throughput: {:.0} docs/sec", stats.throughput());
    if !outcome.checkpoint.failed_document_keys.is_empty() {
        println!(
            "   Rejected keys are listed in {}",
            migrator
                .checkpoints()
                .checkpoint_path(&outcome.checkpoint.index_name)
                .display()
        );
    }

    Ok(())
}

async fn validate(config_path: &Path, sample_size: usize, tolerance: f64) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let source = AzureSearchClient::new(config.azure_search.clone());
    let conversion = convert_live(&config, &source).await?;

    let mut target = MilvusClient::new(config.milvus.clone());
    target.connect().await?;

    let report = MigrationValidator::new(&source, &target, &conversion)
        .validate(sample_size, tolerance)
        .await;

    println!("\n{}", style("Validation").bold());
    for check in &report.checks {
        let status = if check.passed {
            style("PASS").green()
        } else {
            style("FAIL").red()
        };
        println!("   [{}] {:<24} {}", status, check.name, check.message);
    }

    let summary = report.summary();
    if report.all_passed() {
        println!("\n{}", style(summary).green().bold());
        Ok(())
    } else {
        println!("\n{}", style(&summary).red().bold());
        anyhow::bail!("validation failed: {summary}")
    }
}
