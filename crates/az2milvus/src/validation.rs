//! Post-migration validation.
//!
//! Compares the migrated collection against the source index: document
//! counts within a tolerance, declared field count, how many sampled scalar
//! values are non-null, and vector dimensions. A check that cannot run
//! because a service call failed is reported as failed, never raised.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use crate::connectors::{SourceConnector, TargetSink};
use crate::schema_converter::SchemaConversionResult;

/// Sampled scalar values must be non-null above this share, in percent.
pub const MIN_FILL_RATE_PCT: f64 = 50.0;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationCheck {
    /// Check identifier.
    pub name: String,
    /// Whether it passed.
    pub passed: bool,
    /// Expected value, when meaningful.
    pub expected: Option<String>,
    /// Observed value, when measured.
    pub actual: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl ValidationCheck {
    fn new(name: impl Into<String>, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            expected: None,
            actual: None,
            message: message.into(),
        }
    }

    fn measured(mut self, expected: impl ToString, actual: impl ToString) -> Self {
        self.expected = Some(expected.to_string());
        self.actual = Some(actual.to_string());
        self
    }
}

/// All checks of one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Checks in execution order.
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    /// Whether every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Number of passed checks.
    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Number of failed checks.
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.checks.len() - self.pass_count()
    }

    /// One-line verdict, e.g. `[PASS] 4/4 checks passed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let status = if self.all_passed() { "PASS" } else { "FAIL" };
        format!(
            "[{status}] {}/{} checks passed",
            self.pass_count(),
            self.checks.len()
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Validates a finished migration.
pub struct MigrationValidator<'a> {
    source: &'a dyn SourceConnector,
    target: &'a dyn TargetSink,
    conversion: &'a SchemaConversionResult,
}

impl<'a> MigrationValidator<'a> {
    /// Creates a validator. The target must already be connected.
    #[must_use]
    pub fn new(
        source: &'a dyn SourceConnector,
        target: &'a dyn TargetSink,
        conversion: &'a SchemaConversionResult,
    ) -> Self {
        Self {
            source,
            target,
            conversion,
        }
    }

    /// Runs every check.
    ///
    /// `sample_size` rows are read back for the fill-rate and dimension
    /// checks; counts may differ by `count_tolerance_pct` percent.
    pub async fn validate(&self, sample_size: usize, count_tolerance_pct: f64) -> ValidationReport {
        let mut report = ValidationReport::default();
        report
            .checks
            .push(self.check_document_count(count_tolerance_pct).await);
        report.checks.push(self.check_field_count().await);
        report
            .checks
            .extend(self.check_sample_data(sample_size).await);

        for check in report.checks.iter().filter(|c| !c.passed) {
            warn!(check = %check.name, message = %check.message, "Validation check failed");
        }
        info!(summary = %report.summary(), "Validation finished");
        report
    }

    #[allow(clippy::cast_precision_loss)]
    async fn check_document_count(&self, tolerance_pct: f64) -> ValidationCheck {
        const NAME: &str = "document_count";
        let counts = async {
            let source = self
                .source
                .document_count(&self.conversion.source_index)
                .await?;
            let target = self.target.count(&self.conversion.collection_name).await?;
            Ok::<_, crate::error::Error>((source, target))
        };

        match counts.await {
            Err(e) => ValidationCheck::new(NAME, false, format!("Count check failed: {e}")),
            Ok((0, target)) => ValidationCheck::new(NAME, true, "Source index is empty")
                .measured(0, target),
            Ok((source, target)) => {
                let diff_pct = source.abs_diff(target) as f64 / source as f64 * 100.0;
                let passed = diff_pct <= tolerance_pct;
                let message = if passed {
                    format!("Counts match (difference {diff_pct:.2}%)")
                } else {
                    format!(
                        "Count mismatch: source={source}, target={target} (difference {diff_pct:.2}%)"
                    )
                };
                ValidationCheck::new(NAME, passed, message).measured(source, target)
            }
        }
    }

    async fn check_field_count(&self) -> ValidationCheck {
        const NAME: &str = "field_count";
        let expected = self
            .conversion
            .field_conversions
            .iter()
            .filter(|fc| !fc.skipped && fc.target_field.is_some())
            .count();

        match self.target.field_count(&self.conversion.collection_name).await {
            Ok(actual) => ValidationCheck::new(
                NAME,
                actual >= expected,
                format!("Fields: expected at least {expected}, found {actual}"),
            )
            .measured(expected, actual),
            Err(e) => {
                let mut check =
                    ValidationCheck::new(NAME, false, format!("Field count check failed: {e}"));
                check.expected = Some(expected.to_string());
                check
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    async fn check_sample_data(&self, sample_size: usize) -> Vec<ValidationCheck> {
        if self.conversion.primary_key().is_none() {
            return vec![ValidationCheck::new(
                "sample_data",
                true,
                "No primary key; sample check skipped",
            )];
        }

        let samples = match self
            .target
            .query_sample(&self.conversion.collection_name, sample_size)
            .await
        {
            Ok(samples) => samples,
            Err(e) => {
                return vec![ValidationCheck::new(
                    "sample_data",
                    false,
                    format!("Sample query failed: {e}"),
                )]
            }
        };
        if samples.is_empty() {
            return vec![ValidationCheck::new(
                "sample_data",
                true,
                "Target has no rows; sample check skipped",
            )];
        }

        let mut checks = Vec::new();

        let scalar_fields: Vec<&str> = self
            .conversion
            .field_conversions
            .iter()
            .filter(|fc| !fc.skipped && !fc.mapping.is_vector)
            .filter_map(|fc| fc.target_field.as_ref().map(|f| f.name.as_str()))
            .collect();

        let mut checked = 0_usize;
        let mut filled = 0_usize;
        for row in &samples {
            for field in &scalar_fields {
                if let Some(value) = row.get(*field) {
                    checked += 1;
                    if !value.is_null() {
                        filled += 1;
                    }
                }
            }
        }
        if checked > 0 {
            let rate = filled as f64 / checked as f64 * 100.0;
            checks.push(
                ValidationCheck::new(
                    "sample_data_fill_rate",
                    rate > MIN_FILL_RATE_PCT,
                    format!("Sample fill rate {rate:.1}% ({filled}/{checked})"),
                )
                .measured(format!(">{MIN_FILL_RATE_PCT}%"), format!("{rate:.1}%")),
            );
        }

        for fc in &self.conversion.field_conversions {
            let Some(field) = fc.target_field.as_ref().filter(|_| fc.mapping.is_vector) else {
                continue;
            };
            let Some(dim) = field.dim else { continue };

            let observed = samples
                .iter()
                .find_map(|row| row.get(&field.name).and_then(Value::as_array).map(Vec::len));
            let name = format!("vector_dim_{}", field.name);
            let check = match observed {
                Some(len) => ValidationCheck::new(
                    name,
                    len == dim as usize,
                    format!("Vector field '{}' has {len} dimensions, declared {dim}", field.name),
                )
                .measured(dim, len),
                None => ValidationCheck::new(
                    name,
                    true,
                    format!("Vector field '{}' declared with {dim} dimensions", field.name),
                )
                .measured(dim, dim),
            };
            checks.push(check);
        }

        checks
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
