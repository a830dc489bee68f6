//! Top-level analysis pipeline for the claims dashboard.
//!
//! Loads the record set, applies the filter, runs every aggregation and the
//! optional status drill-down, returning an [`AnalysisResult`] ready for
//! rendering.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use claims_core::data_processors::DateFieldDetector;
use claims_core::error::{ClaimsError, Result};
use claims_core::models::{ClaimRecord, DashboardReport};
use claims_core::settings::Settings;
use claims_core::time_utils::TimezoneHandler;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{AggregationOptions, ClaimsAggregator};
use crate::filters::{claims_with_status, filter_options, ClaimFilter, FilterOptions};
use crate::reader::load_claim_records;

// ── Public types ──────────────────────────────────────────────────────────────

/// Inputs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Claims file or directory.
    pub data_path: PathBuf,
    pub filter: ClaimFilter,
    pub aggregation: AggregationOptions,
    /// Status to drill down into, if any.
    pub status: Option<String>,
}

impl AnalysisOptions {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            filter: ClaimFilter::default(),
            aggregation: AggregationOptions::default(),
            status: None,
        }
    }

    /// Build options from resolved CLI settings.
    pub fn from_settings(settings: &Settings, data_path: PathBuf) -> Result<Self> {
        Ok(Self {
            data_path,
            filter: ClaimFilter {
                payer: settings.payer.clone(),
                dept: settings.dept.clone(),
                date_range: settings.date_range()?,
            },
            aggregation: AggregationOptions {
                denial_sort: settings.denial_sort(),
                date_fields: DateFieldDetector::with_candidates(settings.date_fields.iter()),
                timezone: TimezoneHandler::new(&settings.timezone),
            },
            status: settings.status.clone(),
        })
    }
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Records read from the data source.
    pub records_loaded: usize,
    /// Records left after filtering; every view is computed over these.
    pub records_after_filter: usize,
    /// Filtered records that carry a usable date.
    pub records_dated: usize,
    /// Wall-clock seconds spent loading the data source.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent filtering and aggregating.
    pub aggregate_time_seconds: f64,
}

/// The complete output of [`analyze_claims`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub report: DashboardReport,
    /// Payers and departments available to filter on (whole data set).
    pub filter_options: FilterOptions,
    /// Status drill-down: the selected status and its claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drill_down: Option<StatusDrillDown>,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDrillDown {
    pub status: String,
    pub claims: Vec<ClaimRecord>,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load claim records from `options.data_path`.
/// 2. Apply the payer / department / date filter.
/// 3. Compute every dashboard view over the retained records.
/// 4. Collect the drill-down claims for the selected status.
///
/// An empty data source is an error ([`ClaimsError::NoRecords`]); a filter
/// that retains nothing is not, and yields the zero-form report.
pub fn analyze_claims(options: &AnalysisOptions) -> Result<AnalysisResult> {
    // ── Step 1: Load records ──────────────────────────────────────────────────
    let load_start = Instant::now();
    let records = load_claim_records(&options.data_path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    if records.is_empty() {
        return Err(ClaimsError::NoRecords);
    }

    // ── Step 2-4: Filter, aggregate, drill down ───────────────────────────────
    let aggregate_start = Instant::now();
    let filtered = options.filter.apply(&records, &options.aggregation);
    if !options.filter.is_empty() {
        debug!(
            "Filter kept {} of {} records",
            filtered.len(),
            records.len()
        );
    }

    let aggregator = ClaimsAggregator::new(options.aggregation.clone());
    let report = aggregator.aggregate(&filtered);

    let drill_down = options.status.as_ref().map(|status| StatusDrillDown {
        status: status.clone(),
        claims: claims_with_status(filtered.iter().copied(), status)
            .into_iter()
            .cloned()
            .collect(),
    });
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    // Each dated record lands in exactly one day.
    let records_dated = report.daily_trend.iter().map(|p| p.claim_count as usize).sum();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        records_loaded: records.len(),
        records_after_filter: filtered.len(),
        records_dated,
        load_time_seconds: load_time,
        aggregate_time_seconds: aggregate_time,
    };

    info!(
        "Analyzed {} claims ({} after filter) in {:.3}s",
        metadata.records_loaded,
        metadata.records_after_filter,
        load_time + aggregate_time
    );

    Ok(AnalysisResult {
        report,
        filter_options: filter_options(&records),
        drill_down,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
