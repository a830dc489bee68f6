//! Record selection ahead of aggregation: payer / department / date-range
//! filters, the values available to filter on, and the status drill-down.

use chrono::NaiveDate;
use claims_core::models::{fields, ClaimRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::aggregator::AggregationOptions;

/// Filter over a claim record set. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFilter {
    pub payer: Option<String>,
    pub dept: Option<String>,
    /// Inclusive calendar-date range in the reporting timezone.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl ClaimFilter {
    pub fn is_empty(&self) -> bool {
        self.payer.is_none() && self.dept.is_none() && self.date_range.is_none()
    }

    /// Records retained by the filter, in input order.
    ///
    /// With a date range set, records without a usable date are dropped.
    pub fn apply<'r>(
        &self,
        records: &'r [ClaimRecord],
        options: &AggregationOptions,
    ) -> Vec<&'r ClaimRecord> {
        records
            .iter()
            .filter(|record| self.matches(record, options))
            .collect()
    }

    pub fn matches(&self, record: &ClaimRecord, options: &AggregationOptions) -> bool {
        if let Some(payer) = &self.payer {
            if record.category(fields::PAYER).as_deref() != Some(payer.as_str()) {
                return false;
            }
        }
        if let Some(dept) = &self.dept {
            if record.category(fields::DEPT).as_deref() != Some(dept.as_str()) {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            let date = options
                .date_fields
                .date_value(record)
                .and_then(|value| options.timezone.parse_date(value));
            return matches!(date, Some(d) if start <= d && d <= end);
        }
        true
    }
}

/// Distinct filterable values, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub payers: Vec<String>,
    pub depts: Vec<String>,
}

pub fn filter_options(records: &[ClaimRecord]) -> FilterOptions {
    FilterOptions {
        payers: distinct(records, fields::PAYER),
        depts: distinct(records, fields::DEPT),
    }
}

/// Drill-down: records whose status (missing reads as `Unknown`) equals
/// `status`.
pub fn claims_with_status<'r, I>(records: I, status: &str) -> Vec<&'r ClaimRecord>
where
    I: IntoIterator<Item = &'r ClaimRecord>,
{
    records
        .into_iter()
        .filter(|record| record.status() == status)
        .collect()
}

fn distinct(records: &[ClaimRecord], field: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.category(field))
        .filter(|value| seen.insert(value.to_string()))
        .map(|value| value.into_owned())
        .collect()
}
