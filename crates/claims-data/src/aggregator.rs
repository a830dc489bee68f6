//! Claims aggregation pipeline.
//!
//! Turns a flat claim record set into every chart-ready view of the
//! revenue-cycle dashboard. All functions are pure: records are only read,
//! and the same input always yields the same output.
//!
//! Views that group without an explicit sort list groups in order of first
//! appearance; sorts are stable, so ties keep that order as well.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{Datelike, NaiveDate};
use claims_core::data_processors::DateFieldDetector;
use claims_core::formatting::{percentage, round_to, safe_div};
use claims_core::models::{
    fields, ClaimAmountByStatusEntry, ClaimRecord, ClaimStatusEntry, CptAverageEntry,
    DashboardReport, DenialParetoEntry, DenialReasonEntry, DenialSort, DeptPaidDeniedEntry,
    FunnelStage, FunnelTotals, PayerClaimsEntry, PayerScorecardEntry, PendingAgingBucket,
    PreAuthDenialComparison, PreAuthKpi, ReimbursementBucket, TrendPoint,
};
use claims_core::time_utils::TimezoneHandler;
use tracing::{debug, warn};

/// Reimbursement-time buckets: label and inclusive upper bound in days.
pub const REIMBURSEMENT_BUCKETS: &[(&str, Option<f64>)] = &[
    ("0-15 days", Some(15.0)),
    ("16-30 days", Some(30.0)),
    ("31-45 days", Some(45.0)),
    ("46-60 days", Some(60.0)),
    ("61-90 days", Some(90.0)),
    ("90+ days", None),
];

/// Pending-claim aging buckets: label and inclusive upper bound in days.
pub const PENDING_AGING_BUCKETS: &[(&str, Option<f64>)] = &[
    ("0-30 days", Some(30.0)),
    ("31-60 days", Some(60.0)),
    ("61-90 days", Some(90.0)),
    ("91-120 days", Some(120.0)),
    ("120+ days", None),
];

/// Number of CPT codes kept in the average-claim view.
pub const CPT_TOP_N: usize = 10;

pub const STAGE_SUBMITTED: &str = "Claims Submitted";
pub const STAGE_PROCESSED: &str = "Claims Processed";
pub const STAGE_PAID: &str = "Claims Paid";

pub const WITH_PRE_AUTH: &str = "With Pre-Auth";
pub const WITHOUT_PRE_AUTH: &str = "Without Pre-Auth";

const STATUS_REJECTED: &str = "Rejected";
const STATUS_PENDING: &str = "Pending";
const PRE_AUTH_APPROVED: &str = "Approved";
const PRE_AUTH_DENIED: &str = "Denied";

// ── Grouped ───────────────────────────────────────────────────────────────────

/// Key → accumulator map that remembers first-appearance order.
struct Grouped<K, A> {
    index: HashMap<K, usize>,
    groups: Vec<(K, A)>,
}

impl<K: Hash + Eq + Clone, A: Default> Grouped<K, A> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut A {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.groups.len();
                self.index.insert(key.clone(), slot);
                self.groups.push((key, A::default()));
                slot
            }
        };
        &mut self.groups[slot].1
    }

    fn into_vec(self) -> Vec<(K, A)> {
        self.groups
    }
}

// ── Accumulators ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct AmountStats {
    total: f64,
    count: u64,
}

impl AmountStats {
    fn add(&mut self, amount: f64) {
        self.total += amount;
        self.count += 1;
    }

    fn average(&self) -> f64 {
        safe_div(self.total, self.count as f64)
    }
}

#[derive(Debug, Default)]
struct PayerStats {
    claimed: f64,
    paid: f64,
    denied: f64,
    claims: u64,
    reimbursement_days: f64,
    rejected: u64,
}

impl PayerStats {
    fn add(&mut self, record: &ClaimRecord) {
        self.claimed += record.amount(fields::CLAIM_AMOUNT);
        self.paid += record.amount(fields::PAID_AMOUNT);
        self.denied += record.amount(fields::DENIED_AMOUNT);
        self.claims += 1;
        self.reimbursement_days += record.reimbursement_days().unwrap_or(0.0);
        if record.text_equals(fields::CLAIM_STATUS, STATUS_REJECTED) {
            self.rejected += 1;
        }
    }
}

#[derive(Debug, Default)]
struct PaidDenied {
    paid: f64,
    denied: f64,
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Knobs for the views that need more than the records themselves.
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    /// Sort key of the denial-reasons breakdown.
    pub denial_sort: DenialSort,
    /// How each record's date field is located.
    pub date_fields: DateFieldDetector,
    /// Reporting timezone for day bucketing.
    pub timezone: TimezoneHandler,
}

// ── ClaimsTrend ───────────────────────────────────────────────────────────────

/// Monthly and daily claim trends plus dating coverage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimsTrend {
    pub monthly: Vec<TrendPoint>,
    pub daily: Vec<TrendPoint>,
    /// Records that contributed to the trends.
    pub dated_records: usize,
    /// Records skipped for a missing or unparseable date.
    pub undated_records: usize,
}

// ── ClaimsAggregator ──────────────────────────────────────────────────────────

/// Computes the dashboard views from a claim record set.
///
/// Holds configuration only; it carries no state between calls. Every view
/// accepts `&[ClaimRecord]` as well as `&[&ClaimRecord]` (filtered subsets).
#[derive(Debug, Clone, Default)]
pub struct ClaimsAggregator {
    options: AggregationOptions,
}

impl ClaimsAggregator {
    pub fn new(options: AggregationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// Compute every view.
    pub fn aggregate<R: Borrow<ClaimRecord>>(&self, records: &[R]) -> DashboardReport {
        let funnel_totals = Self::funnel_totals(records);
        let trend = self.claims_trend(records);

        DashboardReport {
            funnel: Self::revenue_funnel(&funnel_totals),
            funnel_totals,
            denial_pareto: Self::denial_pareto(records),
            payer_scorecard: Self::payer_scorecard(records),
            claim_status: Self::claim_status_distribution(records),
            pre_auth_kpis: Self::pre_auth_kpis(records),
            claim_amount_by_status: Self::claim_amount_by_status(records),
            dept_paid_denied: Self::dept_paid_denied(records),
            monthly_trend: trend.monthly,
            daily_trend: trend.daily,
            denial_reasons: Self::denial_reasons(records, self.options.denial_sort),
            reimbursement_time: Self::reimbursement_time_distribution(records),
            claims_by_payer: Self::claims_by_payer(records),
            pre_auth_denials: Self::pre_auth_denial_comparison(records),
            avg_claim_by_cpt: Self::avg_claim_by_cpt(records),
            pending_aging: Self::pending_claims_aging(records),
        }
    }

    // ── Funnel ────────────────────────────────────────────────────────────────

    /// Dataset-wide claimed / paid / denied totals and the pending remainder.
    ///
    /// Pending is not clamped: a negative value means paid plus denied exceed
    /// the claimed amount, and is logged as a data-quality warning.
    pub fn funnel_totals<R: Borrow<ClaimRecord>>(records: &[R]) -> FunnelTotals {
        let mut totals = FunnelTotals::default();
        for record in records.iter().map(as_record) {
            totals.total_claimed += record.amount(fields::CLAIM_AMOUNT);
            totals.total_paid += record.amount(fields::PAID_AMOUNT);
            totals.total_denied += record.amount(fields::DENIED_AMOUNT);
        }
        totals.total_pending = totals.total_claimed - totals.total_paid - totals.total_denied;

        if totals.total_pending < 0.0 {
            warn!(
                "Paid plus denied exceeds claimed by {:.2}; pending is negative",
                -totals.total_pending
            );
        }
        totals
    }

    /// The three funnel stages: submitted, processed, paid.
    pub fn revenue_funnel(totals: &FunnelTotals) -> Vec<FunnelStage> {
        vec![
            FunnelStage {
                name: STAGE_SUBMITTED.to_string(),
                value: totals.total_claimed,
            },
            FunnelStage {
                name: STAGE_PROCESSED.to_string(),
                value: totals.total_claimed - totals.total_pending,
            },
            FunnelStage {
                name: STAGE_PAID.to_string(),
                value: totals.total_paid,
            },
        ]
    }

    // ── Denials ───────────────────────────────────────────────────────────────

    /// Denied amount per reason code, largest first, with shares of the
    /// Pareto total and their running sum.
    pub fn denial_pareto<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<DenialParetoEntry> {
        let mut by_reason: Grouped<String, f64> = Grouped::new();
        for (record, reason) in denials(records) {
            *by_reason.entry(reason) += record.amount(fields::DENIED_AMOUNT);
        }

        let mut rows = by_reason.into_vec();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));

        let total: f64 = rows.iter().map(|(_, amount)| amount).sum();
        let mut cumulative = 0.0;

        rows.into_iter()
            .map(|(reason_code, denied_amount)| {
                let share = safe_div(denied_amount, total) * 100.0;
                cumulative += share;
                DenialParetoEntry {
                    reason_code,
                    denied_amount,
                    percentage: round_to(share, 1),
                    cumulative_percentage: round_to(cumulative, 1),
                }
            })
            .collect()
    }

    /// Count and amount per denial reason.
    pub fn denial_reasons<R: Borrow<ClaimRecord>>(
        records: &[R],
        sort: DenialSort,
    ) -> Vec<DenialReasonEntry> {
        let mut by_reason: Grouped<String, AmountStats> = Grouped::new();
        for (record, reason) in denials(records) {
            by_reason
                .entry(reason)
                .add(record.amount(fields::DENIED_AMOUNT));
        }

        let mut rows: Vec<DenialReasonEntry> = by_reason
            .into_vec()
            .into_iter()
            .map(|(reason, stats)| DenialReasonEntry {
                reason,
                count: stats.count,
                amount: stats.total,
            })
            .collect();

        match sort {
            DenialSort::Count => rows.sort_by(|a, b| b.count.cmp(&a.count)),
            DenialSort::Amount => rows.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
        }
        rows
    }

    // ── Payers ────────────────────────────────────────────────────────────────

    /// Per-payer totals and ratios. A missing payer forms its own group.
    pub fn payer_scorecard<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<PayerScorecardEntry> {
        let mut by_payer: Grouped<Option<String>, PayerStats> = Grouped::new();
        for record in records.iter().map(as_record) {
            let payer = record.category(fields::PAYER).map(|p| p.into_owned());
            by_payer.entry(payer).add(record);
        }

        by_payer
            .into_vec()
            .into_iter()
            .map(|(payer, stats)| PayerScorecardEntry {
                payer,
                total_claimed: stats.claimed,
                total_paid: stats.paid,
                total_denied: stats.denied,
                total_claims: stats.claims,
                total_reimbursement_days: stats.reimbursement_days,
                denied_claims: stats.rejected,
                avg_reimbursement_days: round_to(
                    safe_div(stats.reimbursement_days, stats.claims as f64),
                    1,
                ),
                denial_rate_percent: percentage(stats.rejected as f64, stats.claims as f64, 1),
                paid_to_claimed_ratio_percent: percentage(stats.paid, stats.claimed, 1),
            })
            .collect()
    }

    /// Claimed amount and claim count per payer, largest amount first.
    pub fn claims_by_payer<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<PayerClaimsEntry> {
        let mut by_payer: Grouped<String, AmountStats> = Grouped::new();
        for record in records.iter().map(as_record) {
            by_payer
                .entry(record.category_or_unknown(fields::PAYER).into_owned())
                .add(record.amount(fields::CLAIM_AMOUNT));
        }

        let mut rows: Vec<PayerClaimsEntry> = by_payer
            .into_vec()
            .into_iter()
            .map(|(name, stats)| PayerClaimsEntry {
                name,
                total_amount: stats.total,
                count: stats.count,
            })
            .collect();
        rows.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
        rows
    }

    // ── Status ────────────────────────────────────────────────────────────────

    /// Claim count per status with its share of all records.
    pub fn claim_status_distribution<R: Borrow<ClaimRecord>>(
        records: &[R],
    ) -> Vec<ClaimStatusEntry> {
        let mut by_status: Grouped<String, u64> = Grouped::new();
        for record in records.iter().map(as_record) {
            *by_status.entry(record.status().into_owned()) += 1;
        }

        let total = records.len() as f64;
        by_status
            .into_vec()
            .into_iter()
            .map(|(status, count)| ClaimStatusEntry {
                status,
                count,
                percentage: percentage(count as f64, total, 1),
            })
            .collect()
    }

    /// Claimed amount, count and average per status.
    pub fn claim_amount_by_status<R: Borrow<ClaimRecord>>(
        records: &[R],
    ) -> Vec<ClaimAmountByStatusEntry> {
        let mut by_status: Grouped<String, AmountStats> = Grouped::new();
        for record in records.iter().map(as_record) {
            by_status
                .entry(record.status().into_owned())
                .add(record.amount(fields::CLAIM_AMOUNT));
        }

        by_status
            .into_vec()
            .into_iter()
            .map(|(status, stats)| ClaimAmountByStatusEntry {
                status,
                total_amount: stats.total,
                count: stats.count,
                avg_amount: stats.average(),
            })
            .collect()
    }

    // ── Pre-authorisation ─────────────────────────────────────────────────────

    /// Totals over records whose pre-authorisation was denied.
    pub fn pre_auth_kpis<R: Borrow<ClaimRecord>>(records: &[R]) -> PreAuthKpi {
        let mut stats = AmountStats::default();
        for record in records.iter().map(as_record) {
            if record.text_equals(fields::PRE_AUTHORIZATION, PRE_AUTH_DENIED) {
                stats.add(record.amount(fields::DENIED_AMOUNT));
            }
        }

        PreAuthKpi {
            total_denied_amount: stats.total,
            denied_claims_count: stats.count,
            avg_denied_amount: stats.average(),
        }
    }

    /// Denied claims split by whether pre-authorisation was approved.
    pub fn pre_auth_denial_comparison<R: Borrow<ClaimRecord>>(
        records: &[R],
    ) -> Vec<PreAuthDenialComparison> {
        let mut with_auth = AmountStats::default();
        let mut without_auth = AmountStats::default();

        for record in records.iter().map(as_record) {
            let denied = record.amount(fields::DENIED_AMOUNT);
            if denied <= 0.0 {
                continue;
            }
            if record.text_equals(fields::PRE_AUTHORIZATION, PRE_AUTH_APPROVED) {
                with_auth.add(denied);
            } else {
                without_auth.add(denied);
            }
        }

        [(WITH_PRE_AUTH, with_auth), (WITHOUT_PRE_AUTH, without_auth)]
            .into_iter()
            .map(|(category, stats)| PreAuthDenialComparison {
                category: category.to_string(),
                denied_amount: stats.total,
                claim_count: stats.count,
            })
            .collect()
    }

    // ── Departments & procedures ──────────────────────────────────────────────

    /// Paid and denied totals per department.
    pub fn dept_paid_denied<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<DeptPaidDeniedEntry> {
        let mut by_dept: Grouped<String, PaidDenied> = Grouped::new();
        for record in records.iter().map(as_record) {
            let totals = by_dept.entry(record.category_or_unknown(fields::DEPT).into_owned());
            totals.paid += record.amount(fields::PAID_AMOUNT);
            totals.denied += record.amount(fields::DENIED_AMOUNT);
        }

        by_dept
            .into_vec()
            .into_iter()
            .map(|(dept, totals)| DeptPaidDeniedEntry {
                dept,
                total_paid: totals.paid,
                total_denied: totals.denied,
            })
            .collect()
    }

    /// Average claimed amount per CPT code, highest first, top
    /// [`CPT_TOP_N`] only.
    pub fn avg_claim_by_cpt<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<CptAverageEntry> {
        let mut by_code: Grouped<String, AmountStats> = Grouped::new();
        for record in records.iter().map(as_record) {
            if let Some(code) = record.category(fields::CPT_CODE) {
                by_code
                    .entry(code.into_owned())
                    .add(record.amount(fields::CLAIM_AMOUNT));
            }
        }

        let mut rows: Vec<CptAverageEntry> = by_code
            .into_vec()
            .into_iter()
            .map(|(cpt_code, stats)| CptAverageEntry {
                cpt_code,
                total_amount: stats.total,
                count: stats.count,
                avg_amount: stats.average(),
            })
            .collect();
        rows.sort_by(|a, b| b.avg_amount.total_cmp(&a.avg_amount));
        rows.truncate(CPT_TOP_N);
        rows
    }

    // ── Time histograms ───────────────────────────────────────────────────────

    /// Records with known reimbursement days, bucketed.
    pub fn reimbursement_time_distribution<R: Borrow<ClaimRecord>>(
        records: &[R],
    ) -> Vec<ReimbursementBucket> {
        let counts = bucket_counts(
            records
                .iter()
                .filter_map(|r| as_record(r).reimbursement_days()),
            REIMBURSEMENT_BUCKETS,
        );

        REIMBURSEMENT_BUCKETS
            .iter()
            .zip(counts)
            .map(|((label, _), count)| ReimbursementBucket {
                range_label: label.to_string(),
                count,
            })
            .collect()
    }

    /// Pending claims with known reimbursement days, bucketed by age.
    pub fn pending_claims_aging<R: Borrow<ClaimRecord>>(records: &[R]) -> Vec<PendingAgingBucket> {
        let counts = bucket_counts(
            records
                .iter()
                .map(as_record)
                .filter(|r| r.text_equals(fields::CLAIM_STATUS, STATUS_PENDING))
                .filter_map(ClaimRecord::reimbursement_days),
            PENDING_AGING_BUCKETS,
        );

        PENDING_AGING_BUCKETS
            .iter()
            .zip(counts)
            .map(|((label, _), value)| PendingAgingBucket {
                label: label.to_string(),
                value,
            })
            .collect()
    }

    // ── Trends ────────────────────────────────────────────────────────────────

    /// Claimed amount and count per month and per day, oldest first.
    ///
    /// Each record's date field is located independently. Records with no
    /// date field or an unparseable value are left out of both trends only.
    /// When nothing is dated the trends are simply empty.
    pub fn claims_trend<R: Borrow<ClaimRecord>>(&self, records: &[R]) -> ClaimsTrend {
        // BTreeMap keys keep chronological order.
        let mut monthly: BTreeMap<(i32, u32), AmountStats> = BTreeMap::new();
        let mut daily: BTreeMap<NaiveDate, AmountStats> = BTreeMap::new();
        let mut undated = 0usize;

        for record in records.iter().map(as_record) {
            let Some(date) = self.record_date(record) else {
                undated += 1;
                continue;
            };
            let amount = record.amount(fields::CLAIM_AMOUNT);
            monthly
                .entry((date.year(), date.month()))
                .or_default()
                .add(amount);
            daily.entry(date).or_default().add(amount);
        }

        let dated = records.len() - undated;
        if dated == 0 && !records.is_empty() {
            warn!(
                "None of {} records carries a usable date; trend views are empty",
                records.len()
            );
        } else if undated > 0 {
            debug!("{} records skipped from trends (no usable date)", undated);
        }

        ClaimsTrend {
            monthly: monthly
                .into_iter()
                .filter_map(|((year, month), stats)| {
                    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                    Some(trend_point(
                        first.format("%Y-%m").to_string(),
                        first.format("%b %Y").to_string(),
                        stats,
                    ))
                })
                .collect(),
            daily: daily
                .into_iter()
                .map(|(date, stats)| {
                    trend_point(
                        date.format("%Y-%m-%d").to_string(),
                        date.format("%b %-d, %Y").to_string(),
                        stats,
                    )
                })
                .collect(),
            dated_records: dated,
            undated_records: undated,
        }
    }

    /// Reporting-day date of `record`, if it has a usable one.
    pub fn record_date(&self, record: &ClaimRecord) -> Option<NaiveDate> {
        let value = self.options.date_fields.date_value(record)?;
        self.options.timezone.parse_date(value)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn as_record<R: Borrow<ClaimRecord>>(record: &R) -> &ClaimRecord {
    record.borrow()
}

/// Records carrying a denial: positive denied amount and a reason code.
fn denials<R: Borrow<ClaimRecord>>(records: &[R]) -> impl Iterator<Item = (&ClaimRecord, String)> {
    records.iter().map(as_record).filter_map(|record| {
        if record.amount(fields::DENIED_AMOUNT) <= 0.0 {
            return None;
        }
        let reason = record.category(fields::REASON_CODE)?;
        Some((record, reason.into_owned()))
    })
}

/// Count `values` into buckets with inclusive upper bounds; `None` is the
/// open-ended last bucket.
fn bucket_counts(
    values: impl Iterator<Item = f64>,
    buckets: &[(&str, Option<f64>)],
) -> Vec<u64> {
    let mut counts = vec![0u64; buckets.len()];
    for value in values {
        let slot = buckets
            .iter()
            .position(|(_, upper)| upper.map_or(true, |limit| value <= limit))
            .unwrap_or(buckets.len() - 1);
        counts[slot] += 1;
    }
    counts
}

fn trend_point(period_key: String, period_label: String, stats: AmountStats) -> TrendPoint {
    TrendPoint {
        period_key,
        period_label,
        total_amount: stats.total,
        claim_count: stats.count,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> ClaimRecord {
        serde_json::from_value(value).unwrap()
    }

    fn records(values: Vec<Value>) -> Vec<ClaimRecord> {
        values.into_iter().map(record).collect()
    }

    fn aggregate(records: &[ClaimRecord]) -> DashboardReport {
        ClaimsAggregator::default().aggregate(records)
    }

    fn sample() -> Vec<ClaimRecord> {
        records(vec![
            json!({"ClaimID": "C1", "Payer": "Acme", "Dept": "Cardiology", "ClaimAmount": 1000,
                   "PaidAmount": 800, "DeniedAmount": 200, "ReasonCode": "CO-45",
                   "ClaimStatus": "Paid", "ReimbursementDays": 12, "PreAuthorization": "Approved",
                   "CPTCode": "99213", "ServiceDate": "2024-01-15"}),
            json!({"ClaimID": "C2", "Payer": "Acme", "Dept": "Radiology", "ClaimAmount": 500,
                   "PaidAmount": 0, "DeniedAmount": 500, "ReasonCode": "CO-50",
                   "ClaimStatus": "Rejected", "ReimbursementDays": 40, "PreAuthorization": "Denied",
                   "CPTCode": "70450", "ServiceDate": "2024-01-20"}),
            json!({"ClaimID": "C3", "Payer": "Globex", "Dept": "Cardiology", "ClaimAmount": 300,
                   "PaidAmount": 0, "DeniedAmount": 0, "ClaimStatus": "Pending",
                   "ReimbursementDays": 65, "CPTCode": 99213, "ServiceDate": "2024-02-03"}),
            json!({"ClaimID": "C4", "Payer": null, "ClaimAmount": 200, "PaidAmount": 150,
                   "DeniedAmount": 50, "ReasonCode": "CO-45", "ReimbursementDays": null,
                   "ClaimDate": "2023-12-31"}),
        ])
    }

    // ── Scenario A: empty input ───────────────────────────────────────────────

    #[test]
    fn test_empty_input_degrades_to_zero_forms() {
        let report = aggregate(&[]);

        assert_eq!(report.funnel.len(), 3);
        assert!(report.funnel.iter().all(|s| s.value == 0.0));
        assert!(report.claim_status.is_empty());
        assert_eq!(report.pre_auth_kpis, PreAuthKpi::default());
        assert!(report.denial_pareto.is_empty());
        assert!(report.payer_scorecard.is_empty());
        assert!(report.monthly_trend.is_empty());
        assert!(report.daily_trend.is_empty());
        assert!(report.avg_claim_by_cpt.is_empty());

        assert_eq!(report.reimbursement_time.len(), 6);
        assert!(report.reimbursement_time.iter().all(|b| b.count == 0));
        assert_eq!(report.pending_aging.len(), 5);
        assert!(report.pending_aging.iter().all(|b| b.value == 0));
        assert_eq!(report.pre_auth_denials.len(), 2);
        assert!(report.pre_auth_denials.iter().all(|c| c.claim_count == 0));
    }

    // ── Scenario B: single record ─────────────────────────────────────────────

    #[test]
    fn test_single_record() {
        let input = records(vec![json!({
            "ClaimAmount": 100, "PaidAmount": 80, "DeniedAmount": 20,
            "ClaimStatus": "Paid", "Payer": "Acme", "ReimbursementDays": 10
        })]);
        let report = aggregate(&input);

        assert_eq!(report.funnel[0].name, STAGE_SUBMITTED);
        assert_eq!(report.funnel[0].value, 100.0);
        assert_eq!(report.funnel[2].name, STAGE_PAID);
        assert_eq!(report.funnel[2].value, 80.0);

        assert_eq!(
            report.claim_status,
            vec![ClaimStatusEntry {
                status: "Paid".to_string(),
                count: 1,
                percentage: 100.0
            }]
        );

        let acme = &report.payer_scorecard[0];
        assert_eq!(acme.payer.as_deref(), Some("Acme"));
        assert_eq!(acme.total_claimed, 100.0);
        assert_eq!(acme.avg_reimbursement_days, 10.0);
        assert_eq!(acme.denial_rate_percent, 0.0);
        assert_eq!(acme.paid_to_claimed_ratio_percent, 80.0);
    }

    // ── Scenario C: Pareto ordering ───────────────────────────────────────────

    #[test]
    fn test_denial_pareto_sorted_with_cumulative() {
        let input = records(vec![
            json!({"ReasonCode": "CO-45", "DeniedAmount": 50}),
            json!({"ReasonCode": "CO-50", "DeniedAmount": 150}),
        ]);
        let pareto = ClaimsAggregator::denial_pareto(&input);

        assert_eq!(
            pareto,
            vec![
                DenialParetoEntry {
                    reason_code: "CO-50".to_string(),
                    denied_amount: 150.0,
                    percentage: 75.0,
                    cumulative_percentage: 75.0,
                },
                DenialParetoEntry {
                    reason_code: "CO-45".to_string(),
                    denied_amount: 50.0,
                    percentage: 25.0,
                    cumulative_percentage: 100.0,
                },
            ]
        );
    }

    #[test]
    fn test_denial_pareto_last_cumulative_is_100() {
        let input = records(vec![
            json!({"ReasonCode": "A", "DeniedAmount": 1}),
            json!({"ReasonCode": "B", "DeniedAmount": 1}),
            json!({"ReasonCode": "C", "DeniedAmount": 1}),
        ]);
        let pareto = ClaimsAggregator::denial_pareto(&input);
        assert_eq!(pareto.last().unwrap().cumulative_percentage, 100.0);
        assert_eq!(pareto[0].percentage, 33.3);
    }

    #[test]
    fn test_denial_pareto_ignores_unqualified_records() {
        let input = records(vec![
            json!({"ReasonCode": "CO-45", "DeniedAmount": 0}),
            json!({"ReasonCode": "", "DeniedAmount": 10}),
            json!({"DeniedAmount": 10}),
        ]);
        assert!(ClaimsAggregator::denial_pareto(&input).is_empty());
    }

    #[test]
    fn test_denial_pareto_sums_match_denials() {
        let input = sample();
        let pareto_total: f64 = ClaimsAggregator::denial_pareto(&input)
            .iter()
            .map(|e| e.denied_amount)
            .sum();
        // C1 (200) + C2 (500) + C4 (50); C3 has no denial.
        assert_eq!(pareto_total, 750.0);
    }

    // ── Scenario D: bucket schemes differ ─────────────────────────────────────

    #[test]
    fn test_pending_95_days_lands_in_different_buckets() {
        let input = records(vec![json!({"ReimbursementDays": 95, "ClaimStatus": "Pending"})]);
        let report = aggregate(&input);

        let aging: Vec<(&str, u64)> = report
            .pending_aging
            .iter()
            .map(|b| (b.label.as_str(), b.value))
            .collect();
        assert_eq!(
            aging,
            vec![
                ("0-30 days", 0),
                ("31-60 days", 0),
                ("61-90 days", 0),
                ("91-120 days", 1),
                ("120+ days", 0),
            ]
        );

        let over_90 = report
            .reimbursement_time
            .iter()
            .find(|b| b.range_label == "90+ days")
            .unwrap();
        assert_eq!(over_90.count, 1);
    }

    #[test]
    fn test_reimbursement_bucket_boundaries_are_inclusive() {
        let input = records(
            [0, 15, 16, 30, 31, 45, 46, 60, 61, 90, 91]
                .iter()
                .map(|d| json!({"ReimbursementDays": d}))
                .collect(),
        );
        let counts: Vec<u64> = ClaimsAggregator::reimbursement_time_distribution(&input)
            .iter()
            .map(|b| b.count)
            .collect();
        assert_eq!(counts, vec![2, 2, 2, 2, 2, 1]);
    }

    #[test]
    fn test_pending_aging_only_counts_pending_with_days() {
        let input = records(vec![
            json!({"ClaimStatus": "Pending", "ReimbursementDays": 10}),
            json!({"ClaimStatus": "Pending"}),
            json!({"ClaimStatus": "Paid", "ReimbursementDays": 10}),
            json!({"ClaimStatus": "Pending", "ReimbursementDays": 121}),
        ]);
        let values: Vec<u64> = ClaimsAggregator::pending_claims_aging(&input)
            .iter()
            .map(|b| b.value)
            .collect();
        assert_eq!(values, vec![1, 0, 0, 0, 1]);
    }

    // ── Scenario E: unparseable dates ─────────────────────────────────────────

    #[test]
    fn test_unparseable_date_only_skips_trends() {
        let input = records(vec![
            json!({"ClaimAmount": 100, "PaidAmount": 100, "ClaimStatus": "Paid", "Payer": "Acme",
                   "ServiceDate": "not a date"}),
            json!({"ClaimAmount": 50, "ClaimStatus": "Paid", "Payer": "Acme",
                   "ServiceDate": "2024-05-02"}),
        ]);
        let report = aggregate(&input);

        assert_eq!(report.funnel[0].value, 150.0);
        assert_eq!(report.claim_status[0].count, 2);
        assert_eq!(report.payer_scorecard[0].total_claims, 2);

        assert_eq!(report.daily_trend.len(), 1);
        assert_eq!(report.daily_trend[0].claim_count, 1);
        assert_eq!(report.daily_trend[0].total_amount, 50.0);
        assert_eq!(report.monthly_trend[0].claim_count, 1);
    }

    // ── Funnel ────────────────────────────────────────────────────────────────

    #[test]
    fn test_funnel_paid_matches_input() {
        let input = sample();
        let report = aggregate(&input);
        let paid: f64 = input.iter().map(|r| r.amount(fields::PAID_AMOUNT)).sum();
        assert_eq!(report.funnel[2].value, paid);
        // Processed equals paid plus denied.
        assert_eq!(report.funnel[1].value, 950.0 + 750.0);
        assert_eq!(report.funnel_totals.total_pending, 2000.0 - 950.0 - 750.0);
    }

    #[test]
    fn test_funnel_negative_pending_is_surfaced() {
        let input = records(vec![json!({"ClaimAmount": 100, "PaidAmount": 90, "DeniedAmount": 30})]);
        let totals = ClaimsAggregator::funnel_totals(&input);
        assert_eq!(totals.total_pending, -20.0);
        let funnel = ClaimsAggregator::revenue_funnel(&totals);
        assert_eq!(funnel[1].value, 120.0);
    }

    // ── Payer scorecard ───────────────────────────────────────────────────────

    #[test]
    fn test_payer_scorecard_groups_missing_payer() {
        let report = aggregate(&sample());
        let payers: Vec<Option<&str>> = report
            .payer_scorecard
            .iter()
            .map(|p| p.payer.as_deref())
            .collect();
        assert_eq!(payers, vec![Some("Acme"), Some("Globex"), None]);

        let acme = &report.payer_scorecard[0];
        assert_eq!(acme.total_claims, 2);
        assert_eq!(acme.denied_claims, 1);
        assert_eq!(acme.denial_rate_percent, 50.0);
        assert_eq!(acme.avg_reimbursement_days, 26.0);
        assert_eq!(acme.paid_to_claimed_ratio_percent, 53.3);

        // Missing days count as zero in the average.
        let unknown = &report.payer_scorecard[2];
        assert_eq!(unknown.avg_reimbursement_days, 0.0);
    }

    #[test]
    fn test_payer_scorecard_zero_claimed_is_not_nan() {
        let input = records(vec![json!({"Payer": "Zero", "PaidAmount": 10})]);
        let scorecard = ClaimsAggregator::payer_scorecard(&input);
        assert_eq!(scorecard[0].paid_to_claimed_ratio_percent, 0.0);
        assert!(!scorecard[0].avg_reimbursement_days.is_nan());
    }

    #[test]
    fn test_claims_by_payer_sorted_with_unknown() {
        let rows = ClaimsAggregator::claims_by_payer(&sample());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex", "Unknown"]);
        assert_eq!(rows[0].total_amount, 1500.0);
        assert_eq!(rows[0].count, 2);
    }

    // ── Status ────────────────────────────────────────────────────────────────

    #[test]
    fn test_status_distribution_defaults_unknown() {
        let report = aggregate(&sample());
        let statuses: Vec<(&str, u64, f64)> = report
            .claim_status
            .iter()
            .map(|s| (s.status.as_str(), s.count, s.percentage))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("Paid", 1, 25.0),
                ("Rejected", 1, 25.0),
                ("Pending", 1, 25.0),
                ("Unknown", 1, 25.0),
            ]
        );
        let sum: f64 = report.claim_status.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 0.1 * report.claim_status.len() as f64);
    }

    #[test]
    fn test_claim_amount_by_status_averages() {
        let input = records(vec![
            json!({"ClaimStatus": "Paid", "ClaimAmount": 100}),
            json!({"ClaimStatus": "Paid", "ClaimAmount": 300}),
            json!({"ClaimAmount": 50}),
        ]);
        let rows = ClaimsAggregator::claim_amount_by_status(&input);
        assert_eq!(rows[0].status, "Paid");
        assert_eq!(rows[0].total_amount, 400.0);
        assert_eq!(rows[0].avg_amount, 200.0);
        assert_eq!(rows[1].status, "Unknown");
        assert_eq!(rows[1].count, 1);
    }

    // ── Pre-auth ──────────────────────────────────────────────────────────────

    #[test]
    fn test_pre_auth_kpis() {
        let input = records(vec![
            json!({"PreAuthorization": "Denied", "DeniedAmount": 300}),
            json!({"PreAuthorization": "Denied", "DeniedAmount": 100}),
            json!({"PreAuthorization": "Approved", "DeniedAmount": 999}),
        ]);
        let kpi = ClaimsAggregator::pre_auth_kpis(&input);
        assert_eq!(kpi.total_denied_amount, 400.0);
        assert_eq!(kpi.denied_claims_count, 2);
        assert_eq!(kpi.avg_denied_amount, 200.0);
    }

    #[test]
    fn test_pre_auth_denial_comparison() {
        let rows = ClaimsAggregator::pre_auth_denial_comparison(&sample());
        assert_eq!(rows[0].category, WITH_PRE_AUTH);
        assert_eq!(rows[0].denied_amount, 200.0);
        assert_eq!(rows[0].claim_count, 1);
        // "Denied" and missing pre-auth both count as without.
        assert_eq!(rows[1].category, WITHOUT_PRE_AUTH);
        assert_eq!(rows[1].denied_amount, 550.0);
        assert_eq!(rows[1].claim_count, 2);
    }

    // ── Departments & CPT ─────────────────────────────────────────────────────

    #[test]
    fn test_dept_paid_denied() {
        let rows = ClaimsAggregator::dept_paid_denied(&sample());
        let depts: Vec<(&str, f64, f64)> = rows
            .iter()
            .map(|r| (r.dept.as_str(), r.total_paid, r.total_denied))
            .collect();
        assert_eq!(
            depts,
            vec![
                ("Cardiology", 800.0, 200.0),
                ("Radiology", 0.0, 500.0),
                ("Unknown", 150.0, 50.0),
            ]
        );
    }

    #[test]
    fn test_avg_claim_by_cpt_merges_numeric_codes() {
        let rows = ClaimsAggregator::avg_claim_by_cpt(&sample());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cpt_code, "99213");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].avg_amount, 650.0);
        assert_eq!(rows[1].cpt_code, "70450");
    }

    #[test]
    fn test_avg_claim_by_cpt_merges_float_and_string_codes() {
        let input = records(vec![
            json!({"CPTCode": 99213.0, "ClaimAmount": 100}),
            json!({"CPTCode": "99213", "ClaimAmount": 300}),
        ]);
        let rows = ClaimsAggregator::avg_claim_by_cpt(&input);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpt_code, "99213");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].avg_amount, 200.0);
    }

    #[test]
    fn test_avg_claim_by_cpt_keeps_top_ten() {
        let input = records(
            (1..=12)
                .map(|i| json!({"CPTCode": format!("C{i:02}"), "ClaimAmount": i * 10}))
                .collect(),
        );
        let rows = ClaimsAggregator::avg_claim_by_cpt(&input);
        assert_eq!(rows.len(), CPT_TOP_N);
        assert_eq!(rows[0].cpt_code, "C12");
        assert_eq!(rows[9].cpt_code, "C03");
    }

    // ── Denial reasons ────────────────────────────────────────────────────────

    #[test]
    fn test_denial_reasons_sort_keys() {
        let input = records(vec![
            json!({"ReasonCode": "CO-45", "DeniedAmount": 10}),
            json!({"ReasonCode": "CO-45", "DeniedAmount": 10}),
            json!({"ReasonCode": "CO-97", "DeniedAmount": 500}),
        ]);

        let by_count = ClaimsAggregator::denial_reasons(&input, DenialSort::Count);
        assert_eq!(by_count[0].reason, "CO-45");
        assert_eq!(by_count[0].count, 2);
        assert_eq!(by_count[0].amount, 20.0);

        let by_amount = ClaimsAggregator::denial_reasons(&input, DenialSort::Amount);
        assert_eq!(by_amount[0].reason, "CO-97");
    }

    // ── Trends ────────────────────────────────────────────────────────────────

    #[test]
    fn test_trends_sorted_chronologically_across_field_names() {
        let report = aggregate(&sample());

        let months: Vec<(&str, &str, u64)> = report
            .monthly_trend
            .iter()
            .map(|p| (p.period_key.as_str(), p.period_label.as_str(), p.claim_count))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2023-12", "Dec 2023", 1),
                ("2024-01", "Jan 2024", 2),
                ("2024-02", "Feb 2024", 1),
            ]
        );
        assert_eq!(report.monthly_trend[1].total_amount, 1500.0);

        let days: Vec<&str> = report
            .daily_trend
            .iter()
            .map(|p| p.period_label.as_str())
            .collect();
        assert_eq!(
            days,
            vec!["Dec 31, 2023", "Jan 15, 2024", "Jan 20, 2024", "Feb 3, 2024"]
        );
    }

    #[test]
    fn test_trends_empty_without_dates() {
        let input = records(vec![json!({"ClaimAmount": 100}), json!({"ClaimAmount": 200})]);
        let trend = ClaimsAggregator::default().claims_trend(&input);
        assert!(trend.monthly.is_empty());
        assert!(trend.daily.is_empty());
        assert_eq!(trend.dated_records, 0);
        assert_eq!(trend.undated_records, 2);
    }

    #[test]
    fn test_trends_respect_reporting_timezone() {
        let input = records(vec![json!({"ClaimAmount": 10, "ServiceDate": "2024-03-01T02:00:00Z"})]);
        let aggregator = ClaimsAggregator::new(AggregationOptions {
            timezone: TimezoneHandler::new("America/New_York"),
            ..Default::default()
        });
        let trend = aggregator.claims_trend(&input);
        assert_eq!(trend.daily[0].period_key, "2024-02-29");
        assert_eq!(trend.monthly[0].period_key, "2024-02");
    }

    #[test]
    fn test_trends_use_custom_date_fields() {
        let input = records(vec![json!({"ServiceDate": "2024-01-01", "PostedOn": "2024-06-30"})]);
        let aggregator = ClaimsAggregator::new(AggregationOptions {
            date_fields: DateFieldDetector::with_candidates(["PostedOn"]),
            ..Default::default()
        });
        assert_eq!(aggregator.claims_trend(&input).daily[0].period_key, "2024-06-30");
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_is_idempotent() {
        let input = sample();
        let first = serde_json::to_string(&aggregate(&input)).unwrap();
        let second = serde_json::to_string(&aggregate(&input)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_accepts_borrowed_subsets() {
        let input = sample();
        let subset: Vec<&ClaimRecord> = input.iter().take(2).collect();
        let report = ClaimsAggregator::default().aggregate(&subset);
        assert_eq!(report.funnel[0].value, 1500.0);
    }

    #[test]
    fn test_aggregate_does_not_mutate_input() {
        let input = sample();
        let before = input.clone();
        let _ = aggregate(&input);
        assert_eq!(input, before);
    }
}
