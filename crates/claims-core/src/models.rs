use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::str::FromStr;

/// Field names of the financial claims feed.
pub mod fields {
    pub const CLAIM_ID: &str = "ClaimID";
    pub const PAYER: &str = "Payer";
    pub const DEPT: &str = "Dept";
    pub const CLAIM_AMOUNT: &str = "ClaimAmount";
    pub const PAID_AMOUNT: &str = "PaidAmount";
    pub const DENIED_AMOUNT: &str = "DeniedAmount";
    pub const REIMBURSEMENT_DAYS: &str = "ReimbursementDays";
    pub const CLAIM_STATUS: &str = "ClaimStatus";
    pub const REASON_CODE: &str = "ReasonCode";
    pub const PRE_AUTHORIZATION: &str = "PreAuthorization";
    pub const CPT_CODE: &str = "CPTCode";
}

/// Substituted for missing categorical values.
pub const UNKNOWN: &str = "Unknown";

// ── ClaimRecord ───────────────────────────────────────────────────────────────

/// One row of the financial dataset.
///
/// The row is kept as an ordered JSON object so that a missing field, an
/// explicit `null`, a zero and an empty string remain distinguishable. All
/// typed access goes through the accessors below, each of which documents the
/// default it substitutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimRecord(Map<String, Value>);

impl ClaimRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Raw field map, in source order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Raw value of `field`. `None` when the field is absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Monetary amount of `field`.
    ///
    /// JSON numbers are used as-is and numeric strings are parsed. Missing,
    /// `null`, non-numeric strings and any other JSON type count as `0.0`.
    pub fn amount(&self, field: &str) -> f64 {
        self.number(field).unwrap_or(0.0)
    }

    /// `ReimbursementDays`, or `None` when absent, `null` or non-numeric.
    pub fn reimbursement_days(&self) -> Option<f64> {
        self.number(fields::REIMBURSEMENT_DAYS)
    }

    /// Categorical text of `field`.
    ///
    /// Strings are returned as-is; numbers and booleans are rendered as text
    /// (CPT codes are frequently stored as integers). Missing, `null` and
    /// blank strings yield `None`.
    pub fn category(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(number_text(n))),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    /// Categorical text of `field`, defaulting to [`UNKNOWN`].
    pub fn category_or_unknown(&self, field: &str) -> Cow<'_, str> {
        self.category(field).unwrap_or(Cow::Borrowed(UNKNOWN))
    }

    /// `ClaimStatus`, defaulting to [`UNKNOWN`].
    pub fn status(&self) -> Cow<'_, str> {
        self.category_or_unknown(fields::CLAIM_STATUS)
    }

    /// `true` only when `field` holds exactly the string `expected`.
    pub fn text_equals(&self, field: &str, expected: &str) -> bool {
        matches!(self.0.get(field), Some(Value::String(s)) if s == expected)
    }

    fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// Integral floats lose their fraction so `99213.0` reads as `99213`.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

impl From<Map<String, Value>> for ClaimRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// ── Selectors ─────────────────────────────────────────────────────────────────

/// Sort key for the denial-reasons breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenialSort {
    /// Most frequent reason first.
    #[default]
    Count,
    /// Largest denied amount first.
    Amount,
}

impl FromStr for DenialSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "amount" => Ok(Self::Amount),
            other => Err(format!("unknown denial sort: {other}")),
        }
    }
}

/// Granularity of the claims trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGranularity {
    Monthly,
    #[default]
    Daily,
}

impl FromStr for TrendGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "daily" => Ok(Self::Daily),
            other => Err(format!("unknown trend granularity: {other}")),
        }
    }
}

// ── Aggregate views ───────────────────────────────────────────────────────────

/// One stage of the revenue-cycle funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub name: String,
    pub value: f64,
}

/// Dataset-wide money totals behind the funnel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelTotals {
    pub total_claimed: f64,
    pub total_paid: f64,
    pub total_denied: f64,
    /// `claimed - paid - denied`. Negative when the feed is inconsistent.
    pub total_pending: f64,
}

/// One reason code in the denial Pareto view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialParetoEntry {
    pub reason_code: String,
    pub denied_amount: f64,
    /// Share of the Pareto total, one decimal.
    pub percentage: f64,
    /// Running share in sorted order, one decimal.
    pub cumulative_percentage: f64,
}

/// Per-payer performance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerScorecardEntry {
    /// `None` groups every record that has no payer.
    pub payer: Option<String>,
    pub total_claimed: f64,
    pub total_paid: f64,
    pub total_denied: f64,
    pub total_claims: u64,
    pub total_reimbursement_days: f64,
    /// Records with `ClaimStatus == "Rejected"`.
    pub denied_claims: u64,
    pub avg_reimbursement_days: f64,
    pub denial_rate_percent: f64,
    pub paid_to_claimed_ratio_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusEntry {
    pub status: String,
    pub count: u64,
    pub percentage: f64,
}

/// Impact of denied pre-authorisations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAuthKpi {
    pub total_denied_amount: f64,
    pub denied_claims_count: u64,
    pub avg_denied_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimAmountByStatusEntry {
    pub status: String,
    pub total_amount: f64,
    pub count: u64,
    pub avg_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeptPaidDeniedEntry {
    pub dept: String,
    pub total_paid: f64,
    pub total_denied: f64,
}

/// One period of the claims trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Sortable key: `"2024-01"` (monthly) or `"2024-01-15"` (daily).
    pub period_key: String,
    /// Display label: `"Jan 2024"` (monthly) or `"Jan 15, 2024"` (daily).
    pub period_label: String,
    pub total_amount: f64,
    pub claim_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialReasonEntry {
    pub reason: String,
    pub count: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementBucket {
    pub range_label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerClaimsEntry {
    pub name: String,
    pub total_amount: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAuthDenialComparison {
    pub category: String,
    pub denied_amount: f64,
    pub claim_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CptAverageEntry {
    pub cpt_code: String,
    pub total_amount: f64,
    pub count: u64,
    pub avg_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAgingBucket {
    pub label: String,
    pub value: u64,
}

/// Every aggregate view the dashboard renders, computed from one record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub funnel: Vec<FunnelStage>,
    pub funnel_totals: FunnelTotals,
    pub denial_pareto: Vec<DenialParetoEntry>,
    pub payer_scorecard: Vec<PayerScorecardEntry>,
    pub claim_status: Vec<ClaimStatusEntry>,
    pub pre_auth_kpis: PreAuthKpi,
    pub claim_amount_by_status: Vec<ClaimAmountByStatusEntry>,
    pub dept_paid_denied: Vec<DeptPaidDeniedEntry>,
    pub monthly_trend: Vec<TrendPoint>,
    pub daily_trend: Vec<TrendPoint>,
    pub denial_reasons: Vec<DenialReasonEntry>,
    pub reimbursement_time: Vec<ReimbursementBucket>,
    pub claims_by_payer: Vec<PayerClaimsEntry>,
    pub pre_auth_denials: Vec<PreAuthDenialComparison>,
    pub avg_claim_by_cpt: Vec<CptAverageEntry>,
    pub pending_aging: Vec<PendingAgingBucket>,
}

impl DashboardReport {
    /// The trend series for `granularity`.
    pub fn trend(&self, granularity: TrendGranularity) -> &[TrendPoint] {
        match granularity {
            TrendGranularity::Monthly => &self.monthly_trend,
            TrendGranularity::Daily => &self.daily_trend,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
