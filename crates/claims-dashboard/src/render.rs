//! Text rendering of an analysis result as a series of terminal tables.

use std::fmt::Write;

use claims_core::formatting::{format_currency, format_days, format_number};
use claims_core::models::{fields, ClaimRecord, DashboardReport, TrendGranularity};
use claims_data::analysis::{AnalysisResult, StatusDrillDown};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

const NO_DATA: &str = "(no data)";

/// Render every dashboard view, showing the trend at `granularity`.
pub fn render_text(result: &AnalysisResult, granularity: TrendGranularity) -> String {
    let report = &result.report;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Claims analysed: {} of {} loaded",
        result.metadata.records_after_filter, result.metadata.records_loaded
    );
    let _ = writeln!(out, "Generated at: {}", result.metadata.generated_at);

    section(&mut out, "Revenue Funnel", funnel_table(report));
    section(&mut out, "Pre-Authorization Denials", pre_auth_table(report));
    section(&mut out, "Denial Pareto", denial_pareto_table(report));
    section(&mut out, "Payer Scorecard", payer_scorecard_table(report));
    section(&mut out, "Claim Status", claim_status_table(report));
    section(&mut out, "Claim Amount by Status", amount_by_status_table(report));
    section(&mut out, "Paid vs Denied by Department", dept_table(report));
    let trend_title = match granularity {
        TrendGranularity::Monthly => "Monthly Claims Trend",
        TrendGranularity::Daily => "Daily Claims Trend",
    };
    section(&mut out, trend_title, trend_table(report, granularity));
    section(&mut out, "Denial Reasons", denial_reasons_table(report));
    section(&mut out, "Reimbursement Time", reimbursement_table(report));
    section(&mut out, "Claims by Payer", claims_by_payer_table(report));
    section(&mut out, "Denials by Pre-Authorization", pre_auth_comparison_table(report));
    section(&mut out, "Average Claim by CPT Code (Top 10)", cpt_table(report));
    section(&mut out, "Pending Claims Aging", pending_aging_table(report));

    if let Some(drill_down) = &result.drill_down {
        let title = format!(
            "Claims with status {} ({})",
            drill_down.status,
            drill_down.claims.len()
        );
        section(&mut out, &title, drill_down_table(drill_down));
    }

    out
}

// ── Table style ────────────────────────────────────────────────────────────────

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    apply_table_style(&mut table);
    // Every column after the label holds a number.
    for index in 1..headers.len() {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn section(out: &mut String, title: &str, table: Table) {
    let _ = writeln!(out, "\n{title}");
    if table.row_iter().next().is_none() {
        let _ = writeln!(out, "{NO_DATA}");
    } else {
        let _ = writeln!(out, "{table}");
    }
}

fn percent(value: f64) -> String {
    format!("{}%", format_number(value, 1))
}

// ── Views ──────────────────────────────────────────────────────────────────────

fn funnel_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Stage", "Amount"]);
    for stage in &report.funnel {
        table.add_row(vec![stage.name.clone(), format_currency(stage.value)]);
    }
    if !report.funnel.is_empty() {
        let pending = report.funnel_totals.total_pending;
        let pending_cell = Cell::new(format_currency(pending));
        table.add_row(vec![
            Cell::new("Pending").fg(Color::DarkGrey),
            if pending < 0.0 {
                pending_cell.fg(Color::Red)
            } else {
                pending_cell.fg(Color::DarkGrey)
            },
        ]);
    }
    table
}

fn pre_auth_table(report: &DashboardReport) -> Table {
    let kpi = &report.pre_auth_kpis;
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![
        "Total denied amount".to_string(),
        format_currency(kpi.total_denied_amount),
    ]);
    table.add_row(vec![
        "Denied claims".to_string(),
        kpi.denied_claims_count.to_string(),
    ]);
    table.add_row(vec![
        "Average denied amount".to_string(),
        format_currency(kpi.avg_denied_amount),
    ]);
    table
}

fn denial_pareto_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Reason", "Denied", "Share", "Cumulative"]);
    for entry in &report.denial_pareto {
        table.add_row(vec![
            entry.reason_code.clone(),
            format_currency(entry.denied_amount),
            percent(entry.percentage),
            percent(entry.cumulative_percentage),
        ]);
    }
    table
}

fn payer_scorecard_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&[
        "Payer",
        "Claims",
        "Claimed",
        "Paid",
        "Denied",
        "Avg Days",
        "Denial Rate",
        "Paid/Claimed",
    ]);
    for entry in &report.payer_scorecard {
        table.add_row(vec![
            Cell::new(entry.payer.as_deref().unwrap_or("(none)")),
            Cell::new(entry.total_claims),
            Cell::new(format_currency(entry.total_claimed)),
            Cell::new(format_currency(entry.total_paid)),
            Cell::new(format_currency(entry.total_denied)),
            Cell::new(format_days(entry.avg_reimbursement_days)),
            Cell::new(percent(entry.denial_rate_percent)),
            Cell::new(percent(entry.paid_to_claimed_ratio_percent)),
        ]);
    }
    table
}

fn claim_status_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Status", "Claims", "Share"]);
    for entry in &report.claim_status {
        table.add_row(vec![
            entry.status.clone(),
            entry.count.to_string(),
            percent(entry.percentage),
        ]);
    }
    table
}

fn amount_by_status_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Status", "Claims", "Total", "Average"]);
    for entry in &report.claim_amount_by_status {
        table.add_row(vec![
            entry.status.clone(),
            entry.count.to_string(),
            format_currency(entry.total_amount),
            format_currency(entry.avg_amount),
        ]);
    }
    table
}

fn dept_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Department", "Paid", "Denied"]);
    for entry in &report.dept_paid_denied {
        table.add_row(vec![
            entry.dept.clone(),
            format_currency(entry.total_paid),
            format_currency(entry.total_denied),
        ]);
    }
    table
}

fn trend_table(report: &DashboardReport, granularity: TrendGranularity) -> Table {
    let mut table = new_table(&["Period", "Claims", "Claimed"]);
    for point in report.trend(granularity) {
        table.add_row(vec![
            point.period_label.clone(),
            point.claim_count.to_string(),
            format_currency(point.total_amount),
        ]);
    }
    table
}

fn denial_reasons_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Reason", "Claims", "Denied"]);
    for entry in &report.denial_reasons {
        table.add_row(vec![
            entry.reason.clone(),
            entry.count.to_string(),
            format_currency(entry.amount),
        ]);
    }
    table
}

fn reimbursement_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Days to Reimburse", "Claims"]);
    for bucket in &report.reimbursement_time {
        table.add_row(vec![bucket.range_label.clone(), bucket.count.to_string()]);
    }
    table
}

fn claims_by_payer_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Payer", "Claims", "Claimed"]);
    for entry in &report.claims_by_payer {
        table.add_row(vec![
            entry.name.clone(),
            entry.count.to_string(),
            format_currency(entry.total_amount),
        ]);
    }
    table
}

fn pre_auth_comparison_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Category", "Claims", "Denied"]);
    for entry in &report.pre_auth_denials {
        table.add_row(vec![
            entry.category.clone(),
            entry.claim_count.to_string(),
            format_currency(entry.denied_amount),
        ]);
    }
    table
}

fn cpt_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["CPT Code", "Claims", "Total", "Average"]);
    for entry in &report.avg_claim_by_cpt {
        table.add_row(vec![
            entry.cpt_code.clone(),
            entry.count.to_string(),
            format_currency(entry.total_amount),
            format_currency(entry.avg_amount),
        ]);
    }
    table
}

fn pending_aging_table(report: &DashboardReport) -> Table {
    let mut table = new_table(&["Age", "Pending Claims"]);
    for bucket in &report.pending_aging {
        table.add_row(vec![bucket.label.clone(), bucket.value.to_string()]);
    }
    table
}

fn drill_down_table(drill_down: &StatusDrillDown) -> Table {
    let mut table = new_table(&["Claim", "Payer", "Department", "Claimed", "Paid", "Denied"]);
    align_column(&mut table, 1, CellAlignment::Left);
    align_column(&mut table, 2, CellAlignment::Left);
    for claim in &drill_down.claims {
        table.add_row(drill_down_row(claim));
    }
    table
}

fn drill_down_row(claim: &ClaimRecord) -> Vec<String> {
    vec![
        claim.category_or_unknown(fields::CLAIM_ID).into_owned(),
        claim.category_or_unknown(fields::PAYER).into_owned(),
        claim.category_or_unknown(fields::DEPT).into_owned(),
        format_currency(claim.amount(fields::CLAIM_AMOUNT)),
        format_currency(claim.amount(fields::PAID_AMOUNT)),
        format_currency(claim.amount(fields::DENIED_AMOUNT)),
    ]
}
