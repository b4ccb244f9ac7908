//! Formatted terminal output.
//!
//! Formatting lives here so inference code never builds strings and output changes stay
//! in one file.

use std::path::Path;

use crate::domain::{HistoricalSummary, ZoneId};
use crate::io::dataset::LoadedDataset;
use crate::predict::alert::thresholds_for;
use crate::report::PredictionReport;
use crate::report::explain::FeatureContribution;

pub fn format_prediction(report: &PredictionReport) -> String {
    let mut out = String::new();
    out.push_str("=== quake - magnitude prediction ===\n");
    out.push_str(&format!(
        "Location: ({:.4}, {:.4}) depth {:.1} km | zone {}\n",
        report.latitude, report.longitude, report.depth_km, report.seismic_zone
    ));
    out.push_str(&format!(
        "Predicted magnitude: {:.2}\n",
        report.predicted_magnitude
    ));
    out.push_str(&format!(
        "Confidence: {:.2} ({})\n",
        report.confidence, report.fusion_branch
    ));
    out.push_str(&format!("Alert: {}\n", report.alert_level));
    out.push_str(&format!("Recommendation: {}\n", report.recommendation));
    if report.confidence == 0.0 {
        out.push_str("(no model artifacts available; magnitude is a placeholder)\n");
    }
    out
}

pub fn format_explanation(rows: &[FeatureContribution]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("Feature importances unavailable (no point regressor loaded).\n");
        return out;
    }

    out.push_str(
        format!("{:<30} {:>12} {:>12}\n", "feature", "value", "importance").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<30} {:-<12} {:-<12}\n", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<30} {:>12.3} {:>11.1}%\n",
                truncate(r.label, 30),
                r.actual_value,
                r.importance_pct
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_historical(summary: &HistoricalSummary, predicted: Option<f64>) -> String {
    let mut out = String::new();
    out.push_str("Historical comparison:\n");
    out.push_str(&format!("- events in window : {}\n", summary.total_events));
    out.push_str(&format!("- avg magnitude    : {:.2}\n", summary.avg_magnitude));
    out.push_str(&format!("- max magnitude    : {:.2}\n", summary.max_magnitude));
    out.push_str(&format!("- avg depth        : {:.1} km\n", summary.avg_depth));
    if let Some(p) = predicted {
        let delta = p - summary.avg_magnitude;
        out.push_str(&format!("- predicted vs avg : {delta:+.2}\n"));
    }
    out.push_str(&format!("{}\n", summary.note));
    out
}

pub fn format_zone(latitude: f64, longitude: f64, zone: ZoneId) -> String {
    let (low_below, mid_below) = thresholds_for(zone);
    format!(
        "({latitude:.4}, {longitude:.4}) -> seismic zone {zone}\n\
         Alert thresholds: LOW < {low_below:.1} <= MID < {mid_below:.1} <= HIGH\n"
    )
}

/// Summary of a batch feature export.
pub fn format_feature_export(data: &LoadedDataset, rows_written: usize, output: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows read: {} | used: {} | skipped: {}\n",
        data.rows_read,
        data.rows_used(),
        data.row_errors.len()
    ));
    for e in data.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if data.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more\n", data.row_errors.len() - 5));
    }
    out.push_str(&format!(
        "Wrote {rows_written} feature rows to {}\n",
        output.display()
    ));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
