//! Reporting: prediction reports, explanations, and historical comparisons.

pub mod explain;
pub mod format;
pub mod historical;

pub use explain::{FeatureContribution, explain};
pub use format::*;
pub use historical::{HistoricalReference, baseline_summary, get_historical_averages};

use serde::Serialize;

use crate::domain::{AlertLevel, PredictRequest, PredictionResult, ZoneId};
use crate::predict::alert::classify_alert;
use crate::predict::ladder::FusionBranch;

/// Prediction plus alert, as printed by the CLI or emitted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub predicted_magnitude: f64,
    pub confidence: f64,
    pub fusion_branch: String,
    pub seismic_zone: ZoneId,
    pub alert_level: AlertLevel,
    pub recommendation: String,
}

impl PredictionReport {
    pub fn new(request: &PredictRequest, result: &PredictionResult) -> Self {
        let alert_level = classify_alert(result.predicted_magnitude, result.seismic_zone);
        Self {
            latitude: request.latitude,
            longitude: request.longitude,
            depth_km: request.depth_km,
            predicted_magnitude: result.predicted_magnitude,
            confidence: result.confidence,
            fusion_branch: FusionBranch::from_confidence(result.confidence).as_str().to_string(),
            seismic_zone: result.seismic_zone,
            alert_level,
            recommendation: alert_level.recommendation().to_string(),
        }
    }
}
