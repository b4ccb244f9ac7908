//! Importance-ranked view of the point-feature vector.
//!
//! Importances come from the trained regressor (gain-based) and describe the model as a
//! whole, not the individual prediction. Nothing here feeds back into inference.

use serde::Serialize;

use crate::features::schema::{PointFeature, PointFeatures};
use crate::models::GradientBoostedRegressor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub feature: &'static str,
    pub label: &'static str,
    pub actual_value: f64,
    /// Share of total gain, in percent, one decimal.
    pub importance_pct: f64,
}

/// Rows sorted by importance (descending, ties in schema order). Empty without a regressor.
pub fn explain(regressor: Option<&GradientBoostedRegressor>, features: &PointFeatures) -> Vec<FeatureContribution> {
    let Some(regressor) = regressor else {
        return Vec::new();
    };
    let importances = regressor.feature_importances();

    let mut rows: Vec<FeatureContribution> = PointFeature::ALL
        .into_iter()
        .map(|f| FeatureContribution {
            feature: f.name(),
            label: f.label(),
            actual_value: features.get(f),
            importance_pct: (importances[f.index()] * 1000.0).round() / 10.0,
        })
        .collect();
    // Stable sort keeps schema order among equal importances.
    rows.sort_by(|a, b| b.importance_pct.total_cmp(&a.importance_pct));
    rows
}
