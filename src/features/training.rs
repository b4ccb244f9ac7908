//! Training-set construction from batch feature rows.
//!
//! Model fitting happens outside this crate; these builders only lay out inputs and
//! targets so the exported training data matches what the predictor feeds at serving
//! time.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::ZoneId;
use crate::features::batch::FeatureRow;
use crate::features::schema::{
    POINT_FEATURE_COUNT, PointFeatures, SEQUENCE_LENGTH, SequenceWindow,
};

/// Sequence windows with the magnitude of the event that follows each window.
#[derive(Debug, Clone, Default)]
pub struct SequenceDataset {
    pub windows: Vec<SequenceWindow>,
    pub targets: Vec<f64>,
}

impl SequenceDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Aligned inputs for fitting the fusion head.
///
/// Entry `k` pairs the point features of row `i = k + SEQUENCE_LENGTH` with the window
/// of rows `[i - SEQUENCE_LENGTH, i)`; the target is row `i`'s magnitude.
#[derive(Debug, Clone, Default)]
pub struct FusionDataset {
    pub point_inputs: Vec<PointFeatures>,
    pub windows: Vec<SequenceWindow>,
    pub targets: Vec<f64>,
}

/// Sequence-model windows, built per zone (ascending zone id) in time order.
pub fn build_sequences(rows: &[FeatureRow]) -> SequenceDataset {
    let mut by_zone: BTreeMap<ZoneId, Vec<&FeatureRow>> = BTreeMap::new();
    for row in rows {
        by_zone.entry(row.zone()).or_default().push(row);
    }

    let mut out = SequenceDataset::default();
    for zone_rows in by_zone.values() {
        for idx in SEQUENCE_LENGTH..zone_rows.len() {
            let window = &zone_rows[idx - SEQUENCE_LENGTH..idx];
            out.windows
                .push(std::array::from_fn(|k| window[k].sequence_step()));
            out.targets.push(zone_rows[idx].magnitude());
        }
    }
    out
}

/// Fusion-head alignment over the whole corpus (not per zone).
pub fn fusion_alignment(rows: &[FeatureRow]) -> FusionDataset {
    let mut out = FusionDataset::default();
    for idx in SEQUENCE_LENGTH..rows.len() {
        let window = &rows[idx - SEQUENCE_LENGTH..idx];
        out.point_inputs.push(rows[idx].features);
        out.windows
            .push(std::array::from_fn(|k| window[k].sequence_step()));
        out.targets.push(rows[idx].magnitude());
    }
    out
}

/// Point-regressor design matrix (`n × 11`) and magnitude targets.
pub fn point_training_matrix(rows: &[FeatureRow]) -> (DMatrix<f64>, DVector<f64>) {
    let x = DMatrix::from_fn(rows.len(), POINT_FEATURE_COUNT, |r, c| {
        rows[r].features.as_array()[c]
    });
    let y = DVector::from_iterator(rows.len(), rows.iter().map(FeatureRow::magnitude));
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeismicEvent;
    use crate::features::batch::build_features;
    use chrono::{Duration, TimeZone, Utc};

    fn corpus(n_delhi: usize, n_mumbai: usize) -> Vec<SeismicEvent> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut out = Vec::new();
        for i in 0..n_delhi {
            out.push(SeismicEvent {
                time: t0 + Duration::hours(i as i64 * 13),
                latitude: 28.6,
                longitude: 77.2,
                depth_km: Some(10.0),
                magnitude: 3.0 + i as f64 * 0.01,
                place: Some("Delhi".to_string()),
            });
        }
        for i in 0..n_mumbai {
            out.push(SeismicEvent {
                time: t0 + Duration::hours(i as i64 * 7 + 1),
                latitude: 19.07,
                longitude: 72.87,
                depth_km: None,
                magnitude: 2.0 + i as f64 * 0.01,
                place: Some("Mumbai".to_string()),
            });
        }
        out
    }

    #[test]
    fn sequences_are_built_per_zone() {
        let rows = build_features(&corpus(12, 11));
        let ds = build_sequences(&rows);
        // zone 3: 11 rows -> 1 window; zone 4: 12 rows -> 2 windows
        assert_eq!(ds.len(), 3);
        assert!((ds.targets[0] - 2.10).abs() < 1e-9);
        for window in &ds.windows {
            let zones: Vec<f64> = window.iter().map(|s| s.as_array()[5]).collect();
            assert!(zones.iter().all(|z| *z == zones[0]));
        }
    }

    #[test]
    fn too_few_rows_give_no_sequences() {
        let rows = build_features(&corpus(10, 0));
        assert!(build_sequences(&rows).is_empty());
        assert!(fusion_alignment(&rows).targets.is_empty());
    }

    #[test]
    fn fusion_alignment_pairs_row_with_preceding_window() {
        let rows = build_features(&corpus(13, 0));
        let ds = fusion_alignment(&rows);
        assert_eq!(ds.targets.len(), 3);
        assert_eq!(ds.point_inputs[0], rows[10].features);
        assert_eq!(ds.windows[0][9], rows[9].sequence_step());
        assert_eq!(ds.targets[2], rows[12].magnitude());
    }

    #[test]
    fn design_matrix_matches_rows() {
        let rows = build_features(&corpus(3, 2));
        let (x, y) = point_training_matrix(&rows);
        assert_eq!(x.shape(), (5, POINT_FEATURE_COUNT));
        assert_eq!(y.len(), 5);
        assert_eq!(x[(4, 0)], rows[4].features.as_array()[0]);
        assert_eq!(y[4], rows[4].magnitude());
    }
}
