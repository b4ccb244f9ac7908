//! Regional statistics from the reference catalogue.
//!
//! The lookup window is a `±2°` latitude/longitude box around the query (inclusive).
//! This is a reporting aid, so it never fails: an unreadable catalogue or an empty
//! window yields fixed baseline values with a note saying why.

use std::path::Path;

use crate::domain::{HistoricalSummary, SeismicEvent};
use crate::error::AppError;
use crate::io::dataset::load_dataset;

pub const BASELINE_AVG_MAGNITUDE: f64 = 3.2;
pub const BASELINE_MAX_MAGNITUDE: f64 = 5.1;
pub const BASELINE_AVG_DEPTH_KM: f64 = 18.0;

/// Half-width of the lookup box in degrees.
pub const WINDOW_DEGREES: f64 = 2.0;

/// Baseline values with an explanatory note.
pub fn baseline_summary(note: impl Into<String>) -> HistoricalSummary {
    HistoricalSummary {
        avg_magnitude: BASELINE_AVG_MAGNITUDE,
        max_magnitude: BASELINE_MAX_MAGNITUDE,
        avg_depth: BASELINE_AVG_DEPTH_KM,
        total_events: 0,
        note: note.into(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoricalReference {
    events: Vec<SeismicEvent>,
}

impl HistoricalReference {
    pub fn new(events: Vec<SeismicEvent>) -> Self {
        Self { events }
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let data = load_dataset(path)?;
        log::debug!(
            "historical reference: {} events from {}",
            data.rows_used(),
            path.display()
        );
        Ok(Self::new(data.events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summarize(&self, latitude: f64, longitude: f64) -> HistoricalSummary {
        let nearby: Vec<&SeismicEvent> = self
            .events
            .iter()
            .filter(|e| {
                (e.latitude - latitude).abs() <= WINDOW_DEGREES
                    && (e.longitude - longitude).abs() <= WINDOW_DEGREES
            })
            .collect();

        if nearby.is_empty() {
            return baseline_summary(format!(
                "No recorded events within ±{WINDOW_DEGREES}° of ({latitude:.2}, {longitude:.2}); showing regional baseline."
            ));
        }

        let n = nearby.len();
        let avg_magnitude = nearby.iter().map(|e| e.magnitude).sum::<f64>() / n as f64;
        let max_magnitude = nearby
            .iter()
            .map(|e| e.magnitude)
            .fold(f64::NEG_INFINITY, f64::max);

        // Rows without a depth count toward everything except the depth average.
        let depths: Vec<f64> = nearby
            .iter()
            .filter_map(|e| e.depth_km)
            .filter(|d| d.is_finite())
            .collect();
        let avg_depth = if depths.is_empty() {
            BASELINE_AVG_DEPTH_KM
        } else {
            round_to(depths.iter().sum::<f64>() / depths.len() as f64, 1)
        };

        HistoricalSummary {
            avg_magnitude: round_to(avg_magnitude, 2),
            max_magnitude: round_to(max_magnitude, 2),
            avg_depth,
            total_events: n,
            note: format!(
                "Based on {n} recorded events within ±{WINDOW_DEGREES}° of ({latitude:.2}, {longitude:.2})."
            ),
        }
    }
}

/// Summary for a point, reading the catalogue at `dataset`.
pub fn get_historical_averages(latitude: f64, longitude: f64, dataset: &Path) -> HistoricalSummary {
    match HistoricalReference::load(dataset) {
        Ok(reference) => reference.summarize(latitude, longitude),
        Err(e) => {
            log::warn!("historical dataset unavailable, using baseline: {e}");
            baseline_summary(format!(
                "Historical data unavailable ({}); showing regional baseline.",
                e.message()
            ))
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(lat: f64, lon: f64, depth: Option<f64>, mag: f64) -> SeismicEvent {
        SeismicEvent {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            latitude: lat,
            longitude: lon,
            depth_km: depth,
            magnitude: mag,
            place: None,
        }
    }

    #[test]
    fn window_is_inclusive_two_degrees() {
        let reference = HistoricalReference::new(vec![
            event(30.0, 77.0, Some(10.0), 4.0), // exactly +2° lat
            event(28.0, 75.0, Some(20.0), 3.0), // exactly -2° lon
            event(30.5, 77.0, Some(99.0), 9.0), // outside
        ]);
        let summary = reference.summarize(28.0, 77.0);
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.avg_magnitude, 3.5);
        assert_eq!(summary.max_magnitude, 4.0);
        assert_eq!(summary.avg_depth, 15.0);
    }

    #[test]
    fn missing_depth_only_affects_depth_average() {
        let reference = HistoricalReference::new(vec![
            event(28.0, 77.0, None, 3.34),
            event(28.1, 77.1, Some(12.34), 4.0),
        ]);
        let summary = reference.summarize(28.6, 77.2);
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.avg_magnitude, 3.67);
        assert_eq!(summary.avg_depth, 12.3);
    }

    #[test]
    fn no_nearby_events_gives_baseline_with_note() {
        let reference = HistoricalReference::new(vec![event(10.0, 70.0, Some(5.0), 6.0)]);
        let summary = reference.summarize(28.6, 77.2);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.avg_magnitude, BASELINE_AVG_MAGNITUDE);
        assert_eq!(summary.max_magnitude, BASELINE_MAX_MAGNITUDE);
        assert_eq!(summary.avg_depth, BASELINE_AVG_DEPTH_KM);
        assert!(summary.note.contains("No recorded events"));
    }

    #[test]
    fn unreadable_dataset_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let summary = get_historical_averages(28.6, 77.2, &dir.path().join("missing.csv"));
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.avg_magnitude, BASELINE_AVG_MAGNITUDE);
        assert!(summary.note.contains("unavailable"));
    }

    #[test]
    fn reads_dataset_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        std::fs::write(
            &path,
            "time,latitude,longitude,depth_km,magnitude,place\n\
             2024-01-01T00:00:00Z,28.5,77.0,10,4.2,Delhi\n\
             2024-01-02T00:00:00Z,8.0,93.0,30,5.5,Nicobar\n",
        )
        .unwrap();
        let summary = get_historical_averages(28.6, 77.2, &path);
        assert_eq!(summary.total_events, 1);
        assert_eq!(summary.max_magnitude, 4.2);
    }
}
