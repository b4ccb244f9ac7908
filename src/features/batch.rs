//! Batch-mode feature derivation over a historical catalogue.
//!
//! For each event `i` in the time-sorted history, features are derived only from events
//! at positions `< i`:
//!
//! - `prev_magnitude`, `days_since_last_quake`: latest prior event in the same zone
//! - `quake_count_7d`: prior events (any zone) in the trailing 7 days and within 100 km
//! - `quake_count_30d`, `avg_magnitude_30d`, `max_magnitude_30d`: prior events in the
//!   same zone in the trailing 30 days, no distance filter
//!
//! Windows are anchored on the current event's own time. This differs from the online
//! builder, which anchors on "now" and drops the distance filter; trained artifacts
//! depend on these exact semantics, so the two paths stay separate.
//!
//! Rows are independent once the history is sorted, so derivation runs in parallel.

use chrono::{DateTime, Datelike, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{SeismicEvent, ZoneId};
use crate::features::schema::{ContextFeatures, PointFeatures, SequenceStep};
use crate::features::zone::assign_zone;
use crate::math::{days_between, haversine_km, window_start};

/// Window sizes for batch derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Radius for the short-window proximity count.
    pub radius_km: f64,
    pub short_window_days: i64,
    pub long_window_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            radius_km: 100.0,
            short_window_days: 7,
            long_window_days: 30,
        }
    }
}

/// One derived training row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub event: SeismicEvent,
    pub context: ContextFeatures,
    pub features: PointFeatures,
}

impl FeatureRow {
    pub fn zone(&self) -> ZoneId {
        // Zone ids are small integers stored as f64 in the context.
        self.context.seismic_zone as ZoneId
    }

    /// Training target.
    pub fn magnitude(&self) -> f64 {
        self.event.magnitude
    }

    /// Sequence-model step for this row (batch semantics for the gap field).
    pub fn sequence_step(&self) -> SequenceStep {
        SequenceStep::new(
            self.event.latitude,
            self.event.longitude,
            self.event.depth_or_zero(),
            self.event.magnitude,
            self.context.days_since_last_quake,
            self.zone(),
        )
    }
}

/// Derive features for every event with the default windows.
pub fn build_features(history: &[SeismicEvent]) -> Vec<FeatureRow> {
    build_features_with(history, &WindowConfig::default())
}

/// Derive features for every event.
///
/// The history is sorted ascending by time first (stable, so simultaneous events keep
/// their input order). An empty history yields an empty output.
pub fn build_features_with(history: &[SeismicEvent], config: &WindowConfig) -> Vec<FeatureRow> {
    let sorted = SortedHistory::new(history);
    (0..sorted.len())
        .into_par_iter()
        .map(|i| {
            let event = &sorted.events[i];
            let context = sorted.context_at(i, config);
            let features = PointFeatures::new(
                event.latitude,
                event.longitude,
                event.depth_or_zero(),
                &context,
            );
            FeatureRow {
                event: event.clone(),
                context,
                features,
            }
        })
        .collect()
}

/// Time-sorted events with their zones resolved once.
struct SortedHistory {
    events: Vec<SeismicEvent>,
    zones: Vec<ZoneId>,
}

impl SortedHistory {
    fn new(history: &[SeismicEvent]) -> Self {
        let mut events = history.to_vec();
        events.sort_by_key(|e| e.time);
        let zones = events
            .iter()
            .map(|e| assign_zone(e.latitude, e.longitude))
            .collect();
        Self { events, zones }
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    /// Context features of event `i`, reading only `events[..i]`.
    fn context_at(&self, i: usize, config: &WindowConfig) -> ContextFeatures {
        let current = &self.events[i];
        let zone = self.zones[i];
        let prior = &self.events[..i];
        let prior_zones = &self.zones[..i];

        let mut context = ContextFeatures::without_history(current.time.month(), zone);

        if let Some(j) = prior_zones.iter().rposition(|&z| z == zone) {
            context.prev_magnitude = prior[j].magnitude;
            context.days_since_last_quake = days_between(current.time, prior[j].time);
        }

        let short_start = window_start(current.time, config.short_window_days);
        context.quake_count_7d = prior
            .iter()
            .filter(|p| p.time >= short_start)
            .filter(|p| {
                haversine_km(current.latitude, current.longitude, p.latitude, p.longitude)
                    <= config.radius_km
            })
            .count() as f64;

        let long_start = window_start(current.time, config.long_window_days);
        let stats = WindowStats::collect(
            prior
                .iter()
                .zip(prior_zones)
                .filter(|(p, z)| **z == zone && in_window(p.time, long_start))
                .map(|(p, _)| p.magnitude),
        );
        context.quake_count_30d = stats.count as f64;
        context.avg_magnitude_30d = stats.mean();
        context.max_magnitude_30d = stats.max();

        context
    }
}

fn in_window(time: DateTime<Utc>, start: DateTime<Utc>) -> bool {
    time >= start
}

/// Count/mean/max accumulator over magnitudes in a window.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WindowStats {
    pub count: usize,
    sum: f64,
    max: Option<f64>,
}

impl WindowStats {
    pub fn collect(magnitudes: impl Iterator<Item = f64>) -> Self {
        magnitudes.fold(Self::default(), |mut acc, m| {
            acc.count += 1;
            acc.sum += m;
            acc.max = Some(acc.max.map_or(m, |cur| cur.max(m)));
            acc
        })
    }

    /// Mean magnitude, `0.0` for an empty window.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Max magnitude, `0.0` for an empty window.
    pub fn max(&self) -> f64 {
        self.max.unwrap_or(0.0)
    }
}
