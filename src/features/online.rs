//! Online (inference-time) enrichment and context features.
//!
//! A request carries a short, possibly unsorted list of recent events. Enrichment sorts
//! them, fills in missing zones and recomputes the gap to the previous event. Context
//! features are then taken relative to "now" rather than to the last event:
//!
//! - `prev_magnitude`: magnitude of the latest event
//! - `days_since_last_quake`: now minus the latest event's time
//! - 7-day and 30-day windows start at now minus 7/30 days, across all zones, with no
//!   distance filter
//! - `month` is the current month and `seismic_zone` the zone of the query point
//!
//! These semantics intentionally differ from the batch builder; see
//! [`crate::features::batch`].

use chrono::{DateTime, Datelike, Utc};

use crate::domain::{EnrichedEvent, RecentEvent};
use crate::features::batch::WindowStats;
use crate::features::schema::{ContextFeatures, SEQUENCE_LENGTH, SequenceStep, SequenceWindow};
use crate::features::zone::assign_zone;
use crate::math::{days_between, window_start};

const SHORT_WINDOW_DAYS: i64 = 7;
const LONG_WINDOW_DAYS: i64 = 30;

/// Enriched recent events, always sorted ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecentHistory {
    events: Vec<EnrichedEvent>,
}

impl RecentHistory {
    pub fn events(&self) -> &[EnrichedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn latest(&self) -> Option<&EnrichedEvent> {
        self.events.last()
    }

    /// The last [`SEQUENCE_LENGTH`] events in time order, or `None` when there are
    /// fewer. Short histories are never padded.
    pub fn sequence_window(&self) -> Option<SequenceWindow> {
        let start = self.events.len().checked_sub(SEQUENCE_LENGTH)?;
        let tail = &self.events[start..];
        Some(std::array::from_fn(|i| SequenceStep::from(&tail[i])))
    }
}

/// Sort, assign missing zones, and recompute consecutive gaps (first event: `0.0`).
pub fn enrich_recent_events(events: &[RecentEvent]) -> RecentHistory {
    let mut sorted: Vec<&RecentEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp);

    let mut enriched = Vec::with_capacity(sorted.len());
    let mut previous: Option<DateTime<Utc>> = None;
    for event in sorted {
        let seismic_zone = event
            .seismic_zone
            .unwrap_or_else(|| assign_zone(event.latitude, event.longitude));
        let days_since_last_quake = previous.map_or(0.0, |prev| days_between(event.timestamp, prev));
        enriched.push(EnrichedEvent {
            latitude: event.latitude,
            longitude: event.longitude,
            depth_km: event.depth_km,
            magnitude: event.magnitude,
            timestamp: event.timestamp,
            seismic_zone,
            days_since_last_quake,
        });
        previous = Some(event.timestamp);
    }

    RecentHistory { events: enriched }
}

/// Context features for a query point, relative to `now`.
pub fn context_features(
    latitude: f64,
    longitude: f64,
    history: &RecentHistory,
    now: DateTime<Utc>,
) -> ContextFeatures {
    let zone = assign_zone(latitude, longitude);
    let mut context = ContextFeatures::without_history(now.month(), zone);

    let Some(latest) = history.latest() else {
        return context;
    };

    context.prev_magnitude = latest.magnitude;
    context.days_since_last_quake = days_between(now, latest.timestamp);

    let short_start = window_start(now, SHORT_WINDOW_DAYS);
    context.quake_count_7d = history
        .events()
        .iter()
        .filter(|e| e.timestamp >= short_start)
        .count() as f64;

    let long_start = window_start(now, LONG_WINDOW_DAYS);
    let stats = WindowStats::collect(
        history
            .events()
            .iter()
            .filter(|e| e.timestamp >= long_start)
            .map(|e| e.magnitude),
    );
    context.quake_count_30d = stats.count as f64;
    context.avg_magnitude_30d = stats.mean();
    context.max_magnitude_30d = stats.max();

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn recent(days_ago: f64, lat: f64, lon: f64, mag: f64) -> RecentEvent {
        RecentEvent {
            latitude: lat,
            longitude: lon,
            depth_km: 10.0,
            magnitude: mag,
            timestamp: now() - Duration::seconds((days_ago * 86_400.0) as i64),
            seismic_zone: None,
            days_since_last_quake: None,
        }
    }

    #[test]
    fn enrichment_sorts_and_recomputes_gaps() {
        let mut late = recent(1.0, 28.6, 77.2, 4.0);
        late.days_since_last_quake = Some(99.0);
        let early = recent(3.0, 19.07, 72.87, 3.0);
        let history = enrich_recent_events(&[late, early]);

        let events = history.events();
        assert_eq!(events[0].magnitude, 3.0);
        assert_eq!(events[0].days_since_last_quake, 0.0);
        assert!((events[1].days_since_last_quake - 2.0).abs() < 1e-9);
        assert_eq!(events[0].seismic_zone, 3);
        assert_eq!(events[1].seismic_zone, 4);
    }

    #[test]
    fn supplied_zone_is_kept() {
        let mut e = recent(1.0, 28.6, 77.2, 4.0);
        e.seismic_zone = Some(5);
        let history = enrich_recent_events(&[e]);
        assert_eq!(history.events()[0].seismic_zone, 5);
    }

    #[test]
    fn empty_history_gives_zone_only_context() {
        let ctx = context_features(28.6, 77.2, &RecentHistory::default(), now());
        assert_eq!(ctx, ContextFeatures::without_history(10, 4));
    }

    #[test]
    fn windows_are_relative_to_now_without_distance_filter() {
        let history = enrich_recent_events(&[
            recent(40.0, 28.6, 77.2, 6.0),
            recent(20.0, 28.6, 77.2, 3.0),
            recent(2.0, 8.0, 93.0, 5.0), // far away, still counted
            recent(0.5, 28.6, 77.2, 4.0),
        ]);
        let ctx = context_features(28.6, 77.2, &history, now());
        assert_eq!(ctx.prev_magnitude, 4.0);
        assert!((ctx.days_since_last_quake - 0.5).abs() < 1e-9);
        assert_eq!(ctx.quake_count_7d, 2.0);
        assert_eq!(ctx.quake_count_30d, 3.0);
        assert!((ctx.avg_magnitude_30d - 4.0).abs() < 1e-12);
        assert_eq!(ctx.max_magnitude_30d, 5.0);
        assert_eq!(ctx.month, 10.0);
        assert_eq!(ctx.seismic_zone, 4.0);
    }

    #[test]
    fn sequence_window_needs_ten_events() {
        let nine: Vec<RecentEvent> = (0..9).map(|i| recent(i as f64, 28.6, 77.2, 3.0)).collect();
        assert!(enrich_recent_events(&nine).sequence_window().is_none());

        let twelve: Vec<RecentEvent> = (0..12)
            .map(|i| recent(i as f64, 28.6, 77.2, 3.0 + i as f64 * 0.1))
            .collect();
        let window = enrich_recent_events(&twelve).sequence_window().unwrap();
        // Oldest of the last ten is 9 days ago (magnitude 3.9), newest is now (3.0).
        assert!((window[0].as_array()[3] - 3.9).abs() < 1e-12);
        assert!((window[9].as_array()[3] - 3.0).abs() < 1e-12);
    }
}
