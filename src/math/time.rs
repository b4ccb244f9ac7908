//! Time arithmetic shared by the batch and online feature builders.

use chrono::{DateTime, Duration, Utc};

const MICROS_PER_DAY: f64 = 86_400_000_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Signed elapsed time `later - earlier` in fractional days.
pub fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_DAY,
        None => delta.num_seconds() as f64 / SECONDS_PER_DAY,
    }
}

/// Start of a trailing window of `days` ending at `at`.
pub fn window_start(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    at - Duration::days(days)
}
