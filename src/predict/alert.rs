//! Magnitude + zone to alert level.

use crate::domain::{AlertLevel, ZoneId};
use crate::features::zone::HIGHEST_ZONE;

const LOW_BELOW: f64 = 4.0;
const MID_BELOW: f64 = 5.5;
/// Both thresholds drop by this much in the highest-risk zone.
const HIGH_RISK_OFFSET: f64 = 0.5;

/// `(low_below, mid_below)` for a zone: below the first is LOW, below the second MID.
pub fn thresholds_for(zone: ZoneId) -> (f64, f64) {
    if zone >= HIGHEST_ZONE {
        (LOW_BELOW - HIGH_RISK_OFFSET, MID_BELOW - HIGH_RISK_OFFSET)
    } else {
        (LOW_BELOW, MID_BELOW)
    }
}

/// Total over all inputs; a NaN magnitude fails both comparisons and maps to HIGH.
pub fn classify_alert(magnitude: f64, zone: ZoneId) -> AlertLevel {
    let (low_below, mid_below) = thresholds_for(zone);
    if magnitude < low_below {
        AlertLevel::Low
    } else if magnitude < mid_below {
        AlertLevel::Mid
    } else {
        AlertLevel::High
    }
}
