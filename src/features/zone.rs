//! Seismic zone assignment.
//!
//! India's zoning map is approximated by axis-aligned latitude/longitude rectangles.
//! There is no polygon data. The table is checked from the highest-risk zone down, so
//! a point in overlapping boxes resolves to the higher zone.

use crate::domain::ZoneId;

/// Zone returned when no box contains the point.
pub const DEFAULT_ZONE: ZoneId = 2;

/// Highest-risk zone id.
pub const HIGHEST_ZONE: ZoneId = 5;

/// An inclusive lat/lon rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl ZoneBox {
    /// Box from `(min_lon, min_lat, max_lon, max_lat)`.
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Inclusive on all four edges. NaN coordinates are never contained.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.min_lat <= lat && lat <= self.max_lat && self.min_lon <= lon && lon <= self.max_lon
    }
}

/// Static zone table, ordered from highest to lowest risk.
#[derive(Debug, Clone, Copy)]
pub struct ZoneMap {
    zones: &'static [(ZoneId, &'static [ZoneBox])],
}

impl ZoneMap {
    pub const fn new(zones: &'static [(ZoneId, &'static [ZoneBox])]) -> Self {
        Self { zones }
    }

    /// First (highest-risk) zone whose boxes contain the point, else [`DEFAULT_ZONE`].
    pub fn assign(&self, lat: f64, lon: f64) -> ZoneId {
        self.zones
            .iter()
            .find(|(_, boxes)| boxes.iter().any(|b| b.contains(lat, lon)))
            .map(|(zone, _)| *zone)
            .unwrap_or(DEFAULT_ZONE)
    }

    pub fn zones(&self) -> impl Iterator<Item = (ZoneId, &'static [ZoneBox])> + '_ {
        self.zones.iter().copied()
    }
}

const ZONE_5: &[ZoneBox] = &[
    ZoneBox::new(89.0, 20.0, 97.0, 29.0),
    ZoneBox::new(73.0, 32.0, 80.0, 37.0),
    ZoneBox::new(68.0, 22.0, 74.0, 25.0),
    ZoneBox::new(92.0, 6.0, 94.0, 14.0),
];

const ZONE_4: &[ZoneBox] = &[
    ZoneBox::new(75.0, 28.0, 82.0, 32.0),
    ZoneBox::new(84.0, 24.0, 89.0, 28.0),
    ZoneBox::new(88.0, 24.0, 92.0, 27.0),
    ZoneBox::new(73.0, 30.0, 76.0, 33.0),
];

const ZONE_3: &[ZoneBox] = &[
    ZoneBox::new(72.0, 14.0, 78.0, 22.0),
    ZoneBox::new(78.0, 18.0, 86.0, 24.0),
    ZoneBox::new(74.0, 24.0, 82.0, 28.0),
    ZoneBox::new(76.0, 8.0, 80.0, 14.0),
    ZoneBox::new(80.0, 8.0, 88.0, 16.0),
    ZoneBox::new(86.0, 20.0, 92.0, 24.0),
];

const ZONE_2: &[ZoneBox] = &[
    ZoneBox::new(76.0, 8.0, 82.0, 16.0),
    ZoneBox::new(68.0, 24.0, 76.0, 30.0),
    ZoneBox::new(78.0, 14.0, 84.0, 20.0),
];

const ZONE_TABLE: &[(ZoneId, &[ZoneBox])] = &[(5, ZONE_5), (4, ZONE_4), (3, ZONE_3), (2, ZONE_2)];

/// India's approximate zoning map.
pub static INDIA_ZONES: ZoneMap = ZoneMap::new(ZONE_TABLE);

/// Zone of a point on the India map. Total: always returns a zone in `2..=5`.
pub fn assign_zone(lat: f64, lon: f64) -> ZoneId {
    INDIA_ZONES.assign(lat, lon)
}
