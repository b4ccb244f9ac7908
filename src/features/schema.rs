//! The ordered feature schema shared by training-time and inference-time builders.
//!
//! Both the batch builder and the online builder produce a [`ContextFeatures`] and hand
//! it to [`PointFeatures::new`], which is the only place a point-feature vector is laid
//! out. The sequence model's per-step layout is defined the same way by
//! [`SequenceStep`]. Reordering a variant in either enum changes the contract with every
//! trained artifact, so artifacts carrying feature names are checked against
//! [`point_feature_names`] when loaded.

use serde::{Deserialize, Serialize};

use crate::domain::{EnrichedEvent, ZoneId};

/// Number of scalar inputs to the point regressor.
pub const POINT_FEATURE_COUNT: usize = 11;

/// Number of fields per sequence-model timestep.
pub const SEQUENCE_FIELD_COUNT: usize = 6;

/// Fixed window length consumed by the sequence model.
pub const SEQUENCE_LENGTH: usize = 10;

/// Point-regressor inputs, in model column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFeature {
    Latitude,
    Longitude,
    DepthKm,
    PrevMagnitude,
    QuakeCount7d,
    QuakeCount30d,
    AvgMagnitude30d,
    MaxMagnitude30d,
    DaysSinceLastQuake,
    Month,
    SeismicZone,
}

impl PointFeature {
    pub const ALL: [PointFeature; POINT_FEATURE_COUNT] = [
        PointFeature::Latitude,
        PointFeature::Longitude,
        PointFeature::DepthKm,
        PointFeature::PrevMagnitude,
        PointFeature::QuakeCount7d,
        PointFeature::QuakeCount30d,
        PointFeature::AvgMagnitude30d,
        PointFeature::MaxMagnitude30d,
        PointFeature::DaysSinceLastQuake,
        PointFeature::Month,
        PointFeature::SeismicZone,
    ];

    /// Column index in the model input.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name as used in feature exports and model files.
    pub fn name(self) -> &'static str {
        match self {
            PointFeature::Latitude => "latitude",
            PointFeature::Longitude => "longitude",
            PointFeature::DepthKm => "depth_km",
            PointFeature::PrevMagnitude => "prev_magnitude",
            PointFeature::QuakeCount7d => "quake_count_7d",
            PointFeature::QuakeCount30d => "quake_count_30d",
            PointFeature::AvgMagnitude30d => "avg_magnitude_30d",
            PointFeature::MaxMagnitude30d => "max_magnitude_30d",
            PointFeature::DaysSinceLastQuake => "days_since_last_quake",
            PointFeature::Month => "month",
            PointFeature::SeismicZone => "seismic_zone",
        }
    }

    /// Human-readable label for explanation tables.
    pub fn label(self) -> &'static str {
        match self {
            PointFeature::Latitude => "Latitude",
            PointFeature::Longitude => "Longitude",
            PointFeature::DepthKm => "Depth (km)",
            PointFeature::PrevMagnitude => "Previous magnitude",
            PointFeature::QuakeCount7d => "Quakes nearby (7 days)",
            PointFeature::QuakeCount30d => "Quakes in zone (30 days)",
            PointFeature::AvgMagnitude30d => "Average magnitude (30 days)",
            PointFeature::MaxMagnitude30d => "Max magnitude (30 days)",
            PointFeature::DaysSinceLastQuake => "Days since last quake",
            PointFeature::Month => "Month",
            PointFeature::SeismicZone => "Seismic zone",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether this feature is derived from event history (vs. the raw location).
    pub fn is_context(self) -> bool {
        !matches!(
            self,
            PointFeature::Latitude | PointFeature::Longitude | PointFeature::DepthKm
        )
    }
}

/// Point-feature names in model column order.
pub fn point_feature_names() -> Vec<&'static str> {
    PointFeature::ALL.iter().map(|f| f.name()).collect()
}

/// The eight history-derived features.
///
/// Counts are carried as `f64` because they are fed to the models as floats.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextFeatures {
    pub prev_magnitude: f64,
    pub quake_count_7d: f64,
    pub quake_count_30d: f64,
    pub avg_magnitude_30d: f64,
    pub max_magnitude_30d: f64,
    pub days_since_last_quake: f64,
    pub month: f64,
    pub seismic_zone: f64,
}

impl ContextFeatures {
    /// Context with no history: every derived value `0.0` except month and zone.
    pub fn without_history(month: u32, zone: ZoneId) -> Self {
        Self {
            month: f64::from(month),
            seismic_zone: f64::from(zone),
            ..Self::default()
        }
    }
}

/// The full 11-element input of the point regressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointFeatures {
    values: [f64; POINT_FEATURE_COUNT],
}

impl PointFeatures {
    /// Lay out raw location fields and context features in schema order.
    pub fn new(latitude: f64, longitude: f64, depth_km: f64, context: &ContextFeatures) -> Self {
        let mut values = [0.0; POINT_FEATURE_COUNT];
        for feature in PointFeature::ALL {
            let value = match feature {
                PointFeature::Latitude => latitude,
                PointFeature::Longitude => longitude,
                PointFeature::DepthKm => depth_km,
                PointFeature::PrevMagnitude => context.prev_magnitude,
                PointFeature::QuakeCount7d => context.quake_count_7d,
                PointFeature::QuakeCount30d => context.quake_count_30d,
                PointFeature::AvgMagnitude30d => context.avg_magnitude_30d,
                PointFeature::MaxMagnitude30d => context.max_magnitude_30d,
                PointFeature::DaysSinceLastQuake => context.days_since_last_quake,
                PointFeature::Month => context.month,
                PointFeature::SeismicZone => context.seismic_zone,
            };
            // Missing inputs are filled with zero before reaching any model.
            values[feature.index()] = if value.is_nan() { 0.0 } else { value };
        }
        Self { values }
    }

    pub fn as_array(&self) -> &[f64; POINT_FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, feature: PointFeature) -> f64 {
        self.values[feature.index()]
    }
}

/// Sequence-model inputs per timestep, in model column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceField {
    Latitude,
    Longitude,
    DepthKm,
    Magnitude,
    DaysSinceLastQuake,
    SeismicZone,
}

impl SequenceField {
    pub const ALL: [SequenceField; SEQUENCE_FIELD_COUNT] = [
        SequenceField::Latitude,
        SequenceField::Longitude,
        SequenceField::DepthKm,
        SequenceField::Magnitude,
        SequenceField::DaysSinceLastQuake,
        SequenceField::SeismicZone,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SequenceField::Latitude => "latitude",
            SequenceField::Longitude => "longitude",
            SequenceField::DepthKm => "depth_km",
            SequenceField::Magnitude => "magnitude",
            SequenceField::DaysSinceLastQuake => "days_since_last_quake",
            SequenceField::SeismicZone => "seismic_zone",
        }
    }
}

/// One timestep of the sequence-model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequenceStep {
    values: [f64; SEQUENCE_FIELD_COUNT],
}

impl SequenceStep {
    pub fn new(
        latitude: f64,
        longitude: f64,
        depth_km: f64,
        magnitude: f64,
        days_since_last_quake: f64,
        seismic_zone: ZoneId,
    ) -> Self {
        let mut values = [0.0; SEQUENCE_FIELD_COUNT];
        for field in SequenceField::ALL {
            values[field.index()] = match field {
                SequenceField::Latitude => latitude,
                SequenceField::Longitude => longitude,
                SequenceField::DepthKm => depth_km,
                SequenceField::Magnitude => magnitude,
                SequenceField::DaysSinceLastQuake => days_since_last_quake,
                SequenceField::SeismicZone => f64::from(seismic_zone),
            };
        }
        Self { values }
    }

    pub fn as_array(&self) -> &[f64; SEQUENCE_FIELD_COUNT] {
        &self.values
    }

    pub fn get(&self, field: SequenceField) -> f64 {
        self.values[field.index()]
    }
}

impl From<&EnrichedEvent> for SequenceStep {
    fn from(event: &EnrichedEvent) -> Self {
        SequenceStep::new(
            event.latitude,
            event.longitude,
            event.depth_km,
            event.magnitude,
            event.days_since_last_quake,
            event.seismic_zone,
        )
    }
}

/// A full sequence-model input window, oldest step first.
pub type SequenceWindow = [SequenceStep; SEQUENCE_LENGTH];
