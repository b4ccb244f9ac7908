//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - read from the cleaned historical dataset and recent-event JSON files
//! - passed through feature derivation and model inference
//! - written out as prediction reports

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, EXIT_INPUT};

/// Seismic zone identifier, `2` (lowest risk) to `5` (highest risk).
pub type ZoneId = u8;

/// One row of the cleaned historical catalogue.
///
/// Depth is optional because the upstream catalogue occasionally omits it; consumers
/// that need a number substitute `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: Option<f64>,
    pub magnitude: f64,
    pub place: Option<String>,
}

impl SeismicEvent {
    /// Depth with missing values filled as `0.0`.
    pub fn depth_or_zero(&self) -> f64 {
        self.depth_km.filter(|d| d.is_finite()).unwrap_or(0.0)
    }
}

/// A recent event as supplied by a caller of the predictor.
///
/// Events may arrive unsorted and without a zone; `days_since_last_quake` is always
/// recomputed during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEvent {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    /// RFC 3339, or a naive ISO time taken as UTC.
    #[serde(deserialize_with = "crate::io::dataset::deserialize_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub seismic_zone: Option<ZoneId>,
    #[serde(default)]
    pub days_since_last_quake: Option<f64>,
}

/// A recent event after enrichment: zone resolved, gap to the previous event computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnrichedEvent {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub timestamp: DateTime<Utc>,
    pub seismic_zone: ZoneId,
    pub days_since_last_quake: f64,
}

/// A single inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,
    #[serde(default)]
    pub recent_events: Vec<RecentEvent>,
}

impl PredictRequest {
    /// Validate coordinates and depth.
    ///
    /// This is the request boundary; the predictor itself never rejects inputs.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude)) {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Latitude {} is outside [-90, 90].", self.latitude),
            ));
        }
        if !(self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude)) {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Longitude {} is outside [-180, 180].", self.longitude),
            ));
        }
        if !(self.depth_km.is_finite() && self.depth_km >= 0.0) {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Depth {} km must be finite and >= 0.", self.depth_km),
            ));
        }
        Ok(())
    }
}

/// Output of the fusion predictor.
///
/// `confidence` is a discrete label naming which models contributed, not a probability:
/// `0.8` fused, `0.7` point regressor only, `0.65` sequence model only, `0.0` no model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_magnitude: f64,
    pub confidence: f64,
    pub seismic_zone: ZoneId,
}

/// Three-level categorical alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Low,
    Mid,
    High,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Low => "LOW",
            AlertLevel::Mid => "MID",
            AlertLevel::High => "HIGH",
        }
    }

    /// Operator guidance attached to each level.
    pub fn recommendation(self) -> &'static str {
        match self {
            AlertLevel::Low => "Informational only",
            AlertLevel::Mid => "Precautionary alert - monitor updates",
            AlertLevel::High => "Emergency alert - follow official guidance",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regional statistics from the reference catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSummary {
    pub avg_magnitude: f64,
    pub max_magnitude: f64,
    pub avg_depth: f64,
    pub total_events: usize,
    pub note: String,
}

/// Process-level settings: where artifacts and reference data live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
    /// Inference worker threads; `0` means the thread-pool default.
    pub inference_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            dataset_path: PathBuf::from("data/processed/usgs_india_clean.csv"),
            inference_threads: 0,
        }
    }
}

impl RuntimeConfig {
    /// Resolve settings from the environment (a `.env` file is honoured).
    ///
    /// - `QUAKE_MODEL_DIR`
    /// - `QUAKE_DATASET`
    /// - `QUAKE_INFERENCE_THREADS`
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(dir) = lookup("QUAKE_MODEL_DIR").filter(|v| !v.trim().is_empty()) {
            config.model_dir = PathBuf::from(dir.trim());
        }
        if let Some(path) = lookup("QUAKE_DATASET").filter(|v| !v.trim().is_empty()) {
            config.dataset_path = PathBuf::from(path.trim());
        }
        if let Some(threads) = lookup("QUAKE_INFERENCE_THREADS").filter(|v| !v.trim().is_empty()) {
            config.inference_threads = threads.trim().parse::<usize>().map_err(|_| {
                AppError::new(
                    EXIT_INPUT,
                    format!("QUAKE_INFERENCE_THREADS must be a non-negative integer, got '{threads}'."),
                )
            })?;
        }
        Ok(config)
    }
}
