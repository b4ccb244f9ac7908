//! Fusion predictor: online features, up to three models, one magnitude.
//!
//! The predictor never rejects a request. Missing artifacts and short histories lower the
//! confidence label instead (see [`crate::predict::ladder`]). The only error it returns is
//! a corrupt artifact surfaced by the registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{PredictRequest, PredictionResult, RecentEvent, ZoneId};
use crate::error::AppError;
use crate::features::online::{RecentHistory, context_features, enrich_recent_events};
use crate::features::schema::{PointFeatures, SEQUENCE_LENGTH, SequenceWindow, point_feature_names};
use crate::models::ModelRegistry;
use crate::predict::ladder::{FusionOutcome, fuse};

/// Everything the models consume for one query, built once per request.
#[derive(Debug, Clone)]
struct ModelInputs {
    zone: ZoneId,
    point: PointFeatures,
    window: Option<SequenceWindow>,
}

impl ModelInputs {
    fn build(
        latitude: f64,
        longitude: f64,
        depth_km: f64,
        recent_events: &[RecentEvent],
        now: DateTime<Utc>,
    ) -> Self {
        let history: RecentHistory = enrich_recent_events(recent_events);
        let context = context_features(latitude, longitude, &history, now);
        Self {
            zone: context.seismic_zone as ZoneId,
            point: PointFeatures::new(latitude, longitude, depth_km, &context),
            window: history.sequence_window(),
        }
    }
}

/// Feature vector the point regressor would receive, with names in column order.
pub fn get_feature_vector(
    latitude: f64,
    longitude: f64,
    depth_km: f64,
    recent_events: &[RecentEvent],
) -> (PointFeatures, Vec<&'static str>) {
    get_feature_vector_at(latitude, longitude, depth_km, recent_events, Utc::now())
}

pub fn get_feature_vector_at(
    latitude: f64,
    longitude: f64,
    depth_km: f64,
    recent_events: &[RecentEvent],
    now: DateTime<Utc>,
) -> (PointFeatures, Vec<&'static str>) {
    let inputs = ModelInputs::build(latitude, longitude, depth_km, recent_events, now);
    (inputs.point, point_feature_names())
}

#[derive(Debug, Clone)]
pub struct Predictor {
    registry: Arc<ModelRegistry>,
}

impl Predictor {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Predict relative to the current wall-clock time.
    pub fn predict_event(
        &self,
        latitude: f64,
        longitude: f64,
        depth_km: f64,
        recent_events: &[RecentEvent],
    ) -> Result<PredictionResult, AppError> {
        self.predict_event_at(latitude, longitude, depth_km, recent_events, Utc::now())
    }

    pub fn predict_event_at(
        &self,
        latitude: f64,
        longitude: f64,
        depth_km: f64,
        recent_events: &[RecentEvent],
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, AppError> {
        let inputs = ModelInputs::build(latitude, longitude, depth_km, recent_events, now);
        let outcome = self.run_models(&inputs)?;
        Ok(PredictionResult {
            predicted_magnitude: outcome.magnitude,
            confidence: outcome.confidence(),
            seismic_zone: inputs.zone,
        })
    }

    /// Predict for an already-validated request.
    pub fn predict_request(
        &self,
        request: &PredictRequest,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, AppError> {
        self.predict_event_at(
            request.latitude,
            request.longitude,
            request.depth_km,
            &request.recent_events,
            now,
        )
    }

    fn run_models(&self, inputs: &ModelInputs) -> Result<FusionOutcome, AppError> {
        let point_model = self.registry.point_regressor()?;
        let sequence_model = self.registry.sequence_model()?;
        let fusion_head = self.registry.fusion_head()?;

        let point = point_model.get().map(|m| m.predict(&inputs.point));

        let sequence = match (&inputs.window, sequence_model.get()) {
            (Some(window), Some(model)) => Some(model.predict(window)),
            (None, Some(_)) => {
                log::debug!("fewer than {SEQUENCE_LENGTH} recent events; sequence model skipped");
                None
            }
            (_, None) => None,
        };

        let outcome = fuse(point, sequence, fusion_head.get());
        log::debug!(
            "fusion branch {} -> magnitude {:.3} (confidence {})",
            outcome.branch.as_str(),
            outcome.magnitude,
            outcome.confidence()
        );
        Ok(outcome)
    }
}
