//! Dedicated worker pool for model evaluation.
//!
//! Requests are evaluated on the pool's own threads, never on the caller's. Batches keep
//! input order in their output.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::domain::{PredictRequest, PredictionResult};
use crate::error::{AppError, EXIT_POOL};
use crate::predict::predictor::Predictor;

pub struct InferencePool {
    pool: rayon::ThreadPool,
    predictor: Arc<Predictor>,
}

impl InferencePool {
    /// `threads == 0` uses rayon's default thread count.
    pub fn new(predictor: Arc<Predictor>, threads: usize) -> Result<Self, AppError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("quake-infer-{i}"))
            .build()
            .map_err(|e| AppError::new(EXIT_POOL, format!("Failed to start inference pool: {e}")))?;
        log::debug!("inference pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool, predictor })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn predict(&self, request: &PredictRequest) -> Result<PredictionResult, AppError> {
        self.predict_at(request, Utc::now())
    }

    pub fn predict_at(
        &self,
        request: &PredictRequest,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, AppError> {
        self.pool.install(|| self.predictor.predict_request(request, now))
    }

    /// Evaluate every request against the same `now`; results line up with `requests`.
    pub fn predict_many(
        &self,
        requests: &[PredictRequest],
        now: DateTime<Utc>,
    ) -> Vec<Result<PredictionResult, AppError>> {
        let predictor = &self.predictor;
        self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| predictor.predict_request(request, now))
                .collect()
        })
    }
}

impl std::fmt::Debug for InferencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePool")
            .field("threads", &self.threads())
            .field("predictor", &self.predictor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRegistry;
    use crate::models::booster::tests::TWO_STUMPS;
    use crate::models::GradientBoostedRegressor;
    use chrono::TimeZone;

    fn pool(threads: usize) -> InferencePool {
        let regressor = GradientBoostedRegressor::from_json_str(TWO_STUMPS).unwrap();
        let registry = ModelRegistry::from_parts(Some(regressor), None, None);
        InferencePool::new(Arc::new(Predictor::new(Arc::new(registry))), threads).unwrap()
    }

    fn request(lat: f64, lon: f64) -> PredictRequest {
        PredictRequest {
            latitude: lat,
            longitude: lon,
            depth_km: 10.0,
            recent_events: Vec::new(),
        }
    }

    #[test]
    fn batch_keeps_input_order() {
        let pool = pool(3);
        assert_eq!(pool.threads(), 3);
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        // zones 4, 5, 3, 2 -> the zone stump adds 0.5 only for zone 5
        let requests = vec![
            request(28.6, 77.2),
            request(22.0, 90.0),
            request(19.07, 72.87),
            request(27.0, 70.0),
        ];
        let results: Vec<PredictionResult> = pool
            .predict_many(&requests, now)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        let zones: Vec<u8> = results.iter().map(|r| r.seismic_zone).collect();
        assert_eq!(zones, vec![4, 5, 3, 2]);
        assert!((results[1].predicted_magnitude - 3.25).abs() < 1e-12);
        assert!((results[0].predicted_magnitude - 2.75).abs() < 1e-12);
    }

    #[test]
    fn work_runs_on_pool_threads() {
        let pool = pool(2);
        let name = pool
            .pool
            .install(|| std::thread::current().name().map(str::to_string));
        assert!(name.unwrap().starts_with("quake-infer-"));
        assert!(pool.predict(&request(28.6, 77.2)).is_ok());
    }
}
