//! Shared wiring between CLI handlers and the library.
//!
//! Each `run_*` function performs one end-to-end workflow and returns plain data; the
//! handlers in [`crate::app`] only decide how to print it.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{HistoricalSummary, PredictRequest, RuntimeConfig};
use crate::error::{AppError, EXIT_DATA, EXIT_INPUT};
use crate::features::batch::{WindowConfig, build_features_with};
use crate::io::dataset::{LoadedDataset, load_dataset};
use crate::io::events::read_recent_events;
use crate::io::export::write_features_csv;
use crate::models::ModelRegistry;
use crate::predict::{InferencePool, Predictor, get_feature_vector_at};
use crate::report::{FeatureContribution, PredictionReport, explain, get_historical_averages};

/// Build and validate a request from CLI inputs.
pub fn build_request(
    latitude: f64,
    longitude: f64,
    depth_km: f64,
    events: Option<&Path>,
) -> Result<PredictRequest, AppError> {
    let recent_events = match events {
        Some(path) => read_recent_events(path)?,
        None => Vec::new(),
    };
    let request = PredictRequest {
        latitude,
        longitude,
        depth_km,
        recent_events,
    };
    request.validate()?;
    Ok(request)
}

/// Registry + predictor + worker pool for one process.
///
/// Artifacts are loaded here so a corrupt file stops the run before any request is served.
pub fn start_inference(config: &RuntimeConfig) -> Result<InferencePool, AppError> {
    let registry = Arc::new(ModelRegistry::new(&config.model_dir));
    registry.warm_up()?;
    let predictor = Arc::new(Predictor::new(registry));
    InferencePool::new(predictor, config.inference_threads)
}

pub fn run_prediction(pool: &InferencePool, request: &PredictRequest) -> Result<PredictionReport, AppError> {
    let result = pool.predict(request)?;
    Ok(PredictionReport::new(request, &result))
}

/// All outputs of `quake explain`.
#[derive(Debug, Clone)]
pub struct ExplainOutput {
    pub report: PredictionReport,
    pub contributions: Vec<FeatureContribution>,
    pub historical: HistoricalSummary,
}

pub fn run_explain(
    pool: &InferencePool,
    request: &PredictRequest,
    dataset: &Path,
) -> Result<ExplainOutput, AppError> {
    // One instant for both the prediction and the displayed vector.
    let now = Utc::now();
    let result = pool.predict_at(request, now)?;
    let (features, _) = get_feature_vector_at(
        request.latitude,
        request.longitude,
        request.depth_km,
        &request.recent_events,
        now,
    );
    let regressor = pool.predictor().registry().point_regressor()?;
    let contributions = explain(regressor.get(), &features);
    let historical = get_historical_averages(request.latitude, request.longitude, dataset);

    Ok(ExplainOutput {
        report: PredictionReport::new(request, &result),
        contributions,
        historical,
    })
}

pub fn read_batch_requests(path: &Path) -> Result<Vec<PredictRequest>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to read requests '{}': {e}", path.display()),
        )
    })?;
    let requests: Vec<PredictRequest> = serde_json::from_str(&text).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("{}: invalid requests JSON: {e}", path.display()))
    })?;
    for (i, request) in requests.iter().enumerate() {
        request
            .validate()
            .map_err(|e| AppError::new(e.exit_code(), format!("request {i}: {}", e.message())))?;
    }
    Ok(requests)
}

pub fn run_batch(pool: &InferencePool, requests: &[PredictRequest]) -> Result<Vec<PredictionReport>, AppError> {
    let results = pool.predict_many(requests, Utc::now());
    requests
        .iter()
        .zip(results)
        .map(|(request, result)| result.map(|r| PredictionReport::new(request, &r)))
        .collect()
}

/// Derive batch features for a catalogue and write them out. Returns rows written.
pub fn run_feature_export(
    input: &Path,
    output: &Path,
    window: &WindowConfig,
) -> Result<(LoadedDataset, usize), AppError> {
    let data = load_dataset(input)?;
    if data.events.is_empty() {
        return Err(AppError::new(
            EXIT_DATA,
            format!("No usable rows in '{}'.", input.display()),
        ));
    }
    let rows = build_features_with(&data.events, window);
    write_features_csv(output, &rows)?;
    log::info!("wrote {} feature rows to {}", rows.len(), output.display());
    Ok((data, rows.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booster::tests::TWO_STUMPS;
    use std::fs;

    fn config(dir: &Path) -> RuntimeConfig {
        RuntimeConfig {
            model_dir: dir.to_path_buf(),
            dataset_path: dir.join("clean.csv"),
            inference_threads: 1,
        }
    }

    #[test]
    fn empty_model_dir_still_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let pool = start_inference(&config(dir.path())).unwrap();
        let request = build_request(28.6, 77.2, 10.0, None).unwrap();
        let report = run_prediction(&pool, &request).unwrap();
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.fusion_branch, "degraded");
        assert_eq!(report.seismic_zone, 4);
    }

    #[test]
    fn corrupt_model_stops_startup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fusion_model.json"), "[]").unwrap();
        let err = start_inference(&config(dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MODEL);
    }

    #[test]
    fn invalid_request_is_rejected_before_inference() {
        let err = build_request(91.0, 77.2, 10.0, None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn explain_uses_regressor_importances_and_baseline_history() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("xgb_model.json"), TWO_STUMPS).unwrap();
        let cfg = config(dir.path());
        let pool = start_inference(&cfg).unwrap();
        let request = build_request(28.6, 77.2, 10.0, None).unwrap();

        let out = run_explain(&pool, &request, &cfg.dataset_path).unwrap();
        assert_eq!(out.report.confidence, 0.7);
        assert_eq!(out.contributions[0].feature, "prev_magnitude");
        assert_eq!(out.historical.total_events, 0);
    }

    #[test]
    fn batch_requests_are_validated_with_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.json");
        fs::write(
            &path,
            r#"[{"latitude":28.6,"longitude":77.2,"depth_km":10},
                {"latitude":28.6,"longitude":200.0,"depth_km":10}]"#,
        )
        .unwrap();
        let err = read_batch_requests(&path).unwrap_err();
        assert!(err.message().starts_with("request 1:"));
    }

    #[test]
    fn batch_reports_follow_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let pool = start_inference(&config(dir.path())).unwrap();
        let requests = vec![
            build_request(22.0, 90.0, 5.0, None).unwrap(),
            build_request(28.6, 77.2, 5.0, None).unwrap(),
        ];
        let reports = run_batch(&pool, &requests).unwrap();
        assert_eq!(reports[0].seismic_zone, 5);
        assert_eq!(reports[1].seismic_zone, 4);
    }

    #[test]
    fn feature_export_requires_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clean.csv");
        let output = dir.path().join("features.csv");
        fs::write(&input, "time,latitude,longitude,depth_km,magnitude,place\n").unwrap();
        let err = run_feature_export(&input, &output, &WindowConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_DATA);

        fs::write(
            &input,
            "time,latitude,longitude,depth_km,magnitude,place\n\
             2024-01-01T00:00:00Z,28.6,77.2,10,4.0,Delhi\n",
        )
        .unwrap();
        let (data, written) = run_feature_export(&input, &output, &WindowConfig::default()).unwrap();
        assert_eq!(data.rows_read, 1);
        assert_eq!(written, 1);
        assert!(output.exists());
    }
}
