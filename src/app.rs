//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves runtime configuration (environment, then flags)
//! - dispatches to the pipeline and prints results

use clap::Parser;

use crate::cli::{BatchArgs, Command, ExplainArgs, FeaturesArgs, HistoryArgs, LocationArgs, ModelArgs, PredictArgs};
use crate::domain::{PredictRequest, RuntimeConfig};
use crate::error::{AppError, EXIT_INPUT};
use crate::features::batch::WindowConfig;
use crate::features::zone::assign_zone;
use crate::report::{
    format_explanation, format_feature_export, format_historical, format_prediction, format_zone,
    get_historical_averages,
};

pub mod pipeline;

/// Entry point for the `quake` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    let config = RuntimeConfig::from_env()?;

    match cli.command {
        Command::Predict(args) => handle_predict(args, config),
        Command::Explain(args) => handle_explain(args, config),
        Command::Batch(args) => handle_batch(args, config),
        Command::Features(args) => handle_features(args),
        Command::History(args) => handle_history(args, config),
        Command::Zone(args) => handle_zone(args),
    }
}

/// Apply `--model-dir` / `--threads` on top of the environment.
pub fn apply_model_args(mut config: RuntimeConfig, args: &ModelArgs) -> RuntimeConfig {
    if let Some(dir) = &args.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(threads) = args.threads {
        config.inference_threads = threads;
    }
    config
}

fn request_from_args(args: &PredictArgs) -> Result<PredictRequest, AppError> {
    pipeline::build_request(
        args.location.lat,
        args.location.lon,
        args.depth,
        args.events.as_deref(),
    )
}

fn handle_predict(args: PredictArgs, config: RuntimeConfig) -> Result<(), AppError> {
    let request = request_from_args(&args)?;
    let config = apply_model_args(config, &args.models);
    let pool = pipeline::start_inference(&config)?;
    let report = pipeline::run_prediction(&pool, &request)?;

    if args.json {
        println!("{}", to_json(&report)?);
    } else {
        print!("{}", format_prediction(&report));
    }
    Ok(())
}

fn handle_explain(args: ExplainArgs, config: RuntimeConfig) -> Result<(), AppError> {
    let request = request_from_args(&args.predict)?;
    let mut config = apply_model_args(config, &args.predict.models);
    if let Some(dataset) = args.dataset {
        config.dataset_path = dataset;
    }
    let pool = pipeline::start_inference(&config)?;
    let out = pipeline::run_explain(&pool, &request, &config.dataset_path)?;

    if args.predict.json {
        let value = serde_json::json!({
            "prediction": out.report,
            "features": out.contributions,
            "historical_avg": out.historical,
        });
        println!("{}", to_json(&value)?);
    } else {
        println!("{}", format_prediction(&out.report));
        println!("{}", format_explanation(&out.contributions));
        print!(
            "{}",
            format_historical(&out.historical, Some(out.report.predicted_magnitude))
        );
    }
    Ok(())
}

fn handle_batch(args: BatchArgs, config: RuntimeConfig) -> Result<(), AppError> {
    let requests = pipeline::read_batch_requests(&args.requests)?;
    let config = apply_model_args(config, &args.models);
    let pool = pipeline::start_inference(&config)?;
    let reports = pipeline::run_batch(&pool, &requests)?;
    println!("{}", to_json(&reports)?);
    Ok(())
}

fn handle_features(args: FeaturesArgs) -> Result<(), AppError> {
    if !(args.radius_km.is_finite() && args.radius_km > 0.0) {
        return Err(AppError::new(EXIT_INPUT, "--radius-km must be finite and > 0."));
    }
    let window = WindowConfig {
        radius_km: args.radius_km,
        ..WindowConfig::default()
    };
    let (data, written) = pipeline::run_feature_export(&args.input, &args.output, &window)?;
    print!("{}", format_feature_export(&data, written, &args.output));
    Ok(())
}

fn handle_history(args: HistoryArgs, config: RuntimeConfig) -> Result<(), AppError> {
    validate_location(&args.location)?;
    let dataset = args.dataset.unwrap_or(config.dataset_path);
    let summary = get_historical_averages(args.location.lat, args.location.lon, &dataset);
    if args.json {
        println!("{}", to_json(&summary)?);
    } else {
        print!("{}", format_historical(&summary, None));
    }
    Ok(())
}

fn handle_zone(args: LocationArgs) -> Result<(), AppError> {
    validate_location(&args)?;
    let zone = assign_zone(args.lat, args.lon);
    print!("{}", format_zone(args.lat, args.lon, zone));
    Ok(())
}

/// Coordinate checks shared with request validation (depth is irrelevant here).
fn validate_location(location: &LocationArgs) -> Result<(), AppError> {
    PredictRequest {
        latitude: location.lat,
        longitude: location.lon,
        depth_km: 0.0,
        recent_events: Vec::new(),
    }
    .validate()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn flags_override_environment() {
        let env = RuntimeConfig {
            model_dir: PathBuf::from("/env/models"),
            inference_threads: 4,
            ..RuntimeConfig::default()
        };
        let args = ModelArgs {
            model_dir: Some(PathBuf::from("/flag/models")),
            threads: None,
        };
        let config = apply_model_args(env, &args);
        assert_eq!(config.model_dir, PathBuf::from("/flag/models"));
        assert_eq!(config.inference_threads, 4);
    }

    #[test]
    fn zone_rejects_bad_coordinates() {
        let bad = LocationArgs { lat: 12.0, lon: 181.0 };
        assert_eq!(handle_zone(bad).unwrap_err().exit_code(), EXIT_INPUT);
    }
}
