//! Command-line parsing for the `quake` binary.
//!
//! Parsing and dispatch stay separate from feature derivation and inference; handlers in
//! [`crate::app`] turn these structs into library calls.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "quake", version, about = "Earthquake magnitude prediction and alerting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Predict magnitude, confidence, zone, and alert level for a location.
    Predict(PredictArgs),
    /// Show the feature vector ranked by importance, with a historical comparison.
    Explain(ExplainArgs),
    /// Predict for every request in a JSON file and print the reports as JSON.
    Batch(BatchArgs),
    /// Derive batch features from a cleaned catalogue CSV and write them to CSV.
    Features(FeaturesArgs),
    /// Historical averages around a location.
    History(HistoryArgs),
    /// Seismic zone and alert thresholds for a location.
    Zone(LocationArgs),
}

/// A query point.
#[derive(Debug, Args, Clone)]
pub struct LocationArgs {
    /// Latitude in degrees, [-90, 90].
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees, [-180, 180].
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

/// Where models live and how many inference threads to use.
#[derive(Debug, Args, Clone, Default)]
pub struct ModelArgs {
    /// Directory holding xgb_model.json, lstm_model.json, fusion_model.json.
    /// Overrides QUAKE_MODEL_DIR.
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Inference worker threads (0 = default). Overrides QUAKE_INFERENCE_THREADS.
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Depth in km (>= 0).
    #[arg(long)]
    pub depth: f64,

    /// Recent events JSON (array, or object with `recent_events`).
    #[arg(long, value_name = "JSON")]
    pub events: Option<PathBuf>,

    #[command(flatten)]
    pub models: ModelArgs,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub predict: PredictArgs,

    /// Cleaned catalogue CSV for the historical comparison. Overrides QUAKE_DATASET.
    #[arg(long, value_name = "CSV")]
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// JSON array of requests: `{latitude, longitude, depth_km, recent_events}`.
    #[arg(long, value_name = "JSON")]
    pub requests: PathBuf,

    #[command(flatten)]
    pub models: ModelArgs,
}

#[derive(Debug, Args, Clone)]
pub struct FeaturesArgs {
    /// Cleaned catalogue CSV.
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Output features CSV.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,

    /// Radius for the 7-day proximity count.
    #[arg(long, default_value_t = 100.0)]
    pub radius_km: f64,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Cleaned catalogue CSV. Overrides QUAKE_DATASET.
    #[arg(long, value_name = "CSV")]
    pub dataset: Option<PathBuf>,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}
