//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - catalogue and request events (`SeismicEvent`, `RecentEvent`, `EnrichedEvent`)
//! - predictor outputs (`PredictionResult`, `AlertLevel`, `HistoricalSummary`)
//! - process configuration (`RuntimeConfig`)

pub mod types;

pub use types::*;
