//! Feature engineering.
//!
//! Responsibilities:
//!
//! - assign seismic zones from the static box table
//! - define the shared ordered feature schema
//! - derive batch (training) features over a full catalogue
//! - enrich recent events and derive online (inference) context features
//! - lay out training sets for the sequence model and fusion head

pub mod batch;
pub mod online;
pub mod schema;
pub mod training;
pub mod zone;

pub use batch::{FeatureRow, WindowConfig, build_features, build_features_with};
pub use online::{RecentHistory, context_features, enrich_recent_events};
pub use schema::*;
pub use zone::assign_zone;
