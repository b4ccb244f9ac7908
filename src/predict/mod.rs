//! Inference: fusion predictor, decision table, alerting, and the worker pool.

pub mod alert;
pub mod ladder;
pub mod pool;
pub mod predictor;

pub use alert::{classify_alert, thresholds_for};
pub use ladder::{FusionBranch, FusionOutcome, fuse};
pub use pool::InferencePool;
pub use predictor::{Predictor, get_feature_vector, get_feature_vector_at};
