//! Trained model artifacts and the registry that loads them.
//!
//! All three artifacts are JSON files. Reading a file that exists but cannot be read is
//! treated the same as a file that cannot be parsed: the artifact is corrupt.

pub mod booster;
pub mod dense;
pub mod fusion;
pub mod registry;
pub mod sequence;

pub use booster::GradientBoostedRegressor;
pub use fusion::FusionHead;
pub use registry::{Artifact, ArtifactKey, ModelArtifact, ModelRegistry, SlotState};
pub use sequence::SequenceModel;

use std::path::Path;

use crate::error::AppError;

fn read_artifact(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::model(format!("Failed to read {}: {e}", path.display())))
}
