//! Fusion head: a small dense network over `[point_prediction, sequence_prediction]`.

use std::path::Path;

use nalgebra::DVector;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::dense::{DenseSpec, DenseStack};

/// Width of the fusion head input.
pub const FUSION_INPUT_DIM: usize = 2;

#[derive(Debug, Deserialize)]
struct FusionModelFile {
    layers: Vec<DenseSpec>,
}

#[derive(Debug, Clone)]
pub struct FusionHead {
    stack: DenseStack,
}

impl FusionHead {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = super::read_artifact(path)?;
        Self::from_json_str(&text)
            .map_err(|e| AppError::model(format!("{}: {}", path.display(), e.message())))
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let file: FusionModelFile = serde_json::from_str(text)
            .map_err(|e| AppError::model(format!("invalid fusion model JSON: {e}")))?;
        let stack = DenseStack::from_specs(&file.layers, FUSION_INPUT_DIM, "fusion head")?;
        Ok(Self { stack })
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn predict(&self, point_prediction: f64, sequence_prediction: f64) -> f64 {
        self.stack
            .forward_scalar(DVector::from_vec(vec![point_prediction, sequence_prediction]))
    }
}
