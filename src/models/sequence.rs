//! Recurrent sequence model over the last ten enriched events.
//!
//! The artifact is a JSON export of a single LSTM layer followed by a dense head:
//!
//! ```json
//! {
//!   "sequence_length": 10,
//!   "input_dim": 6,
//!   "lstm": { "units": U, "kernel": [[..4U..]; 6], "recurrent_kernel": [[..4U..]; U], "bias": [..4U..] },
//!   "head": [ { "kernel": [[..]], "bias": [..], "activation": "relu" }, ... ]
//! }
//! ```
//!
//! Gate blocks inside the `4U` axis follow the Keras order: input, forget, cell, output.

use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::error::AppError;
use crate::features::schema::{SEQUENCE_FIELD_COUNT, SEQUENCE_LENGTH, SequenceWindow};
use crate::models::dense::{DenseSpec, DenseStack, ensure_finite, matrix_from_rows, sigmoid};

#[derive(Debug, Deserialize)]
struct SequenceModelFile {
    sequence_length: usize,
    input_dim: usize,
    lstm: LstmSpec,
    head: Vec<DenseSpec>,
}

#[derive(Debug, Deserialize)]
struct LstmSpec {
    units: usize,
    kernel: Vec<Vec<f64>>,
    recurrent_kernel: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

#[derive(Debug, Clone)]
struct LstmCell {
    units: usize,
    /// `4U × input`
    input_weights: DMatrix<f64>,
    /// `4U × U`
    recurrent_weights: DMatrix<f64>,
    bias: DVector<f64>,
}

impl LstmCell {
    fn from_spec(spec: &LstmSpec, input_dim: usize) -> Result<Self, AppError> {
        let units = spec.units;
        if units == 0 {
            return Err(AppError::model("sequence model: lstm has zero units."));
        }
        let gates = 4 * units;
        let kernel = matrix_from_rows(&spec.kernel, input_dim, gates, "lstm kernel")?;
        let recurrent = matrix_from_rows(&spec.recurrent_kernel, units, gates, "lstm recurrent_kernel")?;
        if spec.bias.len() != gates {
            return Err(AppError::model(format!(
                "lstm bias: expected {gates} entries, found {}.",
                spec.bias.len()
            )));
        }
        ensure_finite(spec.bias.iter(), "lstm bias")?;

        Ok(Self {
            units,
            input_weights: kernel.transpose(),
            recurrent_weights: recurrent.transpose(),
            bias: DVector::from_column_slice(&spec.bias),
        })
    }

    /// Run the cell over all steps and return the final hidden state.
    fn run(&self, window: &SequenceWindow) -> DVector<f64> {
        let u = self.units;
        let mut h: DVector<f64> = DVector::zeros(u);
        let mut c: DVector<f64> = DVector::zeros(u);
        for step in window {
            let x = DVector::from_column_slice(step.as_array().as_slice());
            let z = &self.input_weights * x + &self.recurrent_weights * &h + &self.bias;

            let i = z.rows(0, u).map(sigmoid);
            let f = z.rows(u, u).map(sigmoid);
            let g = z.rows(2 * u, u).map(f64::tanh);
            let o = z.rows(3 * u, u).map(sigmoid);

            c = f.component_mul(&c) + i.component_mul(&g);
            h = o.component_mul(&c.map(f64::tanh));
        }
        h
    }
}

/// LSTM + dense head predicting the next magnitude from a [`SequenceWindow`].
#[derive(Debug, Clone)]
pub struct SequenceModel {
    cell: LstmCell,
    head: DenseStack,
}

impl SequenceModel {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = super::read_artifact(path)?;
        Self::from_json_str(&text)
            .map_err(|e| AppError::model(format!("{}: {}", path.display(), e.message())))
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let file: SequenceModelFile = serde_json::from_str(text)
            .map_err(|e| AppError::model(format!("invalid sequence model JSON: {e}")))?;
        if file.sequence_length != SEQUENCE_LENGTH || file.input_dim != SEQUENCE_FIELD_COUNT {
            return Err(AppError::model(format!(
                "sequence model expects {}×{} input, this build feeds {SEQUENCE_LENGTH}×{SEQUENCE_FIELD_COUNT}.",
                file.sequence_length, file.input_dim
            )));
        }
        let cell = LstmCell::from_spec(&file.lstm, file.input_dim)?;
        let head = DenseStack::from_specs(&file.head, cell.units, "sequence head")?;
        Ok(Self { cell, head })
    }

    pub fn units(&self) -> usize {
        self.cell.units
    }

    pub fn predict(&self, window: &SequenceWindow) -> f64 {
        self.head.forward_scalar(self.cell.run(window))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::schema::SequenceStep;

    /// One unit whose cell input reads only the magnitude column (index 3).
    ///
    /// Input and output gates have a large bias (saturated open), the forget gate a large
    /// negative bias (saturated closed), so `h ≈ tanh(tanh(magnitude))` of the last step.
    pub(crate) fn last_magnitude_model() -> String {
        let mut kernel = vec![vec![0.0; 4]; 6];
        kernel[3][2] = 1.0;
        serde_json::json!({
            "sequence_length": 10,
            "input_dim": 6,
            "lstm": {
                "units": 1,
                "kernel": kernel,
                "recurrent_kernel": [[0.0, 0.0, 0.0, 0.0]],
                "bias": [40.0, -40.0, 0.0, 40.0]
            },
            "head": [{ "kernel": [[2.0]], "bias": [1.0] }]
        })
        .to_string()
    }

    pub(crate) fn window_with_last_magnitude(mag: f64) -> SequenceWindow {
        std::array::from_fn(|i| {
            let m = if i == SEQUENCE_LENGTH - 1 { mag } else { 9.0 };
            SequenceStep::new(28.6, 77.2, 10.0, m, 1.0, 4)
        })
    }

    #[test]
    fn final_hidden_state_drives_the_head() {
        let model = SequenceModel::from_json_str(&last_magnitude_model()).unwrap();
        assert_eq!(model.units(), 1);
        let out = model.predict(&window_with_last_magnitude(0.5));
        let expected = 1.0 + 2.0 * 0.5_f64.tanh().tanh();
        assert!((out - expected).abs() < 1e-9, "{out} vs {expected}");
    }

    #[test]
    fn zero_weights_give_head_bias() {
        let json = serde_json::json!({
            "sequence_length": 10,
            "input_dim": 6,
            "lstm": {
                "units": 2,
                "kernel": vec![vec![0.0; 8]; 6],
                "recurrent_kernel": vec![vec![0.0; 8]; 2],
                "bias": vec![0.0; 8]
            },
            "head": [{ "kernel": [[1.0], [1.0]], "bias": [3.3] }]
        })
        .to_string();
        let model = SequenceModel::from_json_str(&json).unwrap();
        assert!((model.predict(&window_with_last_magnitude(4.0)) - 3.3).abs() < 1e-12);
    }

    #[test]
    fn wrong_window_shape_is_corrupt() {
        let json = last_magnitude_model().replace("\"sequence_length\":10", "\"sequence_length\":20");
        let err = SequenceModel::from_json_str(&json).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MODEL);
    }

    #[test]
    fn head_width_must_match_units() {
        let json = last_magnitude_model().replace("[[2.0]]", "[[2.0],[1.0]]");
        assert!(SequenceModel::from_json_str(&json).is_err());
    }
}
