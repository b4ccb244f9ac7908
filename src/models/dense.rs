//! Fully connected layers.
//!
//! Weights are stored the way Keras exports them: `kernel` is `input × output`,
//! `bias` has one entry per output. Internally the kernel is transposed once at load
//! time so the forward pass is a plain matrix-vector product.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Serialized form of one dense layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseSpec {
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone)]
pub struct DenseLayer {
    /// `output × input`
    weights: DMatrix<f64>,
    bias: DVector<f64>,
    activation: Activation,
}

impl DenseLayer {
    pub fn from_spec(spec: &DenseSpec, context: &str) -> Result<Self, AppError> {
        let inputs = spec.kernel.len();
        let outputs = spec.kernel.first().map_or(0, Vec::len);
        if inputs == 0 || outputs == 0 {
            return Err(AppError::model(format!("{context}: empty kernel.")));
        }
        let kernel = matrix_from_rows(&spec.kernel, inputs, outputs, context)?;
        if spec.bias.len() != outputs {
            return Err(AppError::model(format!(
                "{context}: bias has {} entries, kernel has {outputs} outputs.",
                spec.bias.len()
            )));
        }
        ensure_finite(spec.bias.iter(), context)?;

        Ok(Self {
            weights: kernel.transpose(),
            bias: DVector::from_column_slice(&spec.bias),
            activation: spec.activation,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn forward(&self, x: &DVector<f64>) -> DVector<f64> {
        let activation = self.activation;
        (&self.weights * x + &self.bias).map(|v| activation.apply(v))
    }
}

/// A chain of dense layers with a fixed input width and a single scalar output.
#[derive(Debug, Clone)]
pub struct DenseStack {
    layers: Vec<DenseLayer>,
}

impl DenseStack {
    pub fn from_specs(specs: &[DenseSpec], input_dim: usize, context: &str) -> Result<Self, AppError> {
        if specs.is_empty() {
            return Err(AppError::model(format!("{context}: no dense layers.")));
        }
        let mut layers = Vec::with_capacity(specs.len());
        let mut width = input_dim;
        for (i, spec) in specs.iter().enumerate() {
            let layer = DenseLayer::from_spec(spec, &format!("{context} layer {i}"))?;
            if layer.input_dim() != width {
                return Err(AppError::model(format!(
                    "{context} layer {i}: expects {} inputs, previous width is {width}.",
                    layer.input_dim()
                )));
            }
            width = layer.output_dim();
            layers.push(layer);
        }
        if width != 1 {
            return Err(AppError::model(format!(
                "{context}: final layer must have 1 output, has {width}."
            )));
        }
        Ok(Self { layers })
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_dim)
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Run the stack and return its single output.
    pub fn forward_scalar(&self, x: DVector<f64>) -> f64 {
        let out = self.layers.iter().fold(x, |acc, layer| layer.forward(&acc));
        out[0]
    }
}

/// Build an `rows × cols` matrix from nested rows, rejecting ragged or non-finite input.
pub(crate) fn matrix_from_rows(
    data: &[Vec<f64>],
    rows: usize,
    cols: usize,
    context: &str,
) -> Result<DMatrix<f64>, AppError> {
    if data.len() != rows {
        return Err(AppError::model(format!(
            "{context}: expected {rows} rows, found {}.",
            data.len()
        )));
    }
    if let Some((i, row)) = data.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(AppError::model(format!(
            "{context}: row {i} has {} columns, expected {cols}.",
            row.len()
        )));
    }
    ensure_finite(data.iter().flatten(), context)?;
    Ok(DMatrix::from_fn(rows, cols, |r, c| data[r][c]))
}

pub(crate) fn ensure_finite<'a>(
    mut values: impl Iterator<Item = &'a f64>,
    context: &str,
) -> Result<(), AppError> {
    if values.any(|v| !v.is_finite()) {
        return Err(AppError::model(format!("{context}: non-finite weight.")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kernel: Vec<Vec<f64>>, bias: Vec<f64>, activation: Activation) -> DenseSpec {
        DenseSpec {
            kernel,
            bias,
            activation,
        }
    }

    #[test]
    fn forward_uses_input_by_output_kernel() {
        // 2 inputs -> 3 outputs
        let layer = DenseLayer::from_spec(
            &spec(
                vec![vec![1.0, 0.0, -1.0], vec![2.0, 1.0, 0.5]],
                vec![0.0, 1.0, 0.0],
                Activation::Linear,
            ),
            "test",
        )
        .unwrap();
        let y = layer.forward(&DVector::from_vec(vec![1.0, 2.0]));
        assert_eq!(y.as_slice(), &[5.0, 3.0, 0.0]);
    }

    #[test]
    fn relu_clips_negative() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(1.5), 1.5);
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stack_checks_widths_and_scalar_output() {
        let hidden = spec(vec![vec![1.0, -1.0], vec![1.0, 1.0]], vec![0.0, 0.0], Activation::Relu);
        let out = spec(vec![vec![1.0], vec![1.0]], vec![0.5], Activation::Linear);
        let stack = DenseStack::from_specs(&[hidden.clone(), out], 2, "fusion").unwrap();
        // hidden: [x0 + x1, -x0 + x1] = [5, -1] -> relu [5, 0]; out = 5.5
        assert_eq!(stack.forward_scalar(DVector::from_vec(vec![3.0, 2.0])), 5.5);

        assert!(DenseStack::from_specs(&[hidden.clone()], 2, "fusion").is_err());
        assert!(DenseStack::from_specs(&[hidden], 3, "fusion").is_err());
    }

    #[test]
    fn ragged_kernel_is_rejected() {
        let bad = spec(vec![vec![1.0, 2.0], vec![1.0]], vec![0.0, 0.0], Activation::Linear);
        let err = DenseLayer::from_spec(&bad, "bad").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_MODEL);
    }

    #[test]
    fn activation_defaults_to_linear_in_json() {
        let spec: DenseSpec = serde_json::from_str(r#"{"kernel":[[1.0]],"bias":[0.0]}"#).unwrap();
        assert_eq!(spec.activation, Activation::Linear);
    }
}
