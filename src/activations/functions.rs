use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Activation applied to a layer's pre-activation output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation to a batch in place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match *self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    /// Derivative with respect to the pre-activation values.
    pub fn derivative_batch(&self, pre_activation: ArrayView2<f32>) -> Array2<f32> {
        match *self {
            Activation::Relu => pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(pre_activation.dim()),
        }
    }
}
