use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::initialization::WeightInit;
use crate::activations::Activation;

/// A fully connected (dense) layer.
///
/// `forward_batch` caches its inputs and pre-activation output for the next
/// `backward_batch`; `predict_batch` is the cache-free variant used for
/// inference and target estimates.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// New layer initialized with the strategy recommended for `activation`.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        Self::new_with_init(input_size, output_size, activation, WeightInit::for_activation(activation), rng)
    }

    pub fn new_with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        DenseLayer {
            weights: init.initialize_weights((input_size, output_size), rng),
            biases: init.initialize_biases(output_size),
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Gradients for this layer given the error at its output.
    ///
    /// Returns `(error at the input, weight gradients, bias gradients)`, or
    /// `None` when no forward pass has been cached.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Option<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let pre_activation = self.pre_activation_output.as_ref()?;
        let inputs = self.inputs.as_ref()?;

        let adjusted_error = &output_errors * &self.activation.derivative_batch(pre_activation.view());
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_error = adjusted_error.dot(&self.weights.t());

        Some((input_error, weight_gradients, bias_gradients))
    }

    /// Drop cached activations.
    pub fn clear_cache(&mut self) {
        self.inputs = None;
        self.pre_activation_output = None;
    }
}
