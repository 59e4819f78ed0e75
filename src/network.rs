use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::debug::{check_layers, check_values, NumericalIssue};
use crate::error::{RaceError, Result};
use crate::layers::{DenseLayer, Dropout};
use crate::loss::LossKind;
use crate::optimizer::{GradientClipper, Optimizer, OptimizerKind, OptimizerWrapper};

/// A feed-forward network of dense layers with its optimizer state.
///
/// Inference (`predict`, `predict_batch`) takes `&self` and never applies
/// dropout. `train_minibatch` runs one regression step towards a target batch.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub optimizer: OptimizerWrapper,
    pub loss: LossKind,
    pub clipper: GradientClipper,
    pub dropout_rate: f32,
}

impl NeuralNetwork {
    /// Create a network with the given layer sizes and one activation per layer.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        optimizer: OptimizerKind,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(RaceError::invalid_parameter(
                "layer_sizes",
                "need at least input and output sizes",
            ));
        }
        if activations.len() != layer_sizes.len() - 1 {
            return Err(RaceError::dimension_mismatch(
                format!("{} activations", layer_sizes.len() - 1),
                format!("{} activations", activations.len()),
            ));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(RaceError::invalid_parameter("layer_sizes", "sizes must be positive"));
        }

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| DenseLayer::new(window[0], window[1], activation, rng))
            .collect::<Vec<_>>();
        let optimizer = OptimizerWrapper::for_layers(optimizer, &layers);

        Ok(NeuralNetwork {
            layers,
            optimizer,
            loss: LossKind::default(),
            clipper: GradientClipper::None,
            dropout_rate: 0.0,
        })
    }

    pub fn with_loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_clipper(mut self, clipper: GradientClipper) -> Self {
        self.clipper = clipper;
        self
    }

    /// Dropout rate applied after every hidden layer while training.
    pub fn with_dropout(mut self, rate: f32) -> Self {
        self.dropout_rate = rate;
        self
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(DenseLayer::input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(DenseLayer::output_size).unwrap_or(0)
    }

    /// Layer sizes including input and output, e.g. `[17, 64, 64, 5]`.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.input_size()];
        sizes.extend(self.layers.iter().map(DenseLayer::output_size));
        sizes
    }

    pub fn predict(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        let output = self.predict_batch(input.insert_axis(Axis(0)))?;
        Ok(output.index_axis_move(Axis(0), 0))
    }

    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input_width(inputs.shape()[1])?;
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            current = layer.predict_batch(current.view());
        }
        Ok(current)
    }

    /// One gradient step of `loss(network(inputs), targets)`.
    ///
    /// Returns the loss measured before the update.
    pub fn train_minibatch<R: Rng + ?Sized>(
        &mut self,
        inputs: ArrayView2<f32>,
        targets: ArrayView2<f32>,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<f32> {
        self.check_input_width(inputs.shape()[1])?;
        if targets.dim() != (inputs.shape()[0], self.output_size()) {
            return Err(RaceError::dimension_mismatch(
                format!("targets {:?}", (inputs.shape()[0], self.output_size())),
                format!("targets {:?}", targets.dim()),
            ));
        }

        let dropout = Dropout::new(self.dropout_rate);
        let hidden = self.layers.len() - 1;
        let mut masks: Vec<Option<Array2<f32>>> = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            current = layer.forward_batch(current.view());
            if index < hidden && dropout.is_active() {
                let mask = dropout.sample_mask(current.view(), rng);
                current *= &mask;
                masks.push(Some(mask));
            } else {
                masks.push(None);
            }
        }

        let loss = self.loss.compute_batch(current.view(), targets);
        if !loss.is_finite() {
            self.clear_cache();
            return Err(RaceError::Numerical(format!("loss is {}", loss)));
        }

        let mut error = self.loss.gradient_batch(current.view(), targets);
        let mut weight_grads = Vec::with_capacity(self.layers.len());
        let mut bias_grads = Vec::with_capacity(self.layers.len());
        for (layer, mask) in self.layers.iter().zip(masks.iter()).rev() {
            if let Some(mask) = mask {
                error *= mask;
            }
            let (input_error, weight_gradients, bias_gradients) = layer
                .backward_batch(error.view())
                .ok_or_else(|| RaceError::Training("backward pass without cached forward pass".to_string()))?;
            weight_grads.push(weight_gradients);
            bias_grads.push(bias_gradients);
            error = input_error;
        }
        weight_grads.reverse();
        bias_grads.reverse();

        self.clipper.apply(&mut weight_grads, &mut bias_grads);

        for (index, (layer, (weight_gradients, bias_gradients))) in self
            .layers
            .iter_mut()
            .zip(weight_grads.iter().zip(bias_grads.iter()))
            .enumerate()
        {
            self.optimizer.update_layer(
                index,
                &mut layer.weights,
                &mut layer.biases,
                weight_gradients,
                bias_gradients,
                learning_rate,
            );
        }
        self.optimizer.finish_step();
        self.clear_cache();

        Ok(loss)
    }

    /// NaN/Inf entries in any layer's parameters.
    pub fn numerical_issues(&self) -> Vec<NumericalIssue> {
        check_layers(&self.layers)
    }

    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(|layer| {
            check_values(&layer.weights) == (0, 0) && check_values(&layer.biases) == (0, 0)
        })
    }

    /// Copy parameters from a network of identical shape.
    pub fn copy_weights_from(&mut self, other: &NeuralNetwork) -> Result<()> {
        if self.layer_sizes() != other.layer_sizes() {
            return Err(RaceError::dimension_mismatch(
                format!("{:?}", self.layer_sizes()),
                format!("{:?}", other.layer_sizes()),
            ));
        }
        for (dst, src) in self.layers.iter_mut().zip(other.layers.iter()) {
            dst.weights.assign(&src.weights);
            dst.biases.assign(&src.biases);
        }
        Ok(())
    }

    fn clear_cache(&mut self) {
        for layer in &mut self.layers {
            layer.clear_cache();
        }
    }

    fn check_input_width(&self, width: usize) -> Result<()> {
        if width != self.input_size() {
            return Err(RaceError::dimension_mismatch(
                format!("input width {}", self.input_size()),
                format!("input width {}", width),
            ));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Save the network, including optimizer state, to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
