pub mod gradient_clipper;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::layers::DenseLayer;

pub use gradient_clipper::GradientClipper;

/// Applies one layer's gradients to its parameters.
pub trait Optimizer {
    fn update_layer(
        &mut self,
        layer_index: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_gradients: &Array2<f32>,
        bias_gradients: &Array1<f32>,
        learning_rate: f32,
    );

    /// Called once after every layer of a step has been updated.
    fn finish_step(&mut self) {}
}

/// Optimizer choice in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    pub fn for_layers(kind: OptimizerKind, layers: &[DenseLayer]) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default(layers)),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_layer(
        &mut self,
        layer_index: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_gradients: &Array2<f32>,
        bias_gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_layer(
                layer_index, weights, biases, weight_gradients, bias_gradients, learning_rate,
            ),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_layer(
                layer_index, weights, biases, weight_gradients, bias_gradients, learning_rate,
            ),
        }
    }

    fn finish_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.finish_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.finish_step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_layer(
        &mut self,
        _layer_index: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_gradients: &Array2<f32>,
        bias_gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        weights.zip_mut_with(weight_gradients, |w, &g| *w -= learning_rate * g);
        biases.zip_mut_with(bias_gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with first/second moment estimates kept per layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Completed steps plus one; drives bias correction.
    pub t: usize,
}

impl Adam {
    pub fn new(layers: &[DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            v_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            m_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
            v_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
            t: 1,
        }
    }

    pub fn default(layers: &[DenseLayer]) -> Self {
        Self::new(layers, 0.9, 0.999, 1e-8)
    }

    fn ensure_layer(&mut self, index: usize, weight_dim: (usize, usize), bias_dim: usize) {
        while self.m_weights.len() <= index {
            self.m_weights.push(Array2::zeros((0, 0)));
            self.v_weights.push(Array2::zeros((0, 0)));
            self.m_biases.push(Array1::zeros(0));
            self.v_biases.push(Array1::zeros(0));
        }
        if self.m_weights[index].dim() != weight_dim {
            self.m_weights[index] = Array2::zeros(weight_dim);
            self.v_weights[index] = Array2::zeros(weight_dim);
        }
        if self.m_biases[index].len() != bias_dim {
            self.m_biases[index] = Array1::zeros(bias_dim);
            self.v_biases[index] = Array1::zeros(bias_dim);
        }
    }
}

impl Optimizer for Adam {
    fn update_layer(
        &mut self,
        layer_index: usize,
        weights: &mut Array2<f32>,
        biases: &mut Array1<f32>,
        weight_gradients: &Array2<f32>,
        bias_gradients: &Array1<f32>,
        learning_rate: f32,
    ) {
        self.ensure_layer(layer_index, weights.dim(), biases.len());
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - beta1.powi(self.t as i32);
        let correction2 = 1.0 - beta2.powi(self.t as i32);

        let m = &mut self.m_weights[layer_index];
        let v = &mut self.v_weights[layer_index];
        m.zip_mut_with(weight_gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(weight_gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
        ndarray::Zip::from(&mut *weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| {
                *w -= learning_rate * (m / correction1) / ((v / correction2).sqrt() + eps);
            });

        let m = &mut self.m_biases[layer_index];
        let v = &mut self.v_biases[layer_index];
        m.zip_mut_with(bias_gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(bias_gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
        ndarray::Zip::from(&mut *biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| {
                *b -= learning_rate * (m / correction1) / ((v / correction2).sqrt() + eps);
            });
    }

    fn finish_step(&mut self) {
        self.t += 1;
    }
}
