use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming normal initialization (for ReLU)
    HeNormal,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix.
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Array2<f32> {
        let (fan_in, fan_out) = shape;

        match *self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), rng)
            }
            WeightInit::HeNormal => {
                let std = (2.0 / fan_in.max(1) as f32).sqrt();
                match Normal::new(0.0, std) {
                    Ok(dist) => Array2::random_using(shape, dist, rng),
                    Err(_) => Array2::zeros(shape),
                }
            }
        }
    }

    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }

    /// Recommended initialization for an activation function
    pub fn for_activation(activation: Activation) -> Self {
        match activation {
            Activation::Relu => WeightInit::HeNormal,
            Activation::Linear => WeightInit::XavierUniform,
        }
    }
}
