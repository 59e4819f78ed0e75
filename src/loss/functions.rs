use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Regression loss for the Q-value fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LossKind {
    /// Mean squared error, `sum(diff^2) / (2 * n)`.
    Mse,
    /// Huber loss (smooth L1): quadratic inside `delta`, linear outside.
    Huber { delta: f32 },
}

impl Default for LossKind {
    fn default() -> Self {
        LossKind::Huber { delta: 1.0 }
    }
}

impl LossKind {
    /// Mean loss over every element of the batch.
    pub fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let diff = &predictions - &targets;
        let count = diff.len().max(1) as f32;
        match *self {
            LossKind::Mse => diff.mapv(|x| x * x).sum() / (2.0 * count),
            LossKind::Huber { delta } => {
                diff.mapv(|x| {
                    let abs_x = x.abs();
                    if abs_x <= delta {
                        0.5 * x * x
                    } else {
                        delta * abs_x - 0.5 * delta * delta
                    }
                })
                .sum()
                    / count
            }
        }
    }

    /// Gradient of the loss with respect to the predictions, averaged over the batch.
    pub fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let diff = &predictions - &targets;
        let batch_size = predictions.shape()[0].max(1) as f32;
        match *self {
            LossKind::Mse => diff / batch_size,
            LossKind::Huber { delta } => {
                diff.mapv(|x| if x.abs() <= delta { x } else { delta * x.signum() }) / batch_size
            }
        }
    }
}
