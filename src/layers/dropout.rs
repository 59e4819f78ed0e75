use ndarray::{Array2, ArrayView2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Bernoulli;

/// Inverted dropout for one hidden activation batch.
///
/// Active only during training; inference never builds a mask. Kept units are
/// scaled by `1 / (1 - rate)` so expected activations match inference.
#[derive(Clone, Debug)]
pub struct Dropout {
    pub rate: f32,
}

impl Dropout {
    pub fn new(rate: f32) -> Self {
        Dropout { rate: rate.clamp(0.0, 0.99) }
    }

    pub fn is_active(&self) -> bool {
        self.rate > 0.0
    }

    /// Sample a mask with the shape of `activations`.
    pub fn sample_mask<R: Rng + ?Sized>(&self, activations: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        let scale = 1.0 / (1.0 - self.rate);
        let keep = match Bernoulli::new(f64::from(1.0 - self.rate)) {
            Ok(keep) => keep,
            Err(_) => return Array2::ones(activations.dim()),
        };
        Array2::random_using(activations.dim(), keep, rng).mapv(|kept| if kept { scale } else { 0.0 })
    }
}
