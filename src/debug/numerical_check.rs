use ndarray::{ArrayBase, Data, Dimension};
use tracing::warn;

use crate::layers::DenseLayer;

/// Types of numerical issues
#[derive(Debug, Clone, PartialEq)]
pub enum NumericalIssue {
    NaN { layer: usize, count: usize },
    Infinity { layer: usize, count: usize },
}

/// Count NaN and infinite entries of any array.
pub fn check_values<S, D>(values: &ArrayBase<S, D>) -> (usize, usize)
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    values.iter().fold((0, 0), |(nan, inf), &v| {
        if v.is_nan() {
            (nan + 1, inf)
        } else if v.is_infinite() {
            (nan, inf + 1)
        } else {
            (nan, inf)
        }
    })
}

/// Check every layer's weights and biases for NaN or infinite values.
pub fn check_layers(layers: &[DenseLayer]) -> Vec<NumericalIssue> {
    let mut issues = Vec::new();

    for (layer, dense) in layers.iter().enumerate() {
        let (w_nan, w_inf) = check_values(&dense.weights);
        let (b_nan, b_inf) = check_values(&dense.biases);
        let nan_count = w_nan + b_nan;
        let inf_count = w_inf + b_inf;

        if nan_count > 0 {
            warn!(layer, count = nan_count, "NaN values in layer parameters");
            issues.push(NumericalIssue::NaN { layer, count: nan_count });
        }
        if inf_count > 0 {
            warn!(layer, count = inf_count, "infinite values in layer parameters");
            issues.push(NumericalIssue::Infinity { layer, count: inf_count });
        }
    }

    issues
}
