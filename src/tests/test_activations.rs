use ndarray::array;
use crate::activations::Activation;

#[test]
fn test_relu_activation() {
    let relu = Activation::Relu;
    let mut input = array![[-1.0, 0.0, 1.0, 2.0]];
    relu.apply_batch(&mut input);
    assert_eq!(input, array![[0.0, 0.0, 1.0, 2.0]]);
}

#[test]
fn test_linear_is_identity() {
    let mut input = array![[-3.5, 0.0, 7.25]];
    Activation::Linear.apply_batch(&mut input);
    assert_eq!(input, array![[-3.5, 0.0, 7.25]]);

    let derivative = Activation::Linear.derivative_batch(input.view());
    assert_eq!(derivative, array![[1.0, 1.0, 1.0]]);
}

#[test]
fn test_derivatives() {
    let pre = array![[-2.0, 0.0, 3.0]];

    let relu = Activation::Relu.derivative_batch(pre.view());
    assert_eq!(relu, array![[0.0, 0.0, 1.0]]);
}

#[test]
fn test_large_values_stay_finite() {
    for activation in [Activation::Relu, Activation::Linear] {
        let mut input = array![[1e10, -1e10, f32::MAX / 2.0]];
        activation.apply_batch(&mut input);
        assert!(
            input.iter().all(|v| v.is_finite()),
            "Activation {:?} produced non-finite value",
            activation
        );
    }
}
