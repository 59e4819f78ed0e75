use ndarray::{arr1, arr2, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::debug::NumericalIssue;
use crate::error::RaceError;
use crate::loss::LossKind;
use crate::network::NeuralNetwork;
use crate::optimizer::{GradientClipper, OptimizerKind};

fn network(optimizer: OptimizerKind) -> NeuralNetwork {
    let mut rng = StdRng::seed_from_u64(3);
    NeuralNetwork::new(&[3, 8, 2], &[Activation::Relu, Activation::Linear], optimizer, &mut rng).unwrap()
}

#[test]
fn test_neural_network_creation() {
    let network = network(OptimizerKind::Sgd);
    assert_eq!(network.layers.len(), 2);
    assert_eq!(network.layers[0].weights.shape(), [3, 8]);
    assert_eq!(network.layers[1].weights.shape(), [8, 2]);
    assert_eq!(network.layer_sizes(), vec![3, 8, 2]);
    assert_eq!(network.input_size(), 3);
    assert_eq!(network.output_size(), 2);
}

#[test]
fn test_invalid_construction() {
    let mut rng = StdRng::seed_from_u64(0);
    assert!(NeuralNetwork::new(&[3], &[], OptimizerKind::Sgd, &mut rng).is_err());
    assert!(matches!(
        NeuralNetwork::new(&[3, 4, 2], &[Activation::Relu], OptimizerKind::Sgd, &mut rng),
        Err(RaceError::DimensionMismatch { .. })
    ));
    assert!(NeuralNetwork::new(&[3, 0, 2], &[Activation::Relu, Activation::Linear], OptimizerKind::Sgd, &mut rng).is_err());
}

#[test]
fn test_predict_shapes() {
    let network = network(OptimizerKind::Adam);
    let single = network.predict(arr1(&[1.0, 2.0, 3.0]).view()).unwrap();
    assert_eq!(single.len(), 2);

    let batch = network
        .predict_batch(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).view())
        .unwrap();
    assert_eq!(batch.shape(), [2, 2]);
    assert_eq!(batch.row(0), single);

    assert!(matches!(
        network.predict(arr1(&[1.0, 2.0]).view()),
        Err(RaceError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_train_minibatch_reduces_loss() {
    for optimizer in [OptimizerKind::Sgd, OptimizerKind::Adam] {
        let mut network = network(optimizer).with_loss(LossKind::Mse);
        let mut rng = StdRng::seed_from_u64(9);
        let inputs = arr2(&[[0.5, -0.2, 0.1], [0.1, 0.4, -0.3], [-0.5, 0.2, 0.6]]);
        let targets = arr2(&[[1.0, -1.0], [0.5, 0.0], [-0.5, 1.0]]);

        let first = network
            .train_minibatch(inputs.view(), targets.view(), 0.01, &mut rng)
            .unwrap();
        let mut last = first;
        for _ in 0..500 {
            last = network
                .train_minibatch(inputs.view(), targets.view(), 0.01, &mut rng)
                .unwrap();
        }
        assert!(last < first, "{:?}: loss {} did not drop below {}", optimizer, last, first);
    }
}

#[test]
fn test_train_minibatch_checks_targets() {
    let mut network = network(OptimizerKind::Sgd);
    let mut rng = StdRng::seed_from_u64(1);
    let inputs = Array2::zeros((2, 3));
    let targets = Array2::zeros((2, 3));
    assert!(network
        .train_minibatch(inputs.view(), targets.view(), 0.01, &mut rng)
        .is_err());
}

#[test]
fn test_non_finite_loss_is_rejected() {
    let mut network = network(OptimizerKind::Sgd);
    let before = network.layers[0].weights.clone();
    let mut rng = StdRng::seed_from_u64(1);
    let inputs = arr2(&[[1.0, 1.0, 1.0]]);
    let targets = arr2(&[[f32::NAN, 0.0]]);

    assert!(matches!(
        network.train_minibatch(inputs.view(), targets.view(), 0.01, &mut rng),
        Err(RaceError::Numerical(_))
    ));
    assert_eq!(network.layers[0].weights, before);
}

#[test]
fn test_numerical_issues_detected() {
    let mut network = network(OptimizerKind::Sgd);
    assert!(network.is_finite());
    assert!(network.numerical_issues().is_empty());

    network.layers[1].weights[[0, 0]] = f32::NAN;
    network.layers[1].biases[0] = f32::INFINITY;
    assert!(!network.is_finite());
    let issues = network.numerical_issues();
    assert!(issues.contains(&NumericalIssue::NaN { layer: 1, count: 1 }));
    assert!(issues.contains(&NumericalIssue::Infinity { layer: 1, count: 1 }));
}

#[test]
fn test_copy_weights() {
    let mut a = network(OptimizerKind::Sgd);
    let mut rng = StdRng::seed_from_u64(77);
    let b = NeuralNetwork::new(&[3, 8, 2], &[Activation::Relu, Activation::Linear], OptimizerKind::Sgd, &mut rng).unwrap();

    a.copy_weights_from(&b).unwrap();
    assert_eq!(a.layers[0].weights, b.layers[0].weights);
    assert_eq!(a.layers[1].biases, b.layers[1].biases);

    let other_shape = NeuralNetwork::new(&[3, 4, 2], &[Activation::Relu, Activation::Linear], OptimizerKind::Sgd, &mut rng).unwrap();
    assert!(a.copy_weights_from(&other_shape).is_err());
}

#[test]
fn test_serialization_round_trip() {
    let network = network(OptimizerKind::Adam)
        .with_clipper(GradientClipper::from_max_norm(Some(5.0)))
        .with_dropout(0.2);
    let bytes = network.to_bytes().unwrap();
    let restored = NeuralNetwork::from_bytes(&bytes).unwrap();

    let input = arr1(&[0.3, -0.7, 1.2]);
    assert_eq!(
        network.predict(input.view()).unwrap(),
        restored.predict(input.view()).unwrap()
    );
    assert_eq!(restored.clipper, GradientClipper::ClipByGlobalNorm { max_norm: 5.0 });
    assert_eq!(restored.dropout_rate, 0.2);

    assert!(NeuralNetwork::from_bytes(&[1, 2, 3]).is_err());
}

#[test]
fn test_loss_functions() {
    let predictions = arr2(&[[1.0, 4.0]]);
    let targets = arr2(&[[0.0, 0.0]]);

    // (1 + 16) / (2 * 2)
    let mse = LossKind::Mse.compute_batch(predictions.view(), targets.view());
    assert!((mse - 4.25).abs() < 1e-6);

    // (0.5 + (4 - 0.5)) / 2
    let huber = LossKind::Huber { delta: 1.0 }.compute_batch(predictions.view(), targets.view());
    assert!((huber - 2.0).abs() < 1e-6);

    let grad = LossKind::Huber { delta: 1.0 }.gradient_batch(predictions.view(), targets.view());
    assert_eq!(grad, arr2(&[[1.0, 1.0]]));
    let grad = LossKind::Mse.gradient_batch(predictions.view(), targets.view());
    assert_eq!(grad, arr2(&[[1.0, 4.0]]));
}
