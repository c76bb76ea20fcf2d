use seqgrad::assert_approx_eq;
use seqgrad::autodiff::{Tape, gradient};
use seqgrad::layers::{ActivationKind, Dense, Layer};
use seqgrad::loss::{mean_absolute_error, mean_squared_error, sigmoid_cross_entropy, softmax_cross_entropy};
use seqgrad::optim::{Adam, Optimizer, Sgd};
use seqgrad::train::train_step;
use seqgrad::tensors::Tensor;
use seqgrad::{sequential, tensor};

fn xor_data() -> (Tensor<f32>, Tensor<f32>) {
    (
        tensor!([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]),
        tensor!([[0.0], [1.0], [1.0], [0.0]]),
    )
}

#[test]
fn test_loss_values() {
    let tape = Tape::new();
    let pred = tape.var(tensor!([[1.0, 2.0], [3.0, 4.0]]));
    let target: Tensor<f32> = tensor!([[1.0, 0.0], [5.0, 4.0]]);
    assert_approx_eq!(mean_squared_error(&pred, &target).value().scalarized(), 2.0, 1e-6);
    assert_approx_eq!(mean_absolute_error(&pred, &target).value().scalarized(), 1.0, 1e-6);

    let logits = tape.var(tensor!([0.0, 100.0, -100.0]));
    let bce = sigmoid_cross_entropy(&logits, &tensor!([1.0, 1.0, 0.0]));
    assert_approx_eq!(bce.value().scalarized(), 2.0_f32.ln() / 3.0, 1e-5);
}

#[test]
fn test_mean_squared_error_gradient() {
    let target: Tensor<f32> = tensor!([1.0, -1.0]);
    let grad = gradient(&tensor!([2.0, 1.0]), |p| mean_squared_error(p, &target));
    assert_approx_eq!(grad, tensor!([1.0, 2.0]), 1e-6);
}

#[test]
fn test_softmax_cross_entropy_gradient() {
    let labels = Tensor::from_vec(vec![2_i64, 0]);
    let logits: Tensor<f32> = tensor!([[1.0, 2.0, 3.0], [0.5, 0.5, 0.5]]);
    let grad = gradient(&logits, |l| softmax_cross_entropy(l, &labels));
    let expected = (logits.softmax(-1) - tensor!([[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]])) / 2.0;
    assert_approx_eq!(grad, expected, 1e-6);
}

#[test]
fn test_xor_with_sgd() {
    let (x, y) = xor_data();
    let mut model = sequential![
        Dense::new(2, 8, ActivationKind::Tanh, 3),
        Dense::new(8, 1, ActivationKind::Identity, 4),
    ];
    let mut sgd = Sgd::with_momentum(0.05, 0.5);

    let first = train_step(&mut model, &mut sgd, &x, &y, mean_squared_error);
    let mut last = first;
    for _ in 0..300 {
        last = train_step(&mut model, &mut sgd, &x, &y, mean_squared_error);
    }
    assert!(last.is_finite());
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_xor_with_adam() {
    let (x, y) = xor_data();
    let mut model = sequential![
        Dense::new(2, 8, ActivationKind::Tanh, 5),
        Dense::new(8, 1, ActivationKind::Sigmoid, 6),
    ];
    let mut adam = Adam::new(0.05);

    let first = train_step(&mut model, &mut adam, &x, &y, mean_squared_error);
    let mut last = first;
    for _ in 0..300 {
        last = train_step(&mut model, &mut adam, &x, &y, mean_squared_error);
    }
    assert_eq!(adam.step(), 301);
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_linear_classifier_separates_clusters() {
    let x: Tensor<f32> = tensor!([
        [-2.0, -1.0],
        [-1.0, -2.0],
        [-1.5, -1.5],
        [2.0, 1.0],
        [1.0, 2.0],
        [1.5, 1.5]
    ]);
    let labels = Tensor::from_vec(vec![0_i64, 0, 0, 1, 1, 1]);
    let mut model = Dense::new(2, 2, ActivationKind::Identity, 7);
    let mut sgd = Sgd::new(0.5);

    let first = train_step(&mut model, &mut sgd, &x, &labels, softmax_cross_entropy);
    let mut last = first;
    for _ in 0..100 {
        last = train_step(&mut model, &mut sgd, &x, &labels, softmax_cross_entropy);
    }
    assert!(last < first);
    assert_eq!(model.forward(&x).argmax_squeezing(1), labels);
}

#[test]
fn test_adam_first_step_moves_by_the_learning_rate() {
    let mut p = tensor!([1.0, -1.0, 0.0]);
    let grads = [tensor!([0.5, -3.0, 0.0])];
    let mut adam = Adam::new(0.01);
    adam.update(vec![&mut p], &grads);
    assert_approx_eq!(p, tensor!([0.99, -0.99, 0.0]), 1e-5);
}

#[test]
fn test_plain_sgd_step() {
    let mut w = tensor!([[1.0, 2.0]]);
    let mut b = tensor!([0.5]);
    let mut sgd = Sgd::new(0.1);
    sgd.update(vec![&mut w, &mut b], &[tensor!([[1.0, -1.0]]), tensor!([2.0])]);
    assert_approx_eq!(w, tensor!([[0.9, 2.1]]), 1e-6);
    assert_approx_eq!(b, tensor!([0.3]), 1e-6);
}

#[test]
#[should_panic(expected = "expected one gradient per parameter")]
fn test_gradient_count_must_match() {
    let mut p = tensor!([1.0]);
    Sgd::new(0.1).update(vec![&mut p], &[]);
}
