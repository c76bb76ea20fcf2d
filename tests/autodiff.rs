use seqgrad::approx::ApproxEq as _;
use seqgrad::assert_approx_eq;
use seqgrad::autodiff::{Tape, Var, gradient, gradient2, value_with_gradient, value_with_gradient2};
use seqgrad::tensors::Tensor;

/// Central finite differences of a scalar function, one element at a time.
fn numerical_gradient(x: &Tensor<f32>, f: impl Fn(&Tensor<f32>) -> f32) -> Tensor<f32> {
    let eps = 1e-2_f32;
    let grads = (0..x.len())
        .map(|i| {
            let mut plus = x.clone();
            plus.data_mut()[i] += eps;
            let mut minus = x.clone();
            minus.data_mut()[i] -= eps;
            (f(&plus) - f(&minus)) / (2.0 * eps)
        })
        .collect();
    Tensor::new(x.shape().to_vec(), grads)
}

fn check_against_finite_differences(name: &str, f: fn(&Var) -> Var) {
    let x = Tensor::random_normal(vec![3, 4], 3) * 0.5;
    let analytic = gradient(&x, f);
    let numeric = numerical_gradient(&x, |t| {
        let tape = Tape::new();
        f(&tape.var(t.clone())).value().scalarized()
    });
    assert!(
        analytic.within(&numeric, 2e-3),
        "{name}: analytic {analytic:?}, numeric {numeric:?}"
    );
}

#[test]
fn test_smooth_ops_match_finite_differences() {
    check_against_finite_differences("exp", |x| x.exp().sum());
    check_against_finite_differences("sin", |x| x.sin().sum());
    check_against_finite_differences("cos", |x| x.cos().sum());
    check_against_finite_differences("tanh", |x| x.tanh().sum());
    check_against_finite_differences("sigmoid", |x| x.sigmoid().sum());
    check_against_finite_differences("softplus", |x| x.softplus().sum());
    check_against_finite_differences("gelu", |x| x.gelu().sum());
    check_against_finite_differences("elu", |x| ((x.clone() - 3.0).elu() + (x.clone() + 3.0).elu()).sum());
    check_against_finite_differences("squared", |x| x.squared().mean());
    check_against_finite_differences("log", |x| (x.squared() + 1.0).log().sum());
    check_against_finite_differences("sqrt", |x| (x.squared() + 1.0).sqrt().sum());
    check_against_finite_differences("powf", |x| (x.squared() + 1.0).powf(1.5).sum());
    check_against_finite_differences("div", |x| (1.0_f32 / (x.squared() + 2.0)).sum());
    check_against_finite_differences("mean_along", |x| x.tanh().mean_along(&[1]).squared().sum());
    check_against_finite_differences("sum_squeezing", |x| (x.sum_squeezing(&[0]) * x.sum_squeezing(&[0])).sum());
    check_against_finite_differences("transposed", |x| x.transposed().matmul(x).sin().sum());
    check_against_finite_differences("reshaped", |x| x.reshaped(vec![2, 6]).exp().sum_along(&[0]).log().sum());
    check_against_finite_differences("log_softmax", |x| {
        let weights = x.lift(Tensor::range(0.0, 12.0, 1.0).reshaped(vec![3, 4]));
        (x.log_softmax(-1) * weights).sum()
    });
}

#[test]
fn test_broadcasted_add_gradient() {
    let x = Tensor::ones(vec![1, 2, 1, 4]);
    let y = Tensor::ones(vec![4, 1, 3, 1]);
    let (dx, dy) = gradient2(&x, &y, |x, y| (x + y).sum());
    assert_eq!(x.shape(), dx.shape());
    assert_eq!(y.shape(), dy.shape());
    assert!(dx.data().iter().all(|&g| g == 12.0));
    assert!(dy.data().iter().all(|&g| g == 8.0));
}

#[test]
fn test_sum_of_squares_gradient() {
    let x = Tensor::from_vec(vec![1.0_f32, -2.0, 3.5]);
    let (value, grad) = value_with_gradient(&x, |x| x.squared().sum());
    assert_approx_eq!(value.scalarized(), 17.25, 1e-6);
    assert_approx_eq!(grad, Tensor::from_vec(vec![2.0, -4.0, 7.0]), 1e-6);
}

#[test]
fn test_matmul_gradient() {
    let a = Tensor::random_normal(vec![2, 3], 7);
    let b = Tensor::random_normal(vec![3, 4], 8);
    let (value, (da, db)) = value_with_gradient2(&a, &b, |a, b| a.matmul(b).sum());

    assert_approx_eq!(value, a.matmul(&b).sum(), 1e-4);
    assert_approx_eq!(da, Tensor::ones(vec![2, 4]).matmul(&b.transposed()), 1e-5);
    assert_approx_eq!(db, a.transposed().matmul(&Tensor::ones(vec![2, 4])), 1e-5);
}

#[test]
fn test_batched_matmul_gradient_reduces_broadcast_batch() {
    let a = Tensor::random_normal(vec![3, 2, 4], 1);
    let w = Tensor::random_normal(vec![4, 5], 2);
    let (da, dw) = gradient2(&a, &w, |a, w| a.matmul(w).sum());
    assert_eq!(da.shape(), &[3, 2, 4]);
    assert_eq!(dw.shape(), &[4, 5]);

    let summed_rows = a.sum_squeezing(&[0, 1]).reshaped(vec![4, 1]);
    assert_approx_eq!(dw, summed_rows.matmul(&Tensor::ones(vec![1, 5])), 1e-4);
}

#[test]
fn test_reused_variable_accumulates() {
    let x = Tensor::from_vec(vec![0.5_f32, 2.0]);
    let grad = gradient(&x, |x| (x * x + x).sum());
    assert_approx_eq!(grad, Tensor::from_vec(vec![2.0, 5.0]), 1e-6);
}

#[test]
fn test_backward_with_seed() {
    let tape = Tape::new();
    let x = tape.var(Tensor::from_vec(vec![1.0_f32, 2.0, 3.0]));
    let y = &x * 3.0 - 1.0;
    let grads = y.backward_with(Tensor::from_vec(vec![1.0, 0.0, 2.0]));
    assert_eq!(grads.wrt(&x), Tensor::from_vec(vec![3.0, 0.0, 6.0]));
}

#[test]
fn test_unrelated_variables_get_zero_gradients() {
    let tape = Tape::new();
    let x = tape.var(Tensor::ones(vec![2, 2]));
    let unused = tape.var(Tensor::ones(vec![3]));
    let y = x.tanh().sum();
    assert_eq!(y.backward().wrt(&unused), Tensor::zeros(vec![3]));
}

#[test]
fn test_backward_requires_a_single_element() {
    let tape = Tape::new();
    let x = tape.var(Tensor::ones(vec![2]));
    assert!(x.exp().try_backward().is_err());
    assert!(x.exp().sum().try_backward().is_ok());
}

#[test]
fn test_relu_and_abs_gradients_away_from_zero() {
    let x = Tensor::from_vec(vec![-2.0_f32, -0.5, 0.5, 2.0]);
    assert_eq!(gradient(&x, |x| x.relu().sum()), Tensor::from_vec(vec![0.0, 0.0, 1.0, 1.0]));
    assert_eq!(gradient(&x, |x| x.abs().sum()), Tensor::from_vec(vec![-1.0, -1.0, 1.0, 1.0]));
    assert_approx_eq!(
        gradient(&x, |x| x.leaky_relu(0.1).sum()),
        Tensor::from_vec(vec![0.1, 0.1, 1.0, 1.0]),
        1e-6
    );
}

#[test]
fn test_negation_and_broadcast_to() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0]);
    let grad = gradient(&x, |x| (-x.broadcast_to(&[3, 2])).sum());
    assert_eq!(grad, Tensor::from_vec(vec![-3.0, -3.0]));
}
