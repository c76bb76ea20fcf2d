use seqgrad::assert_approx_eq;
use seqgrad::math::Reduction;
use seqgrad::tensor;
use seqgrad::tensors::Tensor;

fn two_rows() -> Tensor<f32> {
    tensor!([[1.0, 2.0, 3.0, 4.0, 5.0], [1.0, 2.0, 3.0, 4.0, 5.0]])
}

#[test]
fn test_sum() {
    let x = two_rows();
    assert_eq!(x.sum(), Tensor::scalar(30.0));
    assert_eq!(x.sum_squeezing(&[0]), Tensor::new(vec![5], vec![2.0, 4.0, 6.0, 8.0, 10.0]));
    assert_eq!(x.sum_along(&[0]), Tensor::new(vec![1, 5], vec![2.0, 4.0, 6.0, 8.0, 10.0]));
}

#[test]
fn test_product() {
    let x = two_rows();
    assert_eq!(x.product(), Tensor::scalar(14400.0));
    assert_eq!(x.product_squeezing(&[0]), Tensor::new(vec![5], vec![1.0, 4.0, 9.0, 16.0, 25.0]));
    assert_eq!(x.product_along(&[0]), Tensor::new(vec![1, 5], vec![1.0, 4.0, 9.0, 16.0, 25.0]));
}

#[test]
fn test_mean() {
    let x = two_rows();
    assert_eq!(x.mean(), Tensor::scalar(3.0));
    assert_eq!(x.mean_squeezing(&[0]), Tensor::new(vec![5], vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(x.mean_along(&[0]), Tensor::new(vec![1, 5], vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(x.mean_squeezing(&[1]), Tensor::new(vec![2], vec![3.0, 3.0]));
    assert_eq!(x.mean_along(&[1]), Tensor::new(vec![2, 1], vec![3.0, 3.0]));
}

#[test]
fn test_variance() {
    let x = two_rows();
    assert_approx_eq!(x.variance(), Tensor::scalar(2.0), 1e-6);
    assert_approx_eq!(x.variance_squeezing(&[0]), Tensor::zeros(vec![5]), 1e-6);
    assert_approx_eq!(x.variance_along(&[0]), Tensor::zeros(vec![1, 5]), 1e-6);
    assert_approx_eq!(x.variance_squeezing(&[1]), Tensor::from_vec(vec![2.0, 2.0]), 1e-6);
    assert_approx_eq!(x.variance_along(&[1]), Tensor::new(vec![2, 1], vec![2.0, 2.0]), 1e-6);
}

#[test]
fn test_negative_axes_count_from_the_end() {
    let x = two_rows();
    assert_eq!(x.sum_squeezing(&[-1]), x.sum_squeezing(&[1]));
    assert_eq!(x.max_squeezing(&[-2]), Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(x.min(), Tensor::scalar(1.0));
}

#[test]
fn test_invalid_axis_is_an_error() {
    let x = two_rows();
    assert!(x.try_reduce(Reduction::Mean, Some(&[3]), false).is_err());
    assert!(x.try_reduce(Reduction::Mean, Some(&[-3]), true).is_err());
    assert!(std::panic::catch_unwind(|| x.sum_squeezing(&[2])).is_err());
}

#[test]
fn test_argmax() {
    let x: Tensor<f32> = tensor!([[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
    let argmax0 = x.argmax_squeezing(0);
    let argmax1 = x.argmax_squeezing(1);
    let flat = x.argmax();
    assert_eq!(argmax0, Tensor::new(vec![3], vec![1_i64, 1, 1]));
    assert_eq!(argmax1, Tensor::new(vec![2], vec![2_i64, 2]));
    assert_eq!(flat, Tensor::scalar(5_i64));
    assert_eq!(x.argmin(), Tensor::scalar(0_i64));
    assert_eq!(x.argmin_squeezing(1), Tensor::new(vec![2], vec![0_i64, 0]));
}

#[test]
fn test_log_sum_exp() {
    let x: Tensor<f32> = tensor!([
        [0.45031791, 0.41123222, 0.53928467, 0.47167023, 0.15483777],
        [0.49975705, 0.71807549, 0.30396056, 0.2690469, 0.01404393],
        [0.16950939, 0.41085612, 0.79503016, 0.11977817, 0.99728241],
        [0.62510073, 0.17344792, 0.1540605, 0.40758517, 0.93683817],
        [0.15653343, 0.50502756, 0.99365925, 0.84617581, 0.17422509]
    ]);
    let expected = [2.02318908_f32, 1.99835067, 2.16853826, 2.1137799, 2.20261244];

    assert_approx_eq!(x.log_sum_exp(), Tensor::scalar(3.713886), 1e-4);
    assert_approx_eq!(x.log_sum_exp_squeezing(&[1]), Tensor::from_vec(expected.to_vec()), 1e-4);
    assert_approx_eq!(x.log_sum_exp_along(&[1]), Tensor::new(vec![5, 1], expected.to_vec()), 1e-4);
}

#[test]
fn test_log_sum_exp_is_stable_for_large_inputs() {
    let x = Tensor::from_vec(vec![1000.0_f32, 1000.0]);
    assert_approx_eq!(x.log_sum_exp().scalarized(), 1000.0 + 2.0_f32.ln(), 1e-3);
}

#[test]
fn test_standard_deviation() {
    assert_eq!(Tensor::from_vec(vec![1.0_f32]).standard_deviation(), Tensor::scalar(0.0));
    assert_eq!(
        Tensor::from_vec(vec![0.0_f32, 1.0]).standard_deviation_along(&[0]),
        Tensor::from_vec(vec![0.5])
    );
    assert_eq!(Tensor::from_vec(vec![0.0_f32, 1.0]).standard_deviation(), Tensor::scalar(0.5));

    let range = Tensor::range(0.0, 10.0, 1.0);
    assert_approx_eq!(range.standard_deviation().scalarized(), 2.87228132, 1e-3);

    let matrix = range.reshaped(vec![2, 5]);
    assert_approx_eq!(matrix.standard_deviation().scalarized(), 2.87228132, 1e-3);
    let rows = matrix.standard_deviation_along(&[1]);
    assert_eq!(rows.shape(), &[2, 1]);
    assert_approx_eq!(rows.data(), [1.4142, 1.4142][..], 1e-4);
}

#[test]
fn test_boolean_reductions() {
    let flags = Tensor::from_vec(vec![true, false, true]);
    assert!(flags.any());
    assert!(!flags.all());
    assert!(Tensor::from_vec(vec![true, true]).all());
}
