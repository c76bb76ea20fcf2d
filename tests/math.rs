use seqgrad::assert_approx_eq;
use seqgrad::tensor;
use seqgrad::tensors::Tensor;

fn check_elementary(name: &str, op: impl Fn(&Tensor<f32>) -> Tensor<f32>, scalar: impl Fn(f32) -> f32) {
    let x = Tensor::random_normal(vec![20], 0);
    let actual = op(&x);
    let expected: Vec<f32> = x.data().iter().map(|&v| scalar(v)).collect();
    assert_eq!(actual.shape(), &[20], "{name}");
    for (i, (&a, &e)) in actual.data().iter().zip(&expected).enumerate() {
        let same = (a.is_nan() && e.is_nan()) || (a - e).abs() <= 1e-4;
        assert!(same, "{name}: element {i} is {a}, expected {e}");
    }
}

#[test]
fn test_elementary_functions() {
    check_elementary("sqrt", Tensor::sqrt, f32::sqrt);
    check_elementary("cos", Tensor::cos, f32::cos);
    check_elementary("sin", Tensor::sin, f32::sin);
    check_elementary("tan", Tensor::tan, f32::tan);
    check_elementary("cosh", Tensor::cosh, f32::cosh);
    check_elementary("sinh", Tensor::sinh, f32::sinh);
    check_elementary("tanh", Tensor::tanh, f32::tanh);
    check_elementary("acos", Tensor::acos, f32::acos);
    check_elementary("asin", Tensor::asin, f32::asin);
    check_elementary("atan", Tensor::atan, f32::atan);
    check_elementary("acosh", Tensor::acosh, f32::acosh);
    check_elementary("asinh", Tensor::asinh, f32::asinh);
    check_elementary("atanh", Tensor::atanh, f32::atanh);
    check_elementary("exp", Tensor::exp, f32::exp);
    check_elementary("exp2", Tensor::exp2, f32::exp2);
    check_elementary("exp10", Tensor::exp10, |x| 10.0_f32.powf(x));
    check_elementary("expm1", Tensor::expm1, f32::exp_m1);
    check_elementary("log", Tensor::log, f32::ln);
    check_elementary("log2", Tensor::log2, f32::log2);
    check_elementary("log10", Tensor::log10, f32::log10);
    check_elementary("log1p", Tensor::log1p, f32::ln_1p);
    check_elementary("pow", |x| x.pow(x), |x| x.powf(x));
    check_elementary("pow", |x| x.powf(3.0), |x| x.powf(3.0));
    check_elementary("root", |x| x.root(3), f32::cbrt);
    check_elementary("powi", |x| x.powi(3), |x| x * x * x);
    check_elementary("rsqrt", Tensor::rsqrt, |x| 1.0 / x.sqrt());
    check_elementary("round", |x| (x * 4.0).round(), |x| (x * 4.0).round());
    check_elementary("swish", Tensor::swish, |x| x / (1.0 + (-x).exp()));
}

#[test]
fn test_relu6_clamps_at_six() {
    let y = Tensor::from_vec(vec![-1.0_f32, 3.0, 6.0, 7.5]).relu6();
    assert_eq!(y.data(), &[0.0, 3.0, 6.0, 6.0]);
}

#[test]
fn test_selu() {
    let y = Tensor::from_vec(vec![1.0_f32, -1.0, 0.0, 2.0]).selu();
    assert_approx_eq!(y.data(), [1.0507009, -1.1113307, 0.0, 2.1014019][..], 1e-5);
}

#[test]
fn test_powi_negative_exponent() {
    let y = Tensor::from_vec(vec![2.0_f32, -4.0]).powi(-1);
    assert_approx_eq!(y.data(), [0.5, -0.25][..], 1e-6);
}

#[test]
fn test_maximum_and_minimum_broadcast() {
    let x: Tensor<f32> = tensor!([[1.0, 5.0], [3.0, 2.0]]);
    let row: Tensor<f32> = tensor!([2.0, 4.0]);
    assert_eq!(x.maximum(&row), tensor!([[2.0, 5.0], [3.0, 4.0]]));
    assert_eq!(x.minimum(&row), tensor!([[1.0, 4.0], [2.0, 2.0]]));

    let column: Tensor<f32> = tensor!([[0.0], [10.0]]);
    assert_eq!(row.maximum(&column), tensor!([[2.0, 4.0], [10.0, 10.0]]));
}

#[test]
fn test_clamped() {
    let y = Tensor::from_vec(vec![-2.0_f32, 0.5, 3.0]).clamped(-1.0, 1.0);
    assert_eq!(y.data(), &[-1.0, 0.5, 1.0]);
}

#[test]
fn test_comparisons_broadcast() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0]);
    let pivot = Tensor::scalar(2.0_f32);
    assert_eq!(x.greater(&pivot), Tensor::from_vec(vec![false, false, true]));
    assert_eq!(x.less(&pivot), Tensor::from_vec(vec![true, false, false]));
}

#[test]
fn test_log1p() {
    let y = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, 5.0]).log1p();
    assert_approx_eq!(y.data(), [0.69315, 1.09861, 1.38629, 1.60944, 1.79176][..], 1e-4);
}

#[test]
fn test_log1mexp() {
    let y = Tensor::from_vec(vec![-1.0_f32, -2.0, -3.0, -4.0, -5.0]).log1mexp();
    assert_approx_eq!(y.data(), [-0.45868, -0.14541, -0.05107, -0.01849, -0.00676][..], 1e-4);
}

#[test]
fn test_expm1() {
    let y = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, 5.0]).expm1();
    assert_approx_eq!(y.data(), [1.71828, 6.38906, 19.08554, 53.59815, 147.41316][..], 1e-4);
}

#[test]
fn test_sign() {
    let x: Tensor<f32> = tensor!([[1.0, 2.0, -3.0, 4.0, 5.0], [1.0, 2.0, 3.0, 4.0, -5.0]]);
    let expected: Tensor<f32> = tensor!([[1.0, 1.0, -1.0, 1.0, 1.0], [1.0, 1.0, 1.0, 1.0, -1.0]]);
    assert_eq!(x.sign(), expected);
}

#[test]
fn test_log_sigmoid() {
    let x: Tensor<f32> = tensor!([[1.0, 2.0, 3.0, 4.0, 5.0], [1.0, 2.0, 3.0, 4.0, 5.0]]);
    assert_approx_eq!(x.log_sigmoid(), x.sigmoid().log(), 1e-4);
}

#[test]
fn test_softplus() {
    let y = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0]).softplus();
    assert_approx_eq!(y.data(), [1.3132616, 2.126928, 3.0485873][..], 1e-6);
}

#[test]
fn test_softsign() {
    let y = Tensor::from_vec(vec![1.0_f32, 4.0, 3.0]).softsign();
    assert_eq!(y.data(), &[0.5, 0.8, 0.75]);
}

#[test]
fn test_elu() {
    let y = Tensor::from_vec(vec![-1.0_f32, 2.0, 3.0]).elu();
    assert_approx_eq!(y.data(), [-0.63212055, 2.0, 3.0][..], 1e-6);
}

#[test]
fn test_gelu() {
    let y = Tensor::from_vec(vec![2.0_f32, 1.0, 7.0]).gelu();
    assert_approx_eq!(y.data(), [1.95459769, 0.84119199, 7.0][..], 1e-5);
}

#[test]
fn test_leaky_relu() {
    let x: Tensor<f32> = tensor!([[-1.0, 2.0, 3.0]]);
    let y = x.leaky_relu(0.4);
    assert_eq!(y.shape(), &[1, 3]);
    assert_approx_eq!(y.data(), [-0.4, 2.0, 3.0][..], 1e-6);
}

#[test]
fn test_is_finite() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, f32::NEG_INFINITY]);
    assert_eq!(x.is_finite(), Tensor::from_vec(vec![true, true, true, true, false]));
}

#[test]
fn test_is_infinite() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, 0.0_f32.ln()]);
    assert_eq!(x.is_infinite(), Tensor::from_vec(vec![false, false, false, false, true]));
}

#[test]
fn test_is_nan() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, (-5.0_f32).ln()]);
    assert_eq!(x.is_nan(), Tensor::from_vec(vec![false, false, false, false, true]));
    assert!(x.is_nan().any());
    assert!(!x.is_nan().all());
}

#[test]
fn test_cosine_similarity() {
    let x = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    let y = Tensor::from_vec(vec![0.5_f32, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);
    let z = x.cosine_similarity(&y);
    assert_eq!(z.rank(), 0);
    assert_approx_eq!(z.scalarized(), 1.0, 1e-6);
}

#[test]
fn test_ceil_and_floor() {
    let x = Tensor::from_vec(vec![-1.3_f32, -0.4, 0.5, 1.6]);
    assert_eq!(x.floor().data(), &[-2.0, -1.0, 0.0, 1.0]);
    assert_eq!(x.ceil().data(), &[-1.0, -0.0, 1.0, 2.0]);
}

#[test]
fn test_simple_math() {
    let y = Tensor::from_vec(vec![1.2_f32, 1.2]).tanh();
    assert_eq!(y.shape(), &[2]);
    assert_approx_eq!(y.data(), [0.833655, 0.833655][..], 1e-4);
}

#[test]
fn test_three_adds() {
    let a = Tensor::from_vec(vec![1.0_f32]);
    let b = Tensor::from_vec(vec![2.0_f32]);
    let c = Tensor::from_vec(vec![3.0_f32]);
    let o = a + b + c;
    assert_eq!(o.scalars(), &[6.0]);
}

#[test]
fn test_multi_op_math() {
    let x = Tensor::from_vec(vec![1.2_f32, 1.2]);
    let y = Tensor::from_vec(vec![2.4_f32, 2.4]);
    let t1 = &x + &y;
    let t2 = &t1 * &t1;
    let t3 = t2.sqrt();
    for t in [&t1, &t2, &t3] {
        assert_eq!(t.shape(), &[2]);
    }
    assert_approx_eq!(t1.data(), [3.6, 3.6][..], 1e-4);
    assert_approx_eq!(t2.data(), [12.96, 12.96][..], 1e-4);
    assert_approx_eq!(t3.data(), [3.6, 3.6][..], 1e-4);
}

#[test]
fn test_root_of_negative_is_negative() {
    let y = Tensor::from_vec(vec![-8.0_f32, 27.0]).root(3);
    assert_approx_eq!(y.data(), [-2.0, 3.0][..], 1e-5);
}

#[test]
fn test_broadcasting_shapes() {
    let x = Tensor::ones(vec![2, 1, 3]);
    let y = Tensor::ones(vec![4, 1]);
    assert_eq!((&x + &y).shape(), &[2, 4, 3]);
    assert!(seqgrad::math::elementwise::try_zip_map(&x, &Tensor::<f32>::ones(vec![2]), |a, b| a + b).is_err());
}

#[test]
fn test_softmax_rows_sum_to_one() {
    let x = Tensor::random_normal(vec![3, 5], 11) * 4.0;
    let s = x.softmax(-1).sum_squeezing(&[-1]);
    assert_approx_eq!(s, Tensor::ones(vec![3]), 1e-5);
    assert_approx_eq!(x.log_softmax(-1).exp(), x.softmax(-1), 1e-5);
}

#[test]
fn test_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| Tensor::new(vec![2, 2], vec![1.0_f32, 2.0, 3.0]));
    assert!(result.is_err());
}
