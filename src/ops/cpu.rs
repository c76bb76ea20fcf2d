//! Parallel CPU kernels.
//!
//! - rows of matrix products are computed in parallel with [`rayon`]
//! - with the `simd` feature on an AVX2 target, inner products use 256-bit FMA
//! - accumulation is done in `f64` so results do not depend on the split

use rayon::prelude::*;

#[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
use std::arch::x86_64::*;

/// Adam decay rate for the first moment.
pub const ADAM_BETA1: f32 = 0.9;
/// Adam decay rate for the second moment.
pub const ADAM_BETA2: f32 = 0.999;
/// Adam denominator epsilon.
pub const ADAM_EPSILON: f32 = 1e-8;

/// `C = A × B` for row-major `A: m×k` and `B: k×n`.
///
/// `B` is transposed up front so that every output element is a contiguous dot
/// product.
pub fn matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut out = vec![0.0; m * n];
    if m == 0 || n == 0 {
        return out;
    }

    let mut b_t = vec![0.0; k * n];
    for l in 0..k {
        for j in 0..n {
            b_t[j * k + l] = b[l * n + j];
        }
    }

    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        let a_row = &a[i * k..(i + 1) * k];
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = dot(a_row, &b_t[j * k..(j + 1) * k]) as f32;
        }
    });

    out
}

#[cfg(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2"))]
fn dot(a: &[f32], b: &[f32]) -> f64 {
    let mut idx = 0;
    let mut sum = 0.0;
    // SAFETY: avx2 is enabled for this target and every load stays in bounds.
    unsafe {
        let mut acc = _mm256_setzero_pd();
        while idx + 4 <= a.len() {
            let x = _mm256_cvtps_pd(_mm_loadu_ps(a.as_ptr().add(idx)));
            let y = _mm256_cvtps_pd(_mm_loadu_ps(b.as_ptr().add(idx)));
            acc = _mm256_fmadd_pd(x, y, acc);
            idx += 4;
        }
        let mut lanes = [0.0; 4];
        _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
        sum += lanes.iter().sum::<f64>();
    }
    for l in idx..a.len() {
        sum += f64::from(a[l]) * f64::from(b[l]);
    }
    sum
}

#[cfg(not(all(feature = "simd", target_arch = "x86_64", target_feature = "avx2")))]
fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum()
}

/// `param -= lr * grad`.
pub fn sgd(param: &mut [f32], grad: &[f32], learning_rate: f32) {
    param
        .par_iter_mut()
        .zip(grad.par_iter())
        .for_each(|(p, &g)| *p -= learning_rate * g);
}

/// `v = momentum * v + grad; param -= lr * v`.
pub fn sgd_momentum(param: &mut [f32], velocity: &mut [f32], grad: &[f32], learning_rate: f32, momentum: f32) {
    param
        .par_iter_mut()
        .zip(velocity.par_iter_mut())
        .zip(grad.par_iter())
        .for_each(|((p, v), &g)| {
            *v = momentum * *v + g;
            *p -= learning_rate * *v;
        });
}

/// One bias-corrected Adam step at 1-based timestep `t`.
pub fn adam(param: &mut [f32], m: &mut [f32], v: &mut [f32], grad: &[f32], t: i32, learning_rate: f32) {
    let correction1 = 1.0 - ADAM_BETA1.powi(t);
    let correction2 = 1.0 - ADAM_BETA2.powi(t);

    param
        .par_iter_mut()
        .zip(m.par_iter_mut().zip(v.par_iter_mut()))
        .zip(grad.par_iter())
        .for_each(|((p, (m, v)), &g)| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
        });
}
