//! Kernel dispatch.
//!
//! Each function tries the kernel for the active backend and falls back to the
//! CPU when that backend is compiled out or fails.

use crate::backend::{Backend, get_backend};

/// `C = A × B` for row-major `A: m×k` and `B: k×n`.
pub fn matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    tracing::trace!(m, k, n, backend = ?get_backend(), "matmul");
    match get_backend() {
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                if let Some(out) = super::wgpu::wgpu_matmul(a, b, m, k, n) {
                    return out;
                }
            }
        }
        Backend::Cpu => {}
    }

    super::cpu::matmul(a, b, m, k, n)
}

/// In-place `param -= lr * grad`.
pub fn sgd(param: &mut [f32], grad: &[f32], learning_rate: f32) {
    super::cpu::sgd(param, grad, learning_rate)
}

/// In-place SGD with a momentum buffer: `v = momentum * v + grad; param -= lr * v`.
pub fn sgd_momentum(param: &mut [f32], velocity: &mut [f32], grad: &[f32], learning_rate: f32, momentum: f32) {
    super::cpu::sgd_momentum(param, velocity, grad, learning_rate, momentum)
}

/// One bias-corrected Adam step at 1-based timestep `t`.
pub fn adam(param: &mut [f32], m: &mut [f32], v: &mut [f32], grad: &[f32], t: i32, learning_rate: f32) {
    super::cpu::adam(param, m, v, grad, t, learning_rate)
}
