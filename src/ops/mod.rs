//! Backend kernels on raw row-major `f32` buffers.
//!
//! - [`cpu`]: rayon-parallel kernels, with an AVX2 dot product under the `simd` feature
//! - [`wgpu`] *(opt-in)*: compute shader pipelines
//! - [`dispatch`]: picks a kernel for the active [`crate::backend::Backend`]
//!
//! Shape checking happens in the tensor layer; kernels trust their dimensions.

pub mod cpu;
pub mod dispatch;
#[cfg(feature = "wgpu")]
pub mod wgpu;
