//! Backend selection.
//!
//! Heavy kernels (currently matrix multiplication) are routed through
//! [`crate::ops::dispatch`], which consults the globally selected [`Backend`].
//!
//! - `Cpu`: multi-threaded Rust kernels (default)
//! - `Wgpu`: compute shaders through `wgpu`, only with the `wgpu` feature
//!
//! Selecting `Wgpu` without the feature, or on a machine without an adapter,
//! is not an error: dispatch falls back to the CPU.

use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

/// Available computation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Pure CPU backend.
    #[default]
    Cpu = 0,
    /// GPU compute through `wgpu`.
    Wgpu,
}

impl TryFrom<u8> for Backend {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Wgpu),
            other => Err(other),
        }
    }
}

static GLOBAL_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// Sets the backend used by subsequent kernel dispatches.
///
/// ```
/// use seqgrad::backend::{get_backend, set_backend, Backend};
///
/// set_backend(Backend::Cpu);
/// assert_eq!(get_backend(), Backend::Cpu);
/// ```
pub fn set_backend(backend: Backend) {
    tracing::debug!(?backend, "selecting backend");
    GLOBAL_BACKEND.store(backend as u8, Ordering::Release);
}

/// Returns the active backend, [`Backend::Cpu`] if the stored value is invalid.
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}
