//! Parameter checkpoints.
//!
//! # `.bpat` format (version 2)
//!
//! ```text
//! ┌────────────┬───────────────────────────────────┐
//! │ "bpat"[4]  │ magic                             │
//! │ u8         │ format version (2)                │
//! │ u32        │ tensor count                      │
//! ├────────────┼───────────────────────────────────┤
//! │ u64        │ rank                              │  repeated
//! │ [u64; rank]│ shape                             │  per
//! │ [f32; n]   │ row-major data, n = prod(shape)   │  tensor
//! └────────────┴───────────────────────────────────┘
//! ```
//!
//! Integers and floats are little-endian. Every decoded tensor is validated
//! before it becomes a [`Tensor`].
//!
//! # Example
//!
//! ```rust
//! use seqgrad::layers::{ActivationKind, Dense, Layer};
//! use seqgrad::modelio::{load_parameters, save_parameters};
//!
//! # fn main() -> Result<(), seqgrad::error::CheckpointError> {
//! let path = std::env::temp_dir().join("seqgrad-doc-dense.bpat");
//! let trained = Dense::new(3, 2, ActivationKind::Relu, 7);
//! save_parameters(&path, &trained)?;
//!
//! let mut restored = Dense::new(3, 2, ActivationKind::Relu, 8);
//! load_parameters(&path, &mut restored)?;
//! assert_eq!(restored, trained);
//! # std::fs::remove_file(&path)?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use briny::prelude::*;

use crate::TensorFloat;
use crate::error::CheckpointError;
use crate::layers::Layer;
use crate::tensors::Tensor;

const BPAT_MAGIC: &[u8; 4] = b"bpat";
const BPAT_VERSION: u8 = 2;
const MAX_RANK: u64 = 32;

/// A tensor as read from disk, before validation.
struct PackedTensor {
    shape: Vec<u64>,
    data: Vec<TensorFloat>,
}

impl Validate for PackedTensor {
    fn validate(&self) -> Result<(), ValidationError> {
        let expected = self
            .shape
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d))
            .ok_or(ValidationError)?;
        if self.data.len() as u64 != expected {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Writes `tensors` in `.bpat` format.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_tensors<W: Write>(mut writer: W, tensors: &[&Tensor<TensorFloat>]) -> Result<(), CheckpointError> {
    let count = u32::try_from(tensors.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many tensors"))?;

    writer.write_all(BPAT_MAGIC)?;
    writer.write_all(&[BPAT_VERSION])?;
    writer.write_all(&count.to_le_bytes())?;

    for tensor in tensors {
        writer.write_all(&(tensor.rank() as u64).to_le_bytes())?;
        for &dim in tensor.shape() {
            writer.write_all(&(dim as u64).to_le_bytes())?;
        }
        for &value in tensor.data() {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Reads every tensor from a `.bpat` stream.
///
/// # Errors
/// - [`CheckpointError::BadMagic`] or [`CheckpointError::UnsupportedVersion`]
///   for foreign files
/// - [`CheckpointError::Corrupted`] when a tensor header is implausible or its
///   data fails validation
/// - [`CheckpointError::Io`] for truncated streams
pub fn read_tensors<R: Read>(mut reader: R) -> Result<Vec<Tensor<TensorFloat>>, CheckpointError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != BPAT_MAGIC {
        return Err(CheckpointError::BadMagic);
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != BPAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion(version[0]));
    }

    let mut buf4 = [0u8; 4];
    let mut buf8 = [0u8; 8];
    reader.read_exact(&mut buf4)?;
    let count = u32::from_le_bytes(buf4) as usize;

    let mut tensors = Vec::with_capacity(count.min(1024));
    for index in 0..count {
        reader.read_exact(&mut buf8)?;
        let rank = u64::from_le_bytes(buf8);
        if rank > MAX_RANK {
            return Err(CheckpointError::Corrupted { index });
        }

        let mut shape = Vec::with_capacity(rank as usize);
        for _ in 0..rank {
            reader.read_exact(&mut buf8)?;
            shape.push(u64::from_le_bytes(buf8));
        }

        let size = shape
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(CheckpointError::Corrupted { index })?;

        let mut data = Vec::with_capacity(size.min(1 << 20));
        for _ in 0..size {
            reader.read_exact(&mut buf4)?;
            data.push(TensorFloat::from_le_bytes(buf4));
        }

        let trusted = TrustedData::new(PackedTensor { shape, data })
            .map_err(|_| CheckpointError::Corrupted { index })?;
        let packed = trusted.into_inner();
        let shape: Vec<usize> = packed.shape.iter().map(|&d| d as usize).collect();
        let tensor = Tensor::try_new(shape, packed.data).map_err(|_| CheckpointError::Corrupted { index })?;
        tensors.push(tensor);
    }

    Ok(tensors)
}

/// Saves tensors to a `.bpat` file.
///
/// # Errors
/// Fails on I/O errors.
pub fn save_tensors(path: impl AsRef<Path>, tensors: &[&Tensor<TensorFloat>]) -> Result<(), CheckpointError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), tensors = tensors.len(), "writing checkpoint");
    write_tensors(BufWriter::new(File::create(path)?), tensors)
}

/// Loads every tensor from a `.bpat` file.
///
/// # Errors
/// See [`read_tensors`].
pub fn load_tensors(path: impl AsRef<Path>) -> Result<Vec<Tensor<TensorFloat>>, CheckpointError> {
    let path = path.as_ref();
    let tensors = read_tensors(BufReader::new(File::open(path)?))?;
    tracing::debug!(path = %path.display(), tensors = tensors.len(), "read checkpoint");
    Ok(tensors)
}

/// Saves a layer's parameters, in [`Layer::parameters`] order.
///
/// # Errors
/// Fails on I/O errors.
pub fn save_parameters<L: Layer + ?Sized>(path: impl AsRef<Path>, layer: &L) -> Result<(), CheckpointError> {
    save_tensors(path, &layer.parameters())
}

/// Restores a layer's parameters from a checkpoint.
///
/// The layer is only modified when every stored tensor matches the shape of
/// the corresponding parameter.
///
/// # Errors
/// - everything [`load_tensors`] reports
/// - [`CheckpointError::CountMismatch`] or [`CheckpointError::ShapeMismatch`]
///   when the checkpoint belongs to a different architecture
pub fn load_parameters<L: Layer + ?Sized>(path: impl AsRef<Path>, layer: &mut L) -> Result<(), CheckpointError> {
    let tensors = load_tensors(path)?;
    let mut params = layer.parameters_mut();

    if tensors.len() != params.len() {
        return Err(CheckpointError::CountMismatch {
            expected: params.len(),
            found: tensors.len(),
        });
    }
    for (index, (param, tensor)) in params.iter().zip(&tensors).enumerate() {
        if param.shape() != tensor.shape() {
            return Err(CheckpointError::ShapeMismatch {
                index,
                expected: param.shape().to_vec(),
                found: tensor.shape().to_vec(),
            });
        }
    }

    for (param, tensor) in params.iter_mut().zip(tensors) {
        param.update(tensor);
    }
    Ok(())
}
