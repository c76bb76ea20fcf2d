//! Shape arithmetic shared by the eager kernels and the gradient tape.
//!
//! # Broadcasting
//!
//! Two shapes are aligned from the right. Each pair of dimensions must be equal or
//! one of them must be `1`; missing leading dimensions behave as `1`:
//!
//! ```text
//! [1, 2, 1, 4]
//! [4, 1, 3, 1]
//! ------------
//! [4, 2, 3, 4]
//! ```
//!
//! Indexing through a broadcast uses strides of `0` for every broadcast axis, so
//! the same source element is read repeatedly without materialising copies.

use crate::error::ShapeError;

/// Computes the broadcast shape of `lhs` and `rhs`.
///
/// # Errors
/// Returns [`ShapeError::Broadcast`] when a pair of aligned dimensions differs and
/// neither is `1`.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0; rank];

    for i in 0..rank {
        let l = dim_from_right(lhs, rank - 1 - i);
        let r = dim_from_right(rhs, rank - 1 - i);
        out[i] = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => {
                return Err(ShapeError::Broadcast {
                    lhs: lhs.to_vec(),
                    rhs: rhs.to_vec(),
                });
            }
        };
    }

    Ok(out)
}

// `offset` counts from the last axis; missing axes read as 1.
fn dim_from_right(shape: &[usize], offset: usize) -> usize {
    if offset < shape.len() {
        shape[shape.len() - 1 - offset]
    } else {
        1
    }
}

/// Row-major strides of `shape`.
#[must_use]
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut acc = 1;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= dim;
    }
    strides
}

/// Strides that read a tensor of `shape` as if it had `target` shape.
///
/// `shape` must broadcast to `target`. Broadcast axes get stride `0`.
#[must_use]
pub fn broadcast_strides(shape: &[usize], target: &[usize]) -> Vec<usize> {
    let own = strides(shape);
    let offset = target.len() - shape.len();
    let mut out = vec![0; target.len()];

    for (i, &dim) in shape.iter().enumerate() {
        if dim != 1 {
            out[offset + i] = own[i];
        }
    }

    out
}

/// Maps a linear index into `shape` to a linear index through `strides`.
#[inline]
#[must_use]
pub fn source_index(mut index: usize, shape: &[usize], strides: &[usize]) -> usize {
    let mut src = 0;
    for (&dim, &stride) in shape.iter().zip(strides).rev() {
        if dim == 0 {
            return 0;
        }
        src += (index % dim) * stride;
        index /= dim;
    }
    src
}

/// Number of elements of a shape.
#[inline]
#[must_use]
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Resolves a possibly negative axis against `rank`.
///
/// # Errors
/// Returns [`ShapeError::InvalidAxis`] when the axis falls outside `-rank..rank`.
pub fn normalize_axis(axis: isize, rank: usize) -> Result<usize, ShapeError> {
    let signed_rank = rank as isize;
    let resolved = if axis < 0 { axis + signed_rank } else { axis };
    if resolved < 0 || resolved >= signed_rank {
        return Err(ShapeError::InvalidAxis { axis, rank });
    }
    Ok(resolved as usize)
}

/// Resolves a set of axes, returning them sorted and without duplicates.
///
/// # Errors
/// Fails if any axis is out of range.
pub fn normalize_axes(axes: &[isize], rank: usize) -> Result<Vec<usize>, ShapeError> {
    let mut resolved = axes
        .iter()
        .map(|&axis| normalize_axis(axis, rank))
        .collect::<Result<Vec<_>, _>>()?;
    resolved.sort_unstable();
    resolved.dedup();
    Ok(resolved)
}

/// `shape` with every axis in `axes` set to `1`.
#[must_use]
pub fn keep_dims(shape: &[usize], axes: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .map(|(i, &dim)| if axes.contains(&i) { 1 } else { dim })
        .collect()
}

/// `shape` with every axis in `axes` removed.
#[must_use]
pub fn squeeze_dims(shape: &[usize], axes: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .filter(|(i, _)| !axes.contains(i))
        .map(|(_, &dim)| dim)
        .collect()
}

/// Axes of `from` that must be summed so a gradient of shape `from` collapses
/// back onto `to`, where `to` was broadcast to `from`.
///
/// The result is expressed in `from`'s axes, leading axes first.
#[must_use]
pub fn unbroadcast_axes(from: &[usize], to: &[usize]) -> Vec<usize> {
    let offset = from.len() - to.len();
    let mut axes: Vec<usize> = (0..offset).collect();
    for (i, &dim) in to.iter().enumerate() {
        if dim == 1 && from[offset + i] != 1 {
            axes.push(offset + i);
        }
    }
    axes
}

/// Splits `shape` around `axis` into `(outer, len, inner)` block sizes.
#[must_use]
pub fn split_at_axis(shape: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = element_count(&shape[..axis]);
    let len = shape[axis];
    let inner = element_count(&shape[axis + 1..]);
    (outer, len, inner)
}
