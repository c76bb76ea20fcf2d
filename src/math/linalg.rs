//! Linear algebra on batches of matrices.
//!
//! The last two axes of a tensor are the matrix axes; any leading axes are batch
//! axes and broadcast between operands.
//!
//! # QR decomposition
//!
//! [`Tensor::qr_decomposition`] uses Householder reflections. Reflections are
//! accumulated in `f64` and the factors rounded to `f32` at the end, which keeps
//! `Q·R` within `1e-5` of the input for well-scaled matrices.

use crate::TensorFloat;
use crate::error::ShapeError;
use crate::ops::dispatch;
use crate::shape::{broadcast_shapes, broadcast_strides, element_count, source_index, strides};
use crate::tensors::Tensor;

impl Tensor<TensorFloat> {
    /// Batched matrix product.
    ///
    /// Both operands need rank >= 2. Leading axes broadcast.
    ///
    /// # Errors
    /// - [`ShapeError::Rank`] for operands of rank < 2
    /// - [`ShapeError::MatmulInner`] when the inner dimensions differ
    /// - [`ShapeError::Broadcast`] when the batch axes are incompatible
    pub fn try_matmul(&self, rhs: &Tensor<TensorFloat>) -> Result<Tensor<TensorFloat>, ShapeError> {
        let (a_batch, [m, k]) = split_matrix("matmul", self.shape())?;
        let (b_batch, [k2, n]) = split_matrix("matmul", rhs.shape())?;
        if k != k2 {
            return Err(ShapeError::MatmulInner {
                lhs: self.shape().to_vec(),
                rhs: rhs.shape().to_vec(),
            });
        }

        let batch = broadcast_shapes(a_batch, b_batch)?;
        let a_strides = broadcast_strides(a_batch, &batch);
        let b_strides = broadcast_strides(b_batch, &batch);

        let mut data = Vec::with_capacity(element_count(&batch) * m * n);
        for i in 0..element_count(&batch) {
            let ia = source_index(i, &batch, &a_strides) * m * k;
            let ib = source_index(i, &batch, &b_strides) * k * n;
            data.extend(dispatch::matmul(
                &self.data()[ia..ia + m * k],
                &rhs.data()[ib..ib + k * n],
                m,
                k,
                n,
            ));
        }

        let mut shape = batch;
        shape.extend([m, n]);
        Tensor::try_new(shape, data)
    }

    /// Batched matrix product.
    ///
    /// # Panics
    /// Panics on the shape errors listed for [`Tensor::try_matmul`].
    #[must_use]
    pub fn matmul(&self, rhs: &Tensor<TensorFloat>) -> Tensor<TensorFloat> {
        self.try_matmul(rhs).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<T: Copy + Send + Sync> Tensor<T> {
    /// Reorders the axes: output axis `i` is input axis `axes[i]`.
    ///
    /// # Errors
    /// Fails unless `axes` is a permutation of `0..rank`.
    pub fn try_permuted(&self, axes: &[usize]) -> Result<Tensor<T>, ShapeError> {
        let mut seen = vec![false; self.rank()];
        let valid = axes.len() == self.rank()
            && axes.iter().all(|&a| a < seen.len() && !std::mem::replace(&mut seen[a], true));
        if !valid {
            return Err(ShapeError::Rank {
                op: "permute",
                expected: "a permutation of every axis",
                shape: self.shape().to_vec(),
            });
        }

        let own = strides(self.shape());
        let shape: Vec<usize> = axes.iter().map(|&a| self.shape()[a]).collect();
        let read: Vec<usize> = axes.iter().map(|&a| own[a]).collect();
        let data = (0..self.len())
            .map(|i| self.data()[source_index(i, &shape, &read)])
            .collect();
        Tensor::try_new(shape, data)
    }

    /// Reorders the axes.
    ///
    /// # Panics
    /// Panics unless `axes` is a permutation of `0..rank`.
    #[must_use]
    pub fn permuted(&self, axes: &[usize]) -> Tensor<T> {
        self.try_permuted(axes).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Swaps the last two axes.
    ///
    /// # Panics
    /// Panics for tensors of rank < 2.
    #[must_use]
    pub fn transposed(&self) -> Tensor<T> {
        let rank = self.rank();
        assert!(rank >= 2, "transpose requires rank >= 2, got {:?}", self.shape());
        let mut axes: Vec<usize> = (0..rank).collect();
        axes.swap(rank - 2, rank - 1);
        self.permuted(&axes)
    }

    /// The diagonal of a rank-2k tensor of shape `[d1..dk, d1..dk]`.
    ///
    /// `out[i1..ik] = in[i1..ik, i1..ik]`.
    ///
    /// # Errors
    /// Fails for odd ranks, rank 0, or mismatched halves.
    pub fn try_diagonal_part(&self) -> Result<Tensor<T>, ShapeError> {
        let rank = self.rank();
        let half = rank / 2;
        if rank == 0 || rank % 2 != 0 || self.shape()[..half] != self.shape()[half..] {
            return Err(ShapeError::Rank {
                op: "diagonal_part",
                expected: "shape [d1..dk, d1..dk]",
                shape: self.shape().to_vec(),
            });
        }

        let own = strides(self.shape());
        let shape = self.shape()[..half].to_vec();
        let read: Vec<usize> = (0..half).map(|d| own[d] + own[half + d]).collect();
        let data = (0..element_count(&shape))
            .map(|i| self.data()[source_index(i, &shape, &read)])
            .collect();
        Tensor::try_new(shape, data)
    }

    /// The diagonal of a rank-2k tensor.
    ///
    /// # Panics
    /// Panics if the shape is not `[d1..dk, d1..dk]`.
    #[must_use]
    pub fn diagonal_part(&self) -> Tensor<T> {
        self.try_diagonal_part().unwrap_or_else(|err| panic!("{err}"))
    }
}

impl Tensor<TensorFloat> {
    /// An `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self::new(vec![n, n], data)
    }

    /// Batched square matrices with `self`'s last axis on the diagonal.
    ///
    /// A tensor of shape `[.., n]` becomes `[.., n, n]`.
    ///
    /// # Panics
    /// Panics for rank-0 tensors.
    #[must_use]
    pub fn diagonal(&self) -> Tensor<TensorFloat> {
        let Some((&n, batch)) = self.shape().split_last() else {
            panic!("diagonal requires rank >= 1");
        };
        let mut data = vec![0.0; self.len() * n];
        for (b, row) in self.data().chunks(n.max(1)).enumerate() {
            for (i, &v) in row.iter().enumerate() {
                data[b * n * n + i * n + i] = v;
            }
        }
        let mut shape = batch.to_vec();
        shape.extend([n, n]);
        Tensor::new(shape, data)
    }

    /// Sum of the diagonal of the last two (square) axes.
    ///
    /// # Panics
    /// Panics unless the last two axes exist and are equal.
    #[must_use]
    pub fn trace(&self) -> Tensor<TensorFloat> {
        let (batch, [m, n]) = split_matrix("trace", self.shape()).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(m, n, "trace requires square matrices, got {:?}", self.shape());
        let size = m * n;
        let data = (0..element_count(batch))
            .map(|b| {
                let mat = &self.data()[b * size..(b + 1) * size];
                (0..m).map(|i| mat[i * n + i]).sum()
            })
            .collect();
        Tensor::new(batch.to_vec(), data)
    }

    /// QR decomposition of every matrix in the batch: `self = Q·R`.
    ///
    /// With `full_matrices`, `Q` is `m x m` and `R` is `m x n`; otherwise `Q` is
    /// `m x k` and `R` is `k x n` with `k = min(m, n)`. `R` is upper triangular and
    /// `Q` has orthonormal columns.
    ///
    /// # Errors
    /// Returns [`ShapeError::Rank`] for tensors of rank < 2.
    pub fn try_qr_decomposition(
        &self,
        full_matrices: bool,
    ) -> Result<(Tensor<TensorFloat>, Tensor<TensorFloat>), ShapeError> {
        let (batch, [m, n]) = split_matrix("qr_decomposition", self.shape())?;
        let k = m.min(n);
        let (q_cols, r_rows) = if full_matrices { (m, m) } else { (k, k) };

        let mut q_data = Vec::with_capacity(element_count(batch) * m * q_cols);
        let mut r_data = Vec::with_capacity(element_count(batch) * r_rows * n);

        let size = m * n;
        for b in 0..element_count(batch) {
            let (q, r) = householder_qr(&self.data()[b * size..(b + 1) * size], m, n);
            for i in 0..m {
                q_data.extend(q[i * m..i * m + q_cols].iter().map(|&v| v as TensorFloat));
            }
            r_data.extend(r[..r_rows * n].iter().map(|&v| v as TensorFloat));
        }

        let mut q_shape = batch.to_vec();
        q_shape.extend([m, q_cols]);
        let mut r_shape = batch.to_vec();
        r_shape.extend([r_rows, n]);
        Ok((Tensor::try_new(q_shape, q_data)?, Tensor::try_new(r_shape, r_data)?))
    }

    /// QR decomposition of every matrix in the batch.
    ///
    /// # Panics
    /// Panics for tensors of rank < 2.
    #[must_use]
    pub fn qr_decomposition(&self, full_matrices: bool) -> (Tensor<TensorFloat>, Tensor<TensorFloat>) {
        self.try_qr_decomposition(full_matrices)
            .unwrap_or_else(|err| panic!("{err}"))
    }
}

/// Splits a shape into batch axes and the trailing `[rows, cols]`.
fn split_matrix<'a>(op: &'static str, shape: &'a [usize]) -> Result<(&'a [usize], [usize; 2]), ShapeError> {
    match shape {
        [batch @ .., m, n] => Ok((batch, [*m, *n])),
        _ => Err(ShapeError::Rank {
            op,
            expected: "rank >= 2",
            shape: shape.to_vec(),
        }),
    }
}

/// Full Householder QR of a row-major `m x n` matrix.
///
/// Returns `Q` as `m x m` and `R` as `m x n`, both row-major.
fn householder_qr(a: &[f32], m: usize, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut r: Vec<f64> = a.iter().map(|&v| f64::from(v)).collect();
    let mut q = vec![0.0; m * m];
    for i in 0..m {
        q[i * m + i] = 1.0;
    }

    let mut v = vec![0.0; m];
    for j in 0..m.min(n) {
        let norm = (j..m).map(|i| r[i * n + j] * r[i * n + j]).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        let alpha = if r[j * n + j] > 0.0 { -norm } else { norm };

        let len = m - j;
        for i in 0..len {
            v[i] = r[(j + i) * n + j];
        }
        v[0] -= alpha;
        let v_norm_sq: f64 = v[..len].iter().map(|x| x * x).sum();
        if v_norm_sq == 0.0 {
            continue;
        }

        // R <- H R on rows j.., columns j..
        for c in j..n {
            let s: f64 = (0..len).map(|i| v[i] * r[(j + i) * n + c]).sum();
            let f = 2.0 * s / v_norm_sq;
            for i in 0..len {
                r[(j + i) * n + c] -= f * v[i];
            }
        }
        r[j * n + j] = alpha;
        for i in 1..len {
            r[(j + i) * n + j] = 0.0;
        }

        // Q <- Q H on columns j..
        for row in 0..m {
            let s: f64 = (0..len).map(|i| q[row * m + j + i] * v[i]).sum();
            let f = 2.0 * s / v_norm_sq;
            for i in 0..len {
                q[row * m + j + i] -= f * v[i];
            }
        }
    }

    (q, r)
}
