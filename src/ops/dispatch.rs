//! Validated entry points for the spmm kernels.
//!
//! This module is the crate's boundary: it checks device residency,
//! dimensionality, batch arithmetic and the reduction selector, allocates
//! the outputs, and dispatches to a CPU kernel monomorphized for the
//! chosen reduction.
//!
//! # Validation order
//!
//! 1. **Device** — every input must report CPU residency
//!    ([`SpmmError::DeviceMismatch`](crate::error::SpmmError::DeviceMismatch)).
//! 2. **Shape** — index arrays must be one-dimensional, the dense inputs at
//!    least two-dimensional, and the leading dimensions must collapse into
//!    a whole number of batches
//!    ([`SpmmError::ShapeMismatch`](crate::error::SpmmError::ShapeMismatch)).
//! 3. **Reduction** — the selector must be a recognized token
//!    ([`SpmmError::UnknownReduction`](crate::error::SpmmError::UnknownReduction)).
//!
//! All of this happens before any output allocation or loop execution; a
//! failed call has no side effects. Past the boundary the kernels check
//! nothing; in particular, column indices outside `[0, N)` are undefined
//! behavior by contract.

use super::cpu;
use crate::error::{Result, SpmmError};
use crate::reduce::{MaxReducer, MeanReducer, MinReducer, Reduction, SumReducer};
use crate::tensors::{Scalar, Tensor};
use log::debug;

fn ensure_1d<T>(t: &Tensor<T>, tensor: &'static str) -> Result<()> {
    if t.ndim() == 1 {
        Ok(())
    } else {
        Err(SpmmError::ShapeMismatch {
            tensor,
            reason: format!("must be one-dimensional, got {} dims", t.ndim()),
        })
    }
}

fn ensure_matrix<T>(t: &Tensor<T>, tensor: &'static str) -> Result<()> {
    if t.ndim() >= 2 {
        Ok(())
    } else {
        Err(SpmmError::ShapeMismatch {
            tensor,
            reason: format!("must have at least two dimensions, got {}", t.ndim()),
        })
    }
}

/// Last two dimensions of a batched matrix, plus the batch count collapsed
/// from whatever leads them.
fn batched_dims<T>(t: &Tensor<T>, tensor: &'static str) -> Result<(usize, usize, usize)> {
    let ndim = t.ndim();
    let rows = t.shape[ndim - 2];
    let cols = t.shape[ndim - 1];
    let inner = rows * cols;
    if inner == 0 {
        return Ok((0, rows, cols));
    }
    if t.numel() % inner != 0 {
        return Err(SpmmError::ShapeMismatch {
            tensor,
            reason: format!(
                "element count {} is not a whole number of {}x{} matrices",
                t.numel(),
                rows,
                cols
            ),
        });
    }
    Ok((t.numel() / inner, rows, cols))
}

/// Sparse × dense product with a per-row reduction.
///
/// Multiplies the `M`-row CSR adjacency described by `rowptr` and `col`
/// (edge weights `value`, or implicit ones when absent) with the batched
/// dense matrix `mat` of shape `(..., N, K)`, reducing each output row's
/// edge contributions with the strategy named by `reduce`.
///
/// # Returns
/// - `out` of shape `(..., M, K)`, matching `mat`'s dtype and leading
///   dimensions.
/// - For `"min"`/`"max"`, an `i64` tensor of the same shape recording the
///   winning edge index per element, with the sentinel `E` (the edge
///   count) wherever a row had no edges. `None` for the other reductions.
///
/// Under `"mean"` on an integer dtype the per-row division truncates
/// toward zero, as integer division does.
///
/// # Errors
/// - [`SpmmError::DeviceMismatch`](crate::error::SpmmError::DeviceMismatch)
///   if any input reports non-CPU residency.
/// - [`SpmmError::ShapeMismatch`](crate::error::SpmmError::ShapeMismatch)
///   if `rowptr`, `col` or `value` is not one-dimensional, `value`'s
///   length differs from `col`'s, `mat` has fewer than two dimensions, or
///   the batch arithmetic does not divide evenly.
/// - [`SpmmError::UnknownReduction`](crate::error::SpmmError::UnknownReduction)
///   for an unrecognized `reduce` token.
///
/// # Example
/// ```rust
/// use csrmm::tensors::Tensor;
/// use csrmm::ops::dispatch::spmm;
///
/// let rowptr = Tensor::new(vec![3], vec![0i64, 1, 2]);
/// let col = Tensor::new(vec![2], vec![0i64, 1]);
/// let mat = Tensor::new(vec![2, 1], vec![3.0f64, 5.0]);
/// let (out, _) = spmm(&rowptr, &col, None, &mat, "mean").unwrap();
/// assert_eq!(out.data, vec![3.0, 5.0]);
/// ```
pub fn spmm<T: Scalar>(
    rowptr: &Tensor<i64>,
    col: &Tensor<i64>,
    value: Option<&Tensor<T>>,
    mat: &Tensor<T>,
    reduce: &str,
) -> Result<(Tensor<T>, Option<Tensor<i64>>)> {
    rowptr.device().ensure_cpu("rowptr")?;
    col.device().ensure_cpu("col")?;
    if let Some(v) = value {
        v.device().ensure_cpu("value")?;
    }
    mat.device().ensure_cpu("mat")?;

    ensure_1d(rowptr, "rowptr")?;
    ensure_1d(col, "col")?;
    if rowptr.numel() == 0 {
        return Err(SpmmError::ShapeMismatch {
            tensor: "rowptr",
            reason: "must hold at least one offset".to_string(),
        });
    }
    if let Some(v) = value {
        ensure_1d(v, "value")?;
        if v.numel() != col.numel() {
            return Err(SpmmError::ShapeMismatch {
                tensor: "value",
                reason: format!("holds {} weights for {} edges", v.numel(), col.numel()),
            });
        }
    }
    ensure_matrix(mat, "mat")?;
    let (b, n, k) = batched_dims(mat, "mat")?;

    let reduction = Reduction::from_name(reduce)?;

    let m = rowptr.numel() - 1;
    let e = col.numel();
    debug!("spmm: B={b} M={m} N={n} K={k} E={e} reduce={reduction:?}");

    let mut out_shape = mat.shape.clone();
    let dims = out_shape.len();
    out_shape[dims - 2] = m;
    let mut out = Tensor::<T>::zeros(out_shape.clone());

    let mut arg_out = if reduction.tracks_arg() {
        Some(Tensor::new(out_shape, vec![e as i64; out.numel()]))
    } else {
        None
    };

    let value_data = value.map(|v| v.data.as_slice());
    let arg_data = arg_out.as_mut().map(|a| a.data.as_mut_slice());

    match reduction {
        Reduction::Sum => cpu::spmm::<T, SumReducer>(
            &rowptr.data, &col.data, value_data, &mat.data, &mut out.data, arg_data, m, n, k,
        ),
        Reduction::Mean => cpu::spmm::<T, MeanReducer>(
            &rowptr.data, &col.data, value_data, &mat.data, &mut out.data, arg_data, m, n, k,
        ),
        Reduction::Min => cpu::spmm::<T, MinReducer>(
            &rowptr.data, &col.data, value_data, &mat.data, &mut out.data, arg_data, m, n, k,
        ),
        Reduction::Max => cpu::spmm::<T, MaxReducer>(
            &rowptr.data, &col.data, value_data, &mat.data, &mut out.data, arg_data, m, n, k,
        ),
    }

    Ok((out, arg_out))
}

/// Gradient of [`spmm`] with respect to the edge values, one scalar per
/// edge, summed over the batch dimension.
///
/// `row` is the edge-list counterpart of `rowptr`: the originating row of
/// every edge, in edge order. `rowptr` itself is consulted only under
/// `"mean"`, for the per-row degree divisor.
///
/// The sum/mean dot-product formula is applied for whatever reduction tag
/// is passed; it is the documented gradient only for `"sum"`/`"add"` and
/// `"mean"`. Min/max gradients route through the recorded winners instead,
/// see [`crate::backprop::spmm`].
///
/// # Errors
/// The same taxonomy as [`spmm`], with `grad` validated like `mat` and
/// additionally required to agree with it on the batch and feature
/// dimensions.
pub fn spmm_value_backward<T: Scalar>(
    row: &Tensor<i64>,
    rowptr: &Tensor<i64>,
    col: &Tensor<i64>,
    mat: &Tensor<T>,
    grad: &Tensor<T>,
    reduce: &str,
) -> Result<Tensor<T>> {
    row.device().ensure_cpu("row")?;
    rowptr.device().ensure_cpu("rowptr")?;
    col.device().ensure_cpu("col")?;
    mat.device().ensure_cpu("mat")?;
    grad.device().ensure_cpu("grad")?;

    ensure_1d(row, "row")?;
    ensure_1d(rowptr, "rowptr")?;
    ensure_1d(col, "col")?;
    if col.numel() != row.numel() {
        return Err(SpmmError::ShapeMismatch {
            tensor: "col",
            reason: format!(
                "indexes {} edges where `row` lists {}",
                col.numel(),
                row.numel()
            ),
        });
    }
    ensure_matrix(mat, "mat")?;
    ensure_matrix(grad, "grad")?;
    let (b, n, k) = batched_dims(mat, "mat")?;
    let (b_grad, m, k_grad) = batched_dims(grad, "grad")?;
    if k_grad != k || b_grad != b {
        return Err(SpmmError::ShapeMismatch {
            tensor: "grad",
            reason: format!(
                "batches {b_grad}x{k_grad} features where `mat` has {b}x{k}"
            ),
        });
    }

    let reduction = Reduction::from_name(reduce)?;

    let e = row.numel();
    debug!("spmm_value_backward: B={b} M={m} N={n} K={k} E={e} reduce={reduction:?}");

    let mut grad_value = Tensor::<T>::zeros(vec![e]);
    cpu::spmm_value_backward(
        &row.data,
        &rowptr.data,
        &col.data,
        &mat.data,
        &grad.data,
        &mut grad_value.data,
        b,
        m,
        n,
        k,
        reduction,
    );

    Ok(grad_value)
}

/// Winner-routed gradient for min/max forward calls, used by the
/// differentiable wrapper. `arg_out` is the index tensor the forward call
/// produced alongside `out`.
pub(crate) fn spmm_arg_value_backward<T: Scalar>(
    col: &Tensor<i64>,
    arg_out: &Tensor<i64>,
    mat: &Tensor<T>,
    grad: &Tensor<T>,
) -> Result<Tensor<T>> {
    col.device().ensure_cpu("col")?;
    arg_out.device().ensure_cpu("arg_out")?;
    mat.device().ensure_cpu("mat")?;
    grad.device().ensure_cpu("grad")?;

    ensure_1d(col, "col")?;
    ensure_matrix(mat, "mat")?;
    ensure_matrix(grad, "grad")?;
    let (b, n, k) = batched_dims(mat, "mat")?;
    let (_, m, _) = batched_dims(grad, "grad")?;
    if arg_out.numel() != grad.numel() {
        return Err(SpmmError::ShapeMismatch {
            tensor: "arg_out",
            reason: format!(
                "holds {} entries where `grad` has {}",
                arg_out.numel(),
                grad.numel()
            ),
        });
    }

    let mut grad_value = Tensor::<T>::zeros(vec![col.numel()]);
    cpu::spmm_arg_value_backward(
        &col.data,
        &arg_out.data,
        &mat.data,
        &grad.data,
        &mut grad_value.data,
        b,
        m,
        n,
        k,
    );

    Ok(grad_value)
}
