//! Differentiable wrapper over the spmm entry points.
//!
//! # Autograd Pattern
//!
//! Each operation returns its forward value(s) plus a backward closure
//! capturing the minimal data needed to map an upstream gradient to input
//! gradients:
//!
//! 1. **Inputs** are plain tensors; the trainable edge weights arrive as a
//!    `WithGrad<Tensor<T>>`.
//! 2. **Forward Pass** runs through [`crate::ops::dispatch`].
//! 3. **Backward Pass** is a closure producing one gradient scalar per
//!    edge from `dL/d(out)`.
//! 4. **Gradient Application** is up to the caller, e.g. accumulating into
//!    the `WithGrad` wrapper.
//!
//! The backward route depends on the reduction: sum and mean differentiate
//! through every edge (the dot-product formula), while min and max route
//! the gradient only through the winning edge recorded per output element
//! during the forward pass; an edge that never won receives zero.

use crate::error::Result;
use crate::ops::dispatch;
use crate::reduce::Reduction;
use crate::tensors::{Scalar, Tensor, WithGrad};

/// What the backward closure needs, fixed at forward time.
enum BackRoute {
    /// Sum/mean: the expanded edge-list rows and the reduction token.
    Dot(Tensor<i64>, String),
    /// Min/max: the winner indices the forward pass produced.
    Winners(Tensor<i64>),
}

/// Expands CSR row offsets into one originating-row entry per edge.
fn expand_rowptr(rowptr: &Tensor<i64>, edges: usize) -> Tensor<i64> {
    let mut row = vec![0i64; edges];
    for mi in 0..rowptr.numel().saturating_sub(1) {
        let start = rowptr.data[mi] as usize;
        let end = rowptr.data[mi + 1] as usize;
        for slot in &mut row[start..end] {
            *slot = mi as i64;
        }
    }
    Tensor::new(vec![edges], row)
}

/// Sparse × dense product with a per-row reduction, plus its backward pass
/// with respect to the edge values.
///
/// # Returns
/// - `out`: the aggregated tensor, shaped like `mat` with the row
///   dimension replaced by the adjacency's row count.
/// - `arg_out`: winner indices for `"min"`/`"max"`, `None` otherwise.
/// - `back`: closure mapping `dL/d(out)` to a gradient tensor with one
///   entry per edge, summed over the batch dimension. It is returned even
///   when `value` is absent, since the gradient is well-defined for the
///   implicit unit weights.
///
/// # Errors
/// Everything [`dispatch::spmm`] reports; the closure itself propagates
/// the backward entry point's validation of `grad`.
///
/// # Example
/// ```rust
/// use csrmm::backprop::spmm;
/// use csrmm::tensors::{Tensor, WithGrad};
///
/// let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
/// let col = Tensor::new(vec![2], vec![0i64, 1]);
/// let value = WithGrad::new(Tensor::new(vec![2], vec![1.0f64, 2.0]));
/// let mat = Tensor::new(vec![2, 1], vec![3.0, 5.0]);
///
/// let (out, _, back) = spmm(&rowptr, &col, Some(&value), &mat, "sum").unwrap();
/// assert_eq!(out.data, vec![13.0]);
///
/// let grad_value = back(&Tensor::new(vec![1, 1], vec![1.0])).unwrap();
/// assert_eq!(grad_value.data, vec![3.0, 5.0]);
/// ```
pub fn spmm<'a, T: Scalar>(
    rowptr: &'a Tensor<i64>,
    col: &'a Tensor<i64>,
    value: Option<&'a WithGrad<Tensor<T>>>,
    mat: &'a Tensor<T>,
    reduce: &str,
) -> Result<(
    Tensor<T>,
    Option<Tensor<i64>>,
    impl Fn(&Tensor<T>) -> Result<Tensor<T>> + 'a,
)> {
    let reduction = Reduction::from_name(reduce)?;
    let (out, arg_out) = dispatch::spmm(rowptr, col, value.map(|v| &v.value), mat, reduce)?;

    let route = match &arg_out {
        Some(arg) if reduction.tracks_arg() => BackRoute::Winners(arg.clone()),
        _ => BackRoute::Dot(expand_rowptr(rowptr, col.numel()), reduce.to_string()),
    };

    let back = move |grad: &Tensor<T>| -> Result<Tensor<T>> {
        match &route {
            BackRoute::Dot(row, name) => {
                dispatch::spmm_value_backward(row, rowptr, col, mat, grad, name)
            }
            BackRoute::Winners(arg) => dispatch::spmm_arg_value_backward(col, arg, mat, grad),
        }
    };

    Ok((out, arg_out, back))
}
