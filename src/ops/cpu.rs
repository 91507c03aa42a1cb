//! Parallel CPU kernels for sparse-dense aggregation.
//!
//! # CPU Kernels
//!
//! The three kernels in this module do the actual work behind the
//! dispatch-layer entry points:
//!
//! - [`spmm`] — forward multiply-with-reduction over a CSR adjacency
//! - [`spmm_value_backward`] — per-edge value gradient (sum/mean formula)
//! - [`spmm_arg_value_backward`] — per-edge value gradient routed through
//!   recorded min/max winners
//!
//! ## Parallelism
//!
//! - The forward kernel parallelizes over output rows with
//!   [`rayon`](https://docs.rs/rayon): each `(batch, row)` pair writes a
//!   disjoint `K`-length slice of the output, so no locking is needed.
//! - The backward kernel parallelizes over edges; each edge owns its
//!   `grad_value` slot and iterates the batch dimension sequentially, so
//!   accumulation needs no synchronization either.
//! - The arg-routed backward is a scatter whose targets collide across
//!   rows; it runs sequentially.
//!
//! ## Contracts
//!
//! Inputs are validated by the dispatch layer before these run. The
//! kernels assume 1-D index slices of the documented lengths, a contiguous
//! row-major `mat`, and column indices inside `[0, N)`; violating the last
//! is undefined behavior, not a checked error.

use crate::reduce::{Reducer, Reduction};
use crate::tensors::Scalar;
use rayon::prelude::*;

/// Scans one adjacency row, folding every edge's contribution into the
/// per-feature accumulators. Returns the row degree.
///
/// The optional edge-value slice is matched once out here, so the edge
/// loop itself carries no per-edge branch for the weighted case.
#[inline]
fn scan_row<T: Scalar, R: Reducer<T>>(
    rowptr: &[i64],
    col: &[i64],
    value: Option<&[T]>,
    mat: &[T],
    bi: usize,
    mi: usize,
    n: usize,
    k: usize,
    vals: &mut [T],
    args: &mut [i64],
) -> usize {
    let row_start = rowptr[mi] as usize;
    let row_end = rowptr[mi + 1] as usize;
    let offset = bi * n * k;

    match value {
        Some(val) => {
            for e in row_start..row_end {
                let c = col[e] as usize;
                let w = val[e];
                for kk in 0..k {
                    R::update(&mut vals[kk], w * mat[offset + c * k + kk], &mut args[kk], e as i64);
                }
            }
        }
        None => {
            for e in row_start..row_end {
                let c = col[e] as usize;
                for kk in 0..k {
                    R::update(&mut vals[kk], mat[offset + c * k + kk], &mut args[kk], e as i64);
                }
            }
        }
    }

    row_end - row_start
}

/// Forward sparse × dense product with a per-row reduction.
///
/// Computes, for every batch `bi` and output row `mi`, the reduction `R`
/// of `value[e] * mat[bi, col[e], :]` (or the unscaled rows when `value`
/// is absent) over the edges `e` of row `mi`, writing into
/// `out[bi, mi, :]`. When `arg_out` is supplied (min/max), the winning
/// edge index per feature is written alongside; rows of degree zero leave
/// the pre-filled sentinel untouched.
///
/// `out` has `b * m * k` elements, `mat` has `b * n * k`.
pub(crate) fn spmm<T: Scalar, R: Reducer<T>>(
    rowptr: &[i64],
    col: &[i64],
    value: Option<&[T]>,
    mat: &[T],
    out: &mut [T],
    arg_out: Option<&mut [i64]>,
    m: usize,
    n: usize,
    k: usize,
) {
    if k == 0 {
        return;
    }

    match arg_out {
        Some(arg) => {
            out.par_chunks_mut(k)
                .zip(arg.par_chunks_mut(k))
                .enumerate()
                .for_each(|(i, (out_row, arg_row))| {
                    let (bi, mi) = (i / m, i % m);
                    let mut vals = vec![R::init(); k];
                    let mut args = vec![0i64; k];
                    let count =
                        scan_row::<T, R>(rowptr, col, value, mat, bi, mi, n, k, &mut vals, &mut args);
                    for kk in 0..k {
                        R::write(&mut out_row[kk], vals[kk], Some(&mut arg_row[kk]), args[kk], count);
                    }
                });
        }
        None => {
            out.par_chunks_mut(k).enumerate().for_each(|(i, out_row)| {
                let (bi, mi) = (i / m, i % m);
                let mut vals = vec![R::init(); k];
                let mut args = vec![0i64; k];
                let count =
                    scan_row::<T, R>(rowptr, col, value, mat, bi, mi, n, k, &mut vals, &mut args);
                for kk in 0..k {
                    R::write(&mut out_row[kk], vals[kk], None, args[kk], count);
                }
            });
        }
    }
}

/// Gradient of the forward product with respect to the edge values,
/// using the sum/mean formula.
///
/// For every edge `e` with endpoints `r = row[e]`, `c = col[e]`, this is
/// the feature dot product `mat[bi, c, :] · grad[bi, r, :]`, divided by
/// the clamped row degree under [`Reduction::Mean`], accumulated over the
/// batch dimension into `grad_value[e]`.
///
/// The formula is applied for whatever reduction tag arrives; it is the
/// documented gradient only for sum and mean.
pub(crate) fn spmm_value_backward<T: Scalar>(
    row: &[i64],
    rowptr: &[i64],
    col: &[i64],
    mat: &[T],
    grad: &[T],
    grad_value: &mut [T],
    b: usize,
    m: usize,
    n: usize,
    k: usize,
    reduce: Reduction,
) {
    let mean = reduce == Reduction::Mean;

    grad_value.par_iter_mut().enumerate().for_each(|(e, gv)| {
        let r = row[e] as usize;
        let c = col[e] as usize;
        let mut total = T::ZERO;

        for bi in 0..b {
            let mut val = T::ZERO;
            for kk in 0..k {
                val = val + mat[bi * n * k + c * k + kk] * grad[bi * m * k + r * k + kk];
            }
            if mean {
                let count = (rowptr[r + 1] - rowptr[r]).max(1) as usize;
                val = val / T::from_count(count);
            }
            total = total + val;
        }

        *gv = total;
    });
}

/// Gradient of a min/max forward product with respect to the edge values.
///
/// Routes the upstream gradient only through the winners recorded in
/// `arg_out`: for each output element whose entry is a real edge index
/// (anything below the sentinel `E`), `grad * mat[bi, col[e], kk]` is
/// scattered into that edge's slot. Sentinel entries (empty rows)
/// contribute nothing, as do edges that never won an element.
pub(crate) fn spmm_arg_value_backward<T: Scalar>(
    col: &[i64],
    arg_out: &[i64],
    mat: &[T],
    grad: &[T],
    grad_value: &mut [T],
    b: usize,
    m: usize,
    n: usize,
    k: usize,
) {
    let sentinel = grad_value.len() as i64;

    for bi in 0..b {
        for mi in 0..m {
            for kk in 0..k {
                let idx = bi * m * k + mi * k + kk;
                let e = arg_out[idx];
                if e < sentinel {
                    let c = col[e as usize] as usize;
                    grad_value[e as usize] =
                        grad_value[e as usize] + grad[idx] * mat[bi * n * k + c * k + kk];
                }
            }
        }
    }
}
