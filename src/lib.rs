//! csrmm: sparse-dense matrix products with per-row reductions.
//!
//! The crate implements the aggregation primitive behind neighborhood
//! operators in graph learning: for every row of a CSR adjacency, combine
//! the (optionally weighted) feature vectors of its nonzero columns into a
//! single output vector, using a configurable reduction (sum, mean, min or
//! max). It also computes the gradient of that product with respect to the
//! per-edge weights, so the adjacency values can be trained.
//!
//! # Features
//!
//! - Forward sparse × dense multiplication over a batched dense matrix,
//!   with sum/mean/min/max row reductions and winner-index tracking for
//!   min/max.
//! - Backward pass producing one gradient scalar per edge.
//! - Generic over the element type (`f32`, `f64`, `i32`, `i64`).
//! - Row-parallel execution via `rayon`.
//!
//! # Goals
//!
//! - Match the reference aggregation semantics exactly, including tie-break
//!   order and empty-row behavior.
//! - Validate everything at the call boundary; keep the hot loops free of
//!   checks and branches.
//! - Stay small: two kernels, a reduction strategy, and the plumbing they
//!   need.
//!
//! # Modules
//!
//! - [`tensors`] — Dense tensor containers and the `Scalar` element trait.
//! - [`reduce`] — Reduction selection and the per-row accumulation strategy.
//! - [`ops`] — Kernels and the validated `spmm` / `spmm_value_backward`
//!   entry points.
//! - [`backprop`] — Closure-style differentiable wrapper over the entry
//!   points.
//! - [`backend`] — Execution-domain (device) tagging and defaults.
//! - [`error`] — Error taxonomy shared by the fallible surface.
//!
//! # Example
//!
//! ```rust
//! use csrmm::tensors::Tensor;
//! use csrmm::ops::dispatch::spmm;
//!
//! // Two rows, one edge each: an identity-like adjacency.
//! let rowptr = Tensor::new(vec![3], vec![0i64, 1, 2]);
//! let col = Tensor::new(vec![2], vec![0i64, 1]);
//! let mat = Tensor::new(vec![2, 1], vec![3.0f64, 5.0]);
//!
//! let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "sum").unwrap();
//! assert_eq!(out.data, vec![3.0, 5.0]);
//! assert!(arg_out.is_none());
//! ```

pub mod approx;
pub mod backend;
pub mod backprop;
pub mod error;
pub mod ops;
pub mod reduce;
pub mod tensors;
