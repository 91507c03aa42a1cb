//! # Operation Dispatch Layer
//!
//! This module hosts the spmm kernels and the validated entry points in
//! front of them.
//!
//! ## Submodules
//!
//! - [`cpu`] — Multi-threaded CPU kernels (the only execution domain)
//! - [`dispatch`] — Boundary validation and monomorphized kernel selection
//!
//! ## Call path
//!
//! Callers go through [`dispatch`]: it checks device residency, shapes and
//! the reduction token, allocates the outputs, and hands flat slices to a
//! kernel specialized for the chosen reduction. The kernels themselves
//! perform no checking; by the time they run, every contract except
//! column-index range (undefined behavior by contract) has been enforced.
//!
//! Example:
//! ```rust
//! use csrmm::tensors::Tensor;
//! use csrmm::ops::dispatch::spmm;
//!
//! let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
//! let col = Tensor::new(vec![2], vec![0i64, 1]);
//! let mat = Tensor::new(vec![2, 1], vec![1.0f64, 4.0]);
//! let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "max").unwrap();
//! assert_eq!(out.data, vec![4.0]);
//! assert_eq!(arg_out.unwrap().data, vec![1]);
//! ```

pub mod cpu;
pub mod dispatch;
