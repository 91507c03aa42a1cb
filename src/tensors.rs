//! Dense tensor containers and element typing.
//!
//! # Host Tensor Model
//!
//! This module defines the dense, contiguous, row-major buffers the spmm
//! kernels consume and produce, together with the [`Scalar`] trait that
//! bounds the element types the kernels are generic over.
//!
//! It supports:
//! - Construction of N-dimensional tensors with shape checking
//! - Device tagging, so the dispatch layer can refuse non-CPU residents
//! - Zero-filled allocation for outputs and gradients
//! - `WithGrad` pairing of a value with its gradient buffer
//! - Compile-time tensor literals via the `tensor!` macro
//!
//! ## Design Highlights
//! - Tensors are strongly typed: `Tensor<T>` for any [`Scalar`] element
//!   (and `Tensor<i64>` for index data such as `rowptr`, `col`, `arg_out`)
//! - Shape is stored as a `Vec<usize>` and enforced at construction
//! - The device tag is metadata only; no transfer machinery lives here
//!
//! ## Limitations
//! - Row-major only; the last two dimensions must describe the matrix part
//!   of a batched input, with leading dimensions collapsing into the batch
//! - No broadcasting, slicing, or shape inference
//!
//! ## Example
//!
//! ```rust
//! use csrmm::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert_eq!(t.numel(), 6);
//! ```

use crate::backend::{Device, default_device};
use std::ops::{Add, Div, Mul, Sub};

/// Element types the kernels are generic over.
///
/// Covers the signed integer and floating types of the reference dispatch.
/// The bound constants are the reduction identities: [`Scalar::GREATEST`]
/// seeds a running minimum, [`Scalar::LOWEST`] a running maximum. For the
/// float impls these are `±∞`, for the integer impls `MAX`/`MIN`.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + PartialOrd
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Additive identity; also the value empty rows aggregate to.
    const ZERO: Self;

    /// Lower bound of the value domain (identity for a max reduction).
    const LOWEST: Self;

    /// Upper bound of the value domain (identity for a min reduction).
    const GREATEST: Self;

    /// Converts a row degree into the element type, for the mean divisor.
    fn from_count(count: usize) -> Self;
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const LOWEST: Self = f32::NEG_INFINITY;
    const GREATEST: Self = f32::INFINITY;

    #[inline]
    fn from_count(count: usize) -> Self {
        count as f32
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const LOWEST: Self = f64::NEG_INFINITY;
    const GREATEST: Self = f64::INFINITY;

    #[inline]
    fn from_count(count: usize) -> Self {
        count as f64
    }
}

impl Scalar for i32 {
    const ZERO: Self = 0;
    const LOWEST: Self = i32::MIN;
    const GREATEST: Self = i32::MAX;

    #[inline]
    fn from_count(count: usize) -> Self {
        count as i32
    }
}

impl Scalar for i64 {
    const ZERO: Self = 0;
    const LOWEST: Self = i64::MIN;
    const GREATEST: Self = i64::MAX;

    #[inline]
    fn from_count(count: usize) -> Self {
        count as i64
    }
}

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
/// - Every tensor carries a [`Device`] tag naming where it resides; new
///   tensors land on the global default device.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
    device: Device,
}

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data, placed on
    /// the global default device.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self {
            shape,
            data,
            device: default_device(),
        }
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// The device this tensor reports residing on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Retags the tensor onto `device`.
    ///
    /// No data moves; the tag is what the dispatch layer validates. It
    /// exists so callers (and tests) can model tensors that live outside
    /// the CPU execution domain.
    #[must_use]
    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

impl<T: Scalar> Tensor<T> {
    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let n = shape.iter().product::<usize>();
        Self::new(shape, vec![T::ZERO; n])
    }

    /// Creates a zero-filled tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }
}

/// A container for tracking gradients of values (used in autograd).
///
/// Typically used as `WithGrad<Tensor<f32>>` around a trainable edge-value
/// tensor.
#[derive(Debug, Clone)]
pub struct WithGrad<T> {
    pub value: T,
    pub grad: T,
}

impl<T: Scalar> WithGrad<Tensor<T>> {
    /// Wraps a tensor with a zero-initialized gradient of the same shape.
    pub fn new(value: Tensor<T>) -> Self {
        let grad = value.zeros_like();
        Self { value, grad }
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use csrmm::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![$lit])
    };

    ([ $( $inner:tt ),+ $(,)? ]) => {{
        let children = vec![ $( tensor!($inner) ),+ ];
        let first_shape = &children[0].shape;
        assert!(children.iter().all(|c| c.shape == *first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for c in children { data.extend(c.data); }
        $crate::tensors::Tensor::new(shape, data)
    }};
}
