// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Image batches use NCHW order: `[batch, channels, height, width]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Creates a 4-D image-batch shape.
    pub fn nchw(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            dims: vec![batch, channels, height, width],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Leading (batch) dimension; 1 for scalars.
    pub fn batch(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Same shape with the leading dimension replaced.
    pub fn with_batch(&self, batch: usize) -> Self {
        let mut dims = self.dims.clone();
        if let Some(first) = dims.first_mut() {
            *first = batch;
        }
        Self { dims }
    }

    /// Number of elements in one sample (all dims but the first).
    pub fn sample_elements(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Computes row-major (C-order) strides for this shape.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        if rank == 0 {
            return vec![];
        }
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = 1;
        for i in (0..rank - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Returns `true` if the shapes are compatible for a matrix multiply:
    /// `self` is `[M, K]` and `other` is `[K, N]`.
    pub fn is_matmul_compatible(&self, other: &Shape) -> bool {
        self.rank() == 2 && other.rank() == 2 && self.dims[1] == other.dims[0]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.batch(), 1);
        assert!(s.strides().is_empty());
    }

    #[test]
    fn test_nchw() {
        let s = Shape::nchw(8, 3, 32, 32);
        assert_eq!(s.rank(), 4);
        assert_eq!(s.batch(), 8);
        assert_eq!(s.sample_elements(), 3 * 32 * 32);
        assert_eq!(s.strides(), vec![3 * 32 * 32, 32 * 32, 32, 1]);
    }

    #[test]
    fn test_with_batch() {
        let s = Shape::nchw(8, 3, 4, 4).with_batch(2);
        assert_eq!(s, Shape::nchw(2, 3, 4, 4));
        assert_eq!(Shape::scalar().with_batch(5), Shape::scalar());
    }

    #[test]
    fn test_matmul_compatible() {
        assert!(Shape::matrix(3, 4).is_matmul_compatible(&Shape::matrix(4, 5)));
        assert!(!Shape::matrix(3, 4).is_matmul_compatible(&Shape::matrix(5, 5)));
        assert!(!Shape::vector(4).is_matmul_compatible(&Shape::matrix(4, 5)));
    }

    #[test]
    fn test_size_bytes() {
        let s = Shape::new(vec![10, 20]);
        assert_eq!(s.size_bytes(DType::F32), 800);
        assert_eq!(s.size_bytes(DType::F16), 400);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::nchw(1, 3, 224, 224)), "[1, 3, 224, 224]");
    }
}
