// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type.

use crate::{DType, Device, Shape, TensorError};
use half::f16;
use rand::Rng;
use rand_distr::StandardNormal;
use std::borrow::Cow;

/// Typed element buffer.
#[derive(Debug, Clone, PartialEq)]
enum Storage {
    F32(Vec<f32>),
    F16(Vec<f16>),
}

/// An owned, n-dimensional tensor stored in contiguous row-major memory.
///
/// The element type is fixed by the storage variant, so there is no
/// reinterpretation of raw bytes anywhere in the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    device: Device,
    storage: Storage,
}

impl Tensor {
    /// Creates a new host tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24);
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let n = shape.num_elements();
        let storage = match dtype {
            DType::F32 => Storage::F32(vec![0.0; n]),
            DType::F16 => Storage::F16(vec![f16::ZERO; n]),
        };
        Self {
            shape,
            device: Device::Cpu,
            storage,
        }
    }

    /// Creates an `f32` tensor from a slice of values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_vec(shape, values.to_vec())
    }

    /// Creates an `f32` tensor taking ownership of `values`.
    pub fn from_vec(shape: Shape, values: Vec<f32>) -> Result<Self, TensorError> {
        let expected = shape.num_elements();
        if values.len() != expected {
            return Err(TensorError::ElementCountMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            shape,
            device: Device::Cpu,
            storage: Storage::F32(values),
        })
    }

    /// Samples an `f32` tensor from the standard normal distribution.
    pub fn randn<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self {
        let values = (0..shape.num_elements())
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Self {
            shape,
            device: Device::Cpu,
            storage: Storage::F32(values),
        }
    }

    /// Samples an `f32` tensor uniformly from `[0, 1)`.
    pub fn rand<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self {
        let values = (0..shape.num_elements()).map(|_| rng.gen::<f32>()).collect();
        Self {
            shape,
            device: Device::Cpu,
            storage: Storage::F32(values),
        }
    }

    /// Uniform `[0, 1)` tensor with the shape, dtype and device of `self`.
    pub fn rand_like<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        Self::rand(self.shape.clone(), rng)
            .to_dtype(self.dtype())
            .to_device(self.device)
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        match self.storage {
            Storage::F32(_) => DType::F32,
            Storage::F16(_) => DType::F16,
        }
    }

    /// Returns the device tag.
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype())
    }

    /// Moves the tensor to `device`.
    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// In-place form of [`Tensor::to_device`].
    pub fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    /// Returns a copy converted to `dtype`. Values are rounded to nearest
    /// when narrowing to `f16`.
    pub fn to_dtype(&self, dtype: DType) -> Self {
        let storage = match (&self.storage, dtype) {
            (Storage::F32(v), DType::F32) => Storage::F32(v.clone()),
            (Storage::F16(v), DType::F16) => Storage::F16(v.clone()),
            (Storage::F32(v), DType::F16) => {
                Storage::F16(v.iter().map(|&x| f16::from_f32(x)).collect())
            }
            (Storage::F16(v), DType::F32) => {
                Storage::F32(v.iter().map(|x| x.to_f32()).collect())
            }
        };
        Self {
            shape: self.shape.clone(),
            device: self.device,
            storage,
        }
    }

    /// Element values as `f32`, borrowing when no conversion is needed.
    pub fn as_f32(&self) -> Cow<'_, [f32]> {
        match &self.storage {
            Storage::F32(v) => Cow::Borrowed(v.as_slice()),
            Storage::F16(v) => Cow::Owned(v.iter().map(|x| x.to_f32()).collect()),
        }
    }

    /// Interprets the buffer as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &[f32] {
        match &self.storage {
            Storage::F32(v) => v,
            Storage::F16(_) => panic!("as_f32_slice called on f16 tensor"),
        }
    }

    /// Interprets the buffer as a mutable slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        match &mut self.storage {
            Storage::F32(v) => v,
            Storage::F16(_) => panic!("as_f32_slice_mut called on f16 tensor"),
        }
    }

    /// Consumes the tensor and returns its values as `f32`.
    pub fn into_f32_vec(self) -> Vec<f32> {
        match self.storage {
            Storage::F32(v) => v,
            Storage::F16(v) => v.into_iter().map(|x| x.to_f32()).collect(),
        }
    }

    /// Fills the tensor with a constant value in its own dtype.
    pub fn fill(&mut self, value: f32) {
        match &mut self.storage {
            Storage::F32(v) => v.iter_mut().for_each(|x| *x = value),
            Storage::F16(v) => {
                let h = f16::from_f32(value);
                v.iter_mut().for_each(|x| *x = h);
            }
        }
    }

    /// Overwrites this tensor's values with `src`, converting to this
    /// tensor's dtype. Shapes and devices must match.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<(), TensorError> {
        if self.shape != src.shape {
            return Err(TensorError::ShapeMismatch {
                op: "copy_from",
                lhs: self.shape.clone(),
                rhs: src.shape.clone(),
            });
        }
        self.ensure_same_device("copy_from", src)?;
        self.storage = src.to_dtype(self.dtype()).storage;
        Ok(())
    }

    /// Reinterprets the tensor with a new shape of equal element count.
    pub fn reshape(mut self, shape: Shape) -> Result<Self, TensorError> {
        if shape.num_elements() != self.shape.num_elements() {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape,
                rhs: shape,
            });
        }
        self.shape = shape;
        Ok(self)
    }

    /// Returns the transpose of a rank-2 tensor as `f32`.
    pub fn transpose2d(&self) -> Result<Self, TensorError> {
        if self.shape.rank() != 2 {
            return Err(TensorError::RankMismatch {
                op: "transpose2d",
                expected: 2,
                actual: self.shape.clone(),
            });
        }
        let (rows, cols) = (self.shape.dims()[0], self.shape.dims()[1]);
        let src = self.as_f32();
        let mut out = vec![0.0f32; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                out[c * rows + r] = src[r * cols + c];
            }
        }
        Ok(Self::from_vec(Shape::matrix(cols, rows), out)?.to_device(self.device))
    }

    /// Fails with [`TensorError::DeviceMismatch`] unless `other` shares this
    /// tensor's device.
    pub fn ensure_same_device(&self, op: &'static str, other: &Tensor) -> Result<(), TensorError> {
        if self.device != other.device {
            return Err(TensorError::DeviceMismatch {
                op,
                lhs: self.device,
                rhs: other.device,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_rank(&self, op: &'static str, rank: usize) -> Result<(), TensorError> {
        if self.shape.rank() != rank {
            return Err(TensorError::RankMismatch {
                op,
                expected: rank,
                actual: self.shape.clone(),
            });
        }
        Ok(())
    }
}
