// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Trainable parameters.

use crate::NnError;
use tensor_core::{DType, Device, Tensor, TensorError};

/// A trainable tensor and its accumulated gradient.
///
/// Gradients are always kept in `f32`, whatever the value's dtype.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub value: Tensor,
    pub grad: Option<Tensor>,
}

impl Parameter {
    pub fn new(value: Tensor) -> Self {
        Self { value, grad: None }
    }

    pub fn num_elements(&self) -> usize {
        self.value.num_elements()
    }

    /// Drops the accumulated gradient.
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Adds `grad` to the accumulated gradient.
    pub fn accumulate(&mut self, grad: Tensor) -> Result<(), NnError> {
        if grad.shape() != self.value.shape() {
            return Err(TensorError::ShapeMismatch {
                op: "accumulate_grad",
                lhs: self.value.shape().clone(),
                rhs: grad.shape().clone(),
            }
            .into());
        }
        match &mut self.grad {
            Some(existing) => {
                let incoming = grad.as_f32();
                existing
                    .as_f32_slice_mut()
                    .iter_mut()
                    .zip(incoming.iter())
                    .for_each(|(a, b)| *a += b);
            }
            None => self.grad = Some(grad.to_dtype(DType::F32)),
        }
        Ok(())
    }

    pub(crate) fn cast(&mut self, dtype: DType) {
        self.value = self.value.to_dtype(dtype);
    }

    pub(crate) fn to_device(&mut self, device: Device) {
        self.value.set_device(device);
        if let Some(g) = &mut self.grad {
            g.set_device(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_accumulate_sums() {
        let mut p = Parameter::new(Tensor::zeros(Shape::vector(2), DType::F32));
        p.accumulate(Tensor::from_f32(Shape::vector(2), &[1.0, 2.0]).unwrap()).unwrap();
        p.accumulate(Tensor::from_f32(Shape::vector(2), &[0.5, 0.5]).unwrap()).unwrap();
        assert_eq!(p.grad.as_ref().unwrap().as_f32_slice(), &[1.5, 2.5]);

        p.zero_grad();
        assert!(p.grad.is_none());
    }

    #[test]
    fn test_accumulate_shape_mismatch() {
        let mut p = Parameter::new(Tensor::zeros(Shape::vector(2), DType::F32));
        assert!(p.accumulate(Tensor::zeros(Shape::vector(3), DType::F32)).is_err());
    }

    #[test]
    fn test_half_value_keeps_f32_grad() {
        let mut p = Parameter::new(Tensor::zeros(Shape::vector(2), DType::F32));
        p.cast(DType::F16);
        p.accumulate(Tensor::from_f32(Shape::vector(2), &[1.0, 1.0]).unwrap()).unwrap();
        assert_eq!(p.value.dtype(), DType::F16);
        assert_eq!(p.grad.unwrap().dtype(), DType::F32);
    }
}
