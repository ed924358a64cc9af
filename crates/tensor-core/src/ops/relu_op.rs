// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Rectified linear unit.

use crate::{DType, Tensor, TensorError};

/// Applies `max(x, 0)` element-wise into a pre-allocated `f32` output.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn relu(input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    check_same_shape("relu", input, output)?;

    let src = input.as_f32();
    for (d, &x) in output.as_f32_slice_mut().iter_mut().zip(src.iter()) {
        *d = x.max(0.0);
    }
    Ok(())
}

/// Gradient of [`relu`]: passes `grad_output` where the forward output was
/// positive and zeroes it elsewhere.
///
/// `forward_output` is the tensor `relu` produced; `grad_input` receives the
/// result.
pub fn relu_backward(
    forward_output: &Tensor,
    grad_output: &Tensor,
    grad_input: &mut Tensor,
) -> Result<(), TensorError> {
    if forward_output.shape() != grad_output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "relu_backward",
            lhs: forward_output.shape().clone(),
            rhs: grad_output.shape().clone(),
        });
    }
    check_same_shape("relu_backward", grad_output, grad_input)?;

    let y = forward_output.as_f32();
    let g = grad_output.as_f32();
    for ((d, &yi), &gi) in grad_input.as_f32_slice_mut().iter_mut().zip(y.iter()).zip(g.iter()) {
        *d = if yi > 0.0 { gi } else { 0.0 };
    }
    Ok(())
}

/// In-place ReLU on a raw buffer; used by fused producer kernels.
#[inline]
pub(crate) fn relu_in_place(values: &mut [f32]) {
    values.iter_mut().for_each(|x| *x = x.max(0.0));
}

fn check_same_shape(op: &'static str, input: &Tensor, output: &Tensor) -> Result<(), TensorError> {
    if input.shape() != output.shape() || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    input.ensure_same_device(op, output)
}
