// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use crate::{DType, Tensor, TensorError};

/// Computes softmax along the last dimension: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Subtracts the row maximum before exponentiation so large logits do not
/// overflow. `output` must be an `f32` tensor with the shape of `input`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn softmax(input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    if input.shape() != output.shape() || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "softmax",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let last_dim = match input.shape().dims().last() {
        Some(&d) => d,
        None => {
            output.as_f32_slice_mut()[0] = 1.0;
            return Ok(());
        }
    };
    if last_dim == 0 {
        return Ok(());
    }

    let src = input.as_f32();
    let dst = output.as_f32_slice_mut();

    for (row_src, row_dst) in src.chunks(last_dim).zip(dst.chunks_mut(last_dim)) {
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src) {
            let e = (s - max_val).exp();
            *d = e;
            sum += e;
        }

        if sum > 0.0 {
            let inv_sum = 1.0 / sum;
            row_dst.iter_mut().for_each(|d| *d *= inv_sum);
        }
    }

    Ok(())
}
