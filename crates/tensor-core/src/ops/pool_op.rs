// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max pooling over NCHW tensors.

use super::conv_op::dims4;
use crate::{Conv2dParams, Shape, Tensor, TensorError};

/// Result of [`max_pool2d`]: the pooled tensor plus, for every output
/// element, the flat input index of the selected maximum.
#[derive(Debug)]
pub struct PoolOutput {
    pub output: Tensor,
    pub argmax: Vec<usize>,
}

/// Square-window max pooling. Padded positions never win.
pub fn max_pool2d(
    input: &Tensor,
    kernel: usize,
    params: Conv2dParams,
) -> Result<PoolOutput, TensorError> {
    input.ensure_rank("max_pool2d", 4)?;
    let [n, c, h, w] = dims4(input.shape());
    let (oh, ow) = params.output_hw("max_pool2d", h, w, kernel, kernel)?;

    let x = input.as_f32();
    let mut out = vec![0.0f32; n * c * oh * ow];
    let mut argmax = vec![0usize; out.len()];

    for plane in 0..n * c {
        let base = plane * h * w;
        for oy in 0..oh {
            for ox in 0..ow {
                let mut best = f32::NEG_INFINITY;
                let mut best_idx = base;
                for ki in 0..kernel {
                    let iy = (oy * params.stride + ki) as isize - params.padding as isize;
                    if iy < 0 || iy as usize >= h {
                        continue;
                    }
                    for kj in 0..kernel {
                        let ix = (ox * params.stride + kj) as isize - params.padding as isize;
                        if ix < 0 || ix as usize >= w {
                            continue;
                        }
                        let idx = base + iy as usize * w + ix as usize;
                        if x[idx] > best {
                            best = x[idx];
                            best_idx = idx;
                        }
                    }
                }
                let o = (plane * oh + oy) * ow + ox;
                out[o] = best;
                argmax[o] = best_idx;
            }
        }
    }

    Ok(PoolOutput {
        output: Tensor::from_vec(Shape::nchw(n, c, oh, ow), out)?.to_device(input.device()),
        argmax,
    })
}

/// Routes each output gradient back to the input position that won the
/// forward max.
pub fn max_pool2d_backward(
    grad_output: &Tensor,
    argmax: &[usize],
    input_shape: &Shape,
) -> Result<Tensor, TensorError> {
    if grad_output.num_elements() != argmax.len() {
        return Err(TensorError::ElementCountMismatch {
            shape: grad_output.shape().clone(),
            expected: argmax.len(),
            actual: grad_output.num_elements(),
        });
    }
    let dy = grad_output.as_f32();
    let mut dx = vec![0.0f32; input_shape.num_elements()];
    for (&g, &idx) in dy.iter().zip(argmax) {
        dx[idx] += g;
    }
    Ok(Tensor::from_vec(input_shape.clone(), dx)?.to_device(grad_output.device()))
}
