// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Element-wise and matmul kernels write into pre-allocated `f32` outputs;
//! convolution and pooling allocate their result since the output extent
//! depends on the window geometry.

mod conv_op;
mod matmul_op;
mod pool_op;
mod relu_op;
mod softmax_op;

pub use conv_op::{conv2d, conv2d_backward, Conv2dGrads, Conv2dParams};
pub use matmul_op::matmul;
pub use pool_op::{max_pool2d, max_pool2d_backward, PoolOutput};
pub use relu_op::{relu, relu_backward};
pub use softmax_op::softmax;
