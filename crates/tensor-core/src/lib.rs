// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Host tensors and the numerical kernels the benchmark models run on.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major tensor with typed `f32` or `f16` storage.
//! - [`Shape`]: runtime shape descriptors with NCHW helpers.
//! - [`DType`]: element data types (`f32`, `f16`).
//! - [`Device`]: the placement tag (`cpu`, `cuda`) every tensor carries.
//! - Kernels: matrix multiplication, softmax, ReLU, 2-D convolution and
//!   max-pooling, each with the backward pass training needs.
//!
//! # Precision
//! Kernels read any dtype as `f32` and produce `f32`. Half-precision tensors
//! are converted on the way in; callers cast results back with
//! [`Tensor::to_dtype`].
//!
//! # Devices
//! Every kernel executes on the host. The device tag records where a model
//! was placed and ops refuse to mix tensors with different tags.

mod device;
mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use device::Device;
pub use dtype::DType;
pub use error::TensorError;
pub use ops::{
    conv2d, conv2d_backward, matmul, max_pool2d, max_pool2d_backward, relu, relu_backward,
    softmax, Conv2dGrads, Conv2dParams, PoolOutput,
};
pub use shape::Shape;
pub use tensor::Tensor;
