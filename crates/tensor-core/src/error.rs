// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::{Device, Shape};

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The number of values does not match the element count of the shape.
    #[error("element count mismatch: shape {shape} needs {expected} values, got {actual}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation requires a specific rank.
    #[error("{op} expects a rank-{expected} tensor, got shape {actual}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        actual: Shape,
    },

    /// Operands live on different devices.
    #[error("device mismatch in {op}: {lhs} vs {rhs}")]
    DeviceMismatch {
        op: &'static str,
        lhs: Device,
        rhs: Device,
    },

    /// Kernel parameters produce an empty or negative output extent.
    #[error("invalid geometry for {op}: {detail}")]
    InvalidGeometry { op: &'static str, detail: String },
}
