// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for layers, models and training utilities.

use tensor_core::TensorError;

/// Errors raised while building, running or training a model.
#[derive(Debug, thiserror::Error)]
pub enum NnError {
    /// A kernel rejected its operands.
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),

    /// No architecture with this name is registered in the zoo.
    #[error("unknown architecture '{0}'")]
    UnknownArchitecture(String),

    /// The module was called with the wrong number of inputs.
    #[error("module '{module}' expects {expected} input tensor(s), got {actual}")]
    InputArity {
        module: String,
        expected: usize,
        actual: usize,
    },

    /// An input disagrees with what the module was built or traced for.
    #[error("input rejected by '{module}': {detail}")]
    InvalidInput { module: String, detail: String },

    /// `backward` was called without a cached forward activation.
    #[error("layer '{0}' has no cached activation; run a training-mode forward first")]
    MissingActivation(String),

    /// The module cannot perform the requested operation in its current form.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The fuser name is not recognised.
    #[error("unknown fuser '{0}'; expected one of fuser0/legacy, fuser1/te, fuser2/nvfuser")]
    UnknownFuser(String),
}
