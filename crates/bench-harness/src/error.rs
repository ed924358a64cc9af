// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the benchmark harness.

use vision_nn::NnError;

/// Errors raised while resolving options, applying backends or running
/// benchmark loops.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The requested options cannot be honoured for this model, device or
    /// test mode.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// The extra-argument tokens could not be parsed.
    #[error("invalid extra arguments: {0}")]
    InvalidArguments(String),

    /// No benchmark model with this name exists.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// The underlying model failed.
    #[error("model error: {0}")]
    Model(#[from] NnError),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    pub(crate) fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported(detail.into())
    }

    /// Whether this is the single validation kind raised for incompatible
    /// option combinations.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

impl From<tensor_core::TensorError> for HarnessError {
    fn from(e: tensor_core::TensorError) -> Self {
        Self::Model(NnError::Tensor(e))
    }
}
