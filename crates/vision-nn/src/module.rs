// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The object-safe model interface.

use crate::{NnError, Parameter};
use tensor_core::{DType, Device, Shape, Tensor};

/// A runnable, optionally trainable model.
///
/// Everything the benchmark harness does to a model goes through this
/// trait, so an accelerated backend can hand back a completely different
/// implementation and the harness will not notice.
pub trait Module: std::fmt::Debug + Send {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Computes the module's output for `inputs`.
    fn forward(&mut self, inputs: &[Tensor]) -> Result<Tensor, NnError>;

    /// Back-propagates `grad_output` through the most recent training-mode
    /// forward, accumulating parameter gradients.
    fn backward(&mut self, grad_output: &Tensor) -> Result<(), NnError>;

    /// Trainable parameters. Empty for frozen modules.
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    fn set_training(&mut self, training: bool);

    fn is_training(&self) -> bool;

    /// Storage dtype of the parameters, and the dtype inputs must have.
    fn dtype(&self) -> DType;

    fn device(&self) -> Device;

    /// Converts the parameters to `dtype` in place.
    fn cast(&mut self, dtype: DType) -> Result<(), NnError>;

    /// Multiply-accumulate count of one forward pass over inputs of these
    /// shapes.
    fn flops(&self, input_shapes: &[Shape]) -> Result<u64, NnError>;

    fn boxed_clone(&self) -> Box<dyn Module>;
}

impl Clone for Box<dyn Module> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Fails unless exactly `expected` inputs were supplied.
pub(crate) fn expect_arity(module: &str, inputs: &[Tensor], expected: usize) -> Result<(), NnError> {
    if inputs.len() != expected {
        return Err(NnError::InputArity {
            module: module.to_string(),
            expected,
            actual: inputs.len(),
        });
    }
    Ok(())
}
