// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowered inference engines produced by the fx2trt and torch_trt
//! backends.
//!
//! Building an engine copies the module, fixes its precision, switches it
//! to inference and runs it once over the example inputs. The result is a
//! frozen module: it has no trainable parameters, cannot run backward and
//! only accepts inputs its [`ShapePolicy`] allows. Inputs are converted to
//! the engine precision on entry.

use crate::{HarnessError, Precision};
use tensor_core::{DType, Device, Shape, Tensor};
use vision_nn::{Module, NnError, Parameter};

/// Which input shapes an engine accepts relative to the shapes it was
/// built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapePolicy {
    /// Any batch up to the given size; other dimensions fixed.
    MaxBatch(usize),
    /// Exactly the build shapes.
    Static,
}

#[derive(Debug, Clone)]
pub struct LoweredModule {
    backend: &'static str,
    inner: Box<dyn Module>,
    precision: Precision,
    policy: ShapePolicy,
    input_shapes: Vec<Shape>,
}

impl LoweredModule {
    pub fn build(
        backend: &'static str,
        module: &dyn Module,
        example_inputs: &[Tensor],
        precision: Precision,
        policy: ShapePolicy,
    ) -> Result<Self, HarnessError> {
        if module.is_training() {
            return Err(HarnessError::unsupported(format!(
                "{backend} requires a module in eval mode"
            )));
        }
        if example_inputs.is_empty() {
            return Err(HarnessError::unsupported(format!(
                "{backend} needs at least one example input"
            )));
        }
        if let ShapePolicy::MaxBatch(max) = policy {
            if let Some(x) = example_inputs.iter().find(|x| x.shape().batch() > max) {
                return Err(HarnessError::unsupported(format!(
                    "{backend} engine built for batch {max} cannot take example input {}",
                    x.shape()
                )));
            }
        }

        let mut inner = module.boxed_clone();
        inner.cast(precision.dtype())?;
        let mut engine = Self {
            backend,
            inner,
            precision,
            policy,
            input_shapes: example_inputs.iter().map(|x| x.shape().clone()).collect(),
        };
        engine.forward(example_inputs)?;

        tracing::debug!(
            backend,
            module = engine.inner.name(),
            %precision,
            ?policy,
            "lowered module"
        );
        Ok(engine)
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn policy(&self) -> ShapePolicy {
        self.policy
    }

    fn accepts(&self, built: &Shape, actual: &Shape) -> bool {
        match self.policy {
            ShapePolicy::Static => built == actual,
            ShapePolicy::MaxBatch(max) => {
                actual.rank() == built.rank()
                    && actual.rank() > 0
                    && actual.batch() <= max
                    && actual.dims()[1..] == built.dims()[1..]
            }
        }
    }
}

impl Module for LoweredModule {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn forward(&mut self, inputs: &[Tensor]) -> Result<Tensor, NnError> {
        if inputs.len() != self.input_shapes.len() {
            return Err(NnError::InputArity {
                module: self.backend.to_string(),
                expected: self.input_shapes.len(),
                actual: inputs.len(),
            });
        }
        for (built, x) in self.input_shapes.iter().zip(inputs) {
            if !self.accepts(built, x.shape()) {
                return Err(NnError::InvalidInput {
                    module: self.backend.to_string(),
                    detail: format!("engine built for {built} ({:?}), got {}", self.policy, x.shape()),
                });
            }
        }
        let dtype = self.precision.dtype();
        if inputs.iter().all(|x| x.dtype() == dtype) {
            self.inner.forward(inputs)
        } else {
            let converted: Vec<Tensor> = inputs.iter().map(|x| x.to_dtype(dtype)).collect();
            self.inner.forward(&converted)
        }
    }

    fn backward(&mut self, _grad_output: &Tensor) -> Result<(), NnError> {
        Err(NnError::Unsupported(format!(
            "{} engines are inference-only",
            self.backend
        )))
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        Vec::new()
    }

    fn set_training(&mut self, training: bool) {
        if training {
            tracing::warn!(backend = self.backend, "lowered engines stay in eval mode");
        }
    }

    fn is_training(&self) -> bool {
        false
    }

    fn dtype(&self) -> DType {
        self.precision.dtype()
    }

    fn device(&self) -> Device {
        self.inner.device()
    }

    fn cast(&mut self, dtype: DType) -> Result<(), NnError> {
        if dtype == self.precision.dtype() {
            return Ok(());
        }
        Err(NnError::Unsupported(format!(
            "{} engine precision is fixed at {}",
            self.backend, self.precision
        )))
    }

    fn flops(&self, input_shapes: &[Shape]) -> Result<u64, NnError> {
        self.inner.flops(input_shapes)
    }

    fn boxed_clone(&self) -> Box<dyn Module> {
        Box::new(self.clone())
    }
}
