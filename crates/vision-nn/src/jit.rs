// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scripted modules.
//!
//! [`script`] checks a classifier against example inputs and records their
//! shapes as the module's signature. A scripted module then rejects inputs
//! whose non-batch dimensions differ from the signature, and fuses
//! activations into their producers whenever a [`crate::fuser`] is active.
//!
//! [`ScriptedModule::optimize_for_inference`] freezes a module in eval mode:
//! ReLUs are folded permanently, parameters become constants and the
//! module can no longer be trained.

use crate::fuser::active_fuser;
use crate::module::expect_arity;
use crate::{Classifier, Layer, Module, NnError, Parameter};
use tensor_core::{DType, Device, Shape, Tensor};

/// A classifier compiled against a fixed input signature.
#[derive(Debug, Clone)]
pub struct ScriptedModule {
    inner: Classifier,
    signature: Vec<Shape>,
    frozen: bool,
}

/// Scripts `module` using `example_inputs` to fix the input signature.
pub fn script(module: Classifier, example_inputs: &[Tensor]) -> Result<ScriptedModule, NnError> {
    expect_arity(module.name(), example_inputs, 1)?;
    let signature: Vec<Shape> = example_inputs.iter().map(|x| x.shape().clone()).collect();
    let output = module.output_shape(&signature[0])?;
    tracing::debug!(
        module = module.name(),
        input = %signature[0],
        output = %output,
        "scripted module"
    );
    Ok(ScriptedModule {
        inner: module,
        signature,
        frozen: false,
    })
}

impl ScriptedModule {
    /// Input shapes recorded when the module was scripted.
    pub fn signature(&self) -> &[Shape] {
        &self.signature
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn inner(&self) -> &Classifier {
        &self.inner
    }

    pub fn to_device(&mut self, device: Device) {
        self.inner.to_device(device);
    }

    /// Freezes the module for inference. Requires eval mode.
    pub fn optimize_for_inference(mut self) -> Result<ScriptedModule, NnError> {
        if self.inner.is_training() {
            return Err(NnError::Unsupported(
                "optimize_for_inference requires a module in eval mode".into(),
            ));
        }
        let layers = std::mem::take(self.inner.layers_mut());
        let before = layers.len();
        let mut folded: Vec<Layer> = Vec::with_capacity(before);
        for layer in layers {
            let absorb = matches!(layer, Layer::Relu(_))
                && folded.last().is_some_and(Layer::is_relu_producer);
            match folded.last_mut() {
                Some(prev) if absorb => prev.set_fused_relu(),
                _ => folded.push(layer),
            }
        }
        let removed = before - folded.len();
        *self.inner.layers_mut() = folded;
        self.frozen = true;
        tracing::debug!(
            module = self.inner.name(),
            layers = self.inner.layers().len(),
            removed,
            "optimized for inference"
        );
        Ok(self)
    }

    fn check_signature(&self, x: &Tensor) -> Result<(), NnError> {
        let expected = &self.signature[0];
        let actual = x.shape();
        let compatible = actual.rank() == expected.rank()
            && actual.dims()[1..] == expected.dims()[1..];
        if !compatible {
            return Err(NnError::InvalidInput {
                module: self.inner.name().to_string(),
                detail: format!("scripted for {expected}, got {actual}"),
            });
        }
        Ok(())
    }
}

impl Module for ScriptedModule {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn forward(&mut self, inputs: &[Tensor]) -> Result<Tensor, NnError> {
        expect_arity(self.inner.name(), inputs, 1)?;
        self.check_signature(&inputs[0])?;
        let fuse = self.frozen || active_fuser().is_some();
        self.inner.run(&inputs[0], fuse)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<(), NnError> {
        if self.frozen {
            return Err(NnError::Unsupported(format!(
                "'{}' is frozen for inference and cannot be trained",
                self.inner.name()
            )));
        }
        self.inner.backward(grad_output)
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        if self.frozen {
            return Vec::new();
        }
        self.inner.parameters_mut()
    }

    fn set_training(&mut self, training: bool) {
        self.inner.set_training(training);
    }

    fn is_training(&self) -> bool {
        self.inner.is_training()
    }

    fn dtype(&self) -> DType {
        self.inner.dtype()
    }

    fn device(&self) -> Device {
        self.inner.device()
    }

    fn cast(&mut self, dtype: DType) -> Result<(), NnError> {
        self.inner.cast(dtype)
    }

    fn flops(&self, input_shapes: &[Shape]) -> Result<u64, NnError> {
        self.inner.flops(input_shapes)
    }

    fn boxed_clone(&self) -> Box<dyn Module> {
        Box::new(self.clone())
    }
}
