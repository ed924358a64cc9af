// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Backends`] trait and the reference implementations.

pub mod flops;
pub mod fp16;
pub mod fuser;
pub mod lowered;

use crate::{BenchmarkModel, HarnessError, ModuleState, Precision};
use tensor_core::Tensor;
use vision_nn::Module;

pub use lowered::{LoweredModule, ShapePolicy};

/// The optional acceleration backends [`crate::apply_args`] can enable.
///
/// Implementations only transform what they are handed. They never read
/// the resolved options themselves, so validation stays in one place.
pub trait Backends: Send + Sync {
    /// Enables a kernel fuser for the whole process.
    fn enable_fuser(&self, name: &str) -> Result<(), HarnessError>;

    /// Returns a half-precision copy of the module and its inputs.
    fn enable_fp16(&self, state: &ModuleState) -> Result<ModuleState, HarnessError>;

    /// Lowers the module with the graph compiler for batches of up to
    /// `batch_size`.
    fn enable_fx2trt(
        &self,
        batch_size: usize,
        fp16: bool,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError>;

    /// Lowers the module with the tensor compiler at `precision`.
    fn enable_torch_trt(
        &self,
        precision: Precision,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError>;

    /// Instruments `model` so that [`BenchmarkModel::get_flops`] succeeds.
    fn enable_flops(&self, model: &mut dyn BenchmarkModel) -> Result<(), HarnessError>;
}

/// Backends implemented on top of `vision-nn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackends;

impl ReferenceBackends {
    pub fn new() -> Self {
        Self
    }
}

impl Backends for ReferenceBackends {
    fn enable_fuser(&self, name: &str) -> Result<(), HarnessError> {
        fuser::enable_fuser(name)
    }

    fn enable_fp16(&self, state: &ModuleState) -> Result<ModuleState, HarnessError> {
        fp16::enable_fp16(state)
    }

    fn enable_fx2trt(
        &self,
        batch_size: usize,
        fp16: bool,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError> {
        let precision = if fp16 {
            Precision::Fp16
        } else {
            Precision::Fp32
        };
        let engine = LoweredModule::build(
            "fx2trt",
            module,
            example_inputs,
            precision,
            ShapePolicy::MaxBatch(batch_size),
        )?;
        Ok(Box::new(engine))
    }

    fn enable_torch_trt(
        &self,
        precision: Precision,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError> {
        let engine = LoweredModule::build(
            "torch_trt",
            module,
            example_inputs,
            precision,
            ShapePolicy::Static,
        )?;
        Ok(Box::new(engine))
    }

    fn enable_flops(&self, model: &mut dyn BenchmarkModel) -> Result<(), HarnessError> {
        flops::enable_flops(model)
    }
}
