// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Half-precision conversion.

use crate::{HarnessError, ModuleState};
use tensor_core::DType;

/// Casts a copy of the module's parameters and every example input to
/// `f16`.
pub fn enable_fp16(state: &ModuleState) -> Result<ModuleState, HarnessError> {
    let mut module = state.module.clone();
    module.cast(DType::F16)?;
    let example_inputs = state
        .example_inputs
        .iter()
        .map(|x| x.to_dtype(DType::F16))
        .collect();
    Ok(ModuleState::new(module, example_inputs))
}
