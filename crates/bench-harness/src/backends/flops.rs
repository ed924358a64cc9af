// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! FLOP counting.

use crate::{BenchmarkModel, HarnessError};
use tensor_core::Shape;

/// Counts the forward FLOPs of the model's example batch and stores the
/// per-sample figure on the model.
pub fn enable_flops(model: &mut dyn BenchmarkModel) -> Result<(), HarnessError> {
    let state = model.get_module();
    let shapes: Vec<Shape> = state
        .example_inputs
        .iter()
        .map(|x| x.shape().clone())
        .collect();
    let total = state.module.flops(&shapes)?;
    let batch = shapes
        .first()
        .map(Shape::batch)
        .filter(|&b| b > 0)
        .unwrap_or(1);
    let per_sample = total / batch as u64;
    tracing::debug!(model = model.name(), total, per_sample, "counted flops");
    model.set_flops(per_sample);
    Ok(())
}
