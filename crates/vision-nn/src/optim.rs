// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Adam optimizer.

use crate::{NnError, Parameter};
use serde::{Deserialize, Serialize};
use tensor_core::{DType, Tensor};

/// Hyper-parameters of [`Adam`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    pub weight_decay: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

/// Adam with bias-corrected first and second moments.
///
/// Moment buffers are created on the first [`Adam::step`] and matched to
/// parameters by position, so the same parameter list (in the same order)
/// must be passed on every step.
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    step: u64,
    moments: Vec<Moments>,
}

#[derive(Debug, Clone)]
struct Moments {
    m: Vec<f32>,
    v: Vec<f32>,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            step: 0,
            moments: Vec::new(),
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Clears every parameter's gradient.
    pub fn zero_grad(&self, params: Vec<&mut Parameter>) {
        params.into_iter().for_each(Parameter::zero_grad);
    }

    /// Applies one update. Parameters without a gradient are left alone.
    pub fn step(&mut self, params: Vec<&mut Parameter>) -> Result<(), NnError> {
        if self.moments.is_empty() {
            self.moments = params
                .iter()
                .map(|p| Moments {
                    m: vec![0.0; p.num_elements()],
                    v: vec![0.0; p.num_elements()],
                })
                .collect();
        } else if self.moments.len() != params.len() {
            return Err(NnError::InvalidInput {
                module: "adam".into(),
                detail: format!(
                    "optimizer tracks {} parameters, step received {}",
                    self.moments.len(),
                    params.len()
                ),
            });
        }

        self.step += 1;
        let c = self.config;
        let bias1 = 1.0 - c.beta1.powi(self.step as i32);
        let bias2 = 1.0 - c.beta2.powi(self.step as i32);

        for (param, state) in params.into_iter().zip(self.moments.iter_mut()) {
            let Some(grad) = param.grad.as_ref() else {
                continue;
            };
            if state.m.len() != param.num_elements() {
                return Err(NnError::InvalidInput {
                    module: "adam".into(),
                    detail: "parameter size changed between steps".into(),
                });
            }
            let g = grad.as_f32();
            let mut values = param.value.as_f32().into_owned();

            for i in 0..values.len() {
                let gi = g[i] + c.weight_decay * values[i];
                state.m[i] = c.beta1 * state.m[i] + (1.0 - c.beta1) * gi;
                state.v[i] = c.beta2 * state.v[i] + (1.0 - c.beta2) * gi * gi;
                let m_hat = state.m[i] / bias1;
                let v_hat = state.v[i] / bias2;
                values[i] -= c.lr * m_hat / (v_hat.sqrt() + c.eps);
            }

            let updated = Tensor::from_vec(param.value.shape().clone(), values)?
                .to_device(param.value.device());
            if param.value.dtype() == DType::F32 {
                param.value = updated;
            } else {
                param.value.copy_from(&updated)?;
            }
        }
        Ok(())
    }
}
