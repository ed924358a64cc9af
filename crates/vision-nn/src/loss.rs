// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cross-entropy loss over class-probability targets.

use crate::NnError;
use tensor_core::{softmax, DType, Shape, Tensor, TensorError};

/// Scalar loss value and its gradient with respect to the logits.
#[derive(Debug, Clone)]
pub struct LossOutput {
    pub loss: f32,
    pub grad: Tensor,
}

/// Mean cross-entropy between `softmax(logits)` and soft targets.
///
/// For logits `x` and targets `t` of shape `[B, K]`:
///
/// ```text
/// loss = -1/B · Σ_b Σ_k t[b,k] · log_softmax(x)[b,k]
/// ```
///
/// Targets need not be normalised; the gradient accounts for each row's
/// total mass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    pub fn new() -> Self {
        Self
    }

    pub fn forward(&self, logits: &Tensor, target: &Tensor) -> Result<LossOutput, NnError> {
        if logits.shape().rank() != 2 {
            return Err(TensorError::RankMismatch {
                op: "cross_entropy",
                expected: 2,
                actual: logits.shape().clone(),
            }
            .into());
        }
        if logits.shape() != target.shape() {
            return Err(TensorError::ShapeMismatch {
                op: "cross_entropy",
                lhs: logits.shape().clone(),
                rhs: target.shape().clone(),
            }
            .into());
        }
        logits.ensure_same_device("cross_entropy", target)?;

        let (batch, classes) = (logits.shape().dims()[0], logits.shape().dims()[1]);
        let mut probs = Tensor::zeros(Shape::matrix(batch, classes), DType::F32)
            .to_device(logits.device());
        softmax(logits, &mut probs)?;

        let t = target.as_f32();
        let p = probs.as_f32_slice();
        let scale = 1.0 / batch.max(1) as f32;

        let mut loss = 0.0f64;
        let mut grad = vec![0.0f32; batch * classes];
        for b in 0..batch {
            let row = b * classes..(b + 1) * classes;
            let mass: f32 = t[row.clone()].iter().sum();
            for i in row {
                loss -= f64::from(t[i]) * f64::from(p[i].max(f32::MIN_POSITIVE).ln());
                grad[i] = (p[i] * mass - t[i]) * scale;
            }
        }

        Ok(LossOutput {
            loss: (loss * f64::from(scale)) as f32,
            grad: Tensor::from_vec(Shape::matrix(batch, classes), grad)?
                .to_device(logits.device()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_logits() {
        let logits = Tensor::zeros(Shape::matrix(1, 4), DType::F32);
        let target = Tensor::from_f32(Shape::matrix(1, 4), &[0.0, 1.0, 0.0, 0.0]).unwrap();
        let out = CrossEntropyLoss::new().forward(&logits, &target).unwrap();
        assert!((out.loss - 4.0f32.ln()).abs() < 1e-5);
        let g = out.grad.as_f32_slice();
        assert!((g[1] + 0.75).abs() < 1e-6);
        assert!((g[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let logits = Tensor::from_f32(Shape::matrix(2, 3), &[0.2, -1.0, 0.7, 1.5, 0.1, -0.3]).unwrap();
        let target = Tensor::from_f32(Shape::matrix(2, 3), &[0.3, 0.9, 0.1, 0.5, 0.2, 0.6]).unwrap();
        let ce = CrossEntropyLoss::new();
        let analytic = ce.forward(&logits, &target).unwrap().grad;

        let eps = 1e-2;
        for i in 0..6 {
            let mut plus = logits.clone();
            plus.as_f32_slice_mut()[i] += eps;
            let mut minus = logits.clone();
            minus.as_f32_slice_mut()[i] -= eps;
            let numeric = (ce.forward(&plus, &target).unwrap().loss
                - ce.forward(&minus, &target).unwrap().loss)
                / (2.0 * eps);
            assert!((numeric - analytic.as_f32_slice()[i]).abs() < 1e-3, "index {i}");
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let logits = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        let target = Tensor::zeros(Shape::matrix(2, 4), DType::F32);
        assert!(CrossEntropyLoss::new().forward(&logits, &target).is_err());
    }

    #[test]
    fn test_half_inputs() {
        let logits = Tensor::zeros(Shape::matrix(2, 2), DType::F16);
        let target = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 0.0, 0.0, 1.0])
            .unwrap()
            .to_dtype(DType::F16);
        let out = CrossEntropyLoss::new().forward(&logits, &target).unwrap();
        assert!((out.loss - 2.0f32.ln()).abs() < 1e-3);
        assert_eq!(out.grad.dtype(), DType::F32);
    }
}
