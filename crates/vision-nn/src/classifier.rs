// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sequential image classifier.

use crate::module::expect_arity;
use crate::{Layer, Module, NnError, Parameter};
use serde::Serialize;
use tensor_core::{DType, Device, Shape, Tensor};

/// One row of a model inspection table.
#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub index: usize,
    pub kind: &'static str,
    pub description: String,
    pub output_shape: Shape,
    pub parameters: usize,
    pub flops: u64,
}

/// An ordered stack of [`Layer`]s mapping `[N, C, H, W]` images to
/// `[N, classes]` logits.
#[derive(Debug, Clone)]
pub struct Classifier {
    name: String,
    layers: Vec<Layer>,
    training: bool,
    dtype: DType,
    device: Device,
}

impl Classifier {
    /// Creates a classifier in training mode with `f32` parameters on the
    /// host.
    pub fn new(name: impl Into<String>, layers: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            layers,
            training: true,
            dtype: DType::F32,
            device: Device::Cpu,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut Vec<Layer> {
        &mut self.layers
    }

    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(Layer::num_parameters).sum()
    }

    /// Moves the parameters to `device`.
    pub fn to_device(&mut self, device: Device) {
        self.layers.iter_mut().for_each(|l| l.to_device(device));
        self.device = device;
    }

    /// Output shape for an input of shape `input`.
    pub fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        self.layers
            .iter()
            .try_fold(input.clone(), |shape, layer| layer.output_shape(&shape))
    }

    /// Per-layer shapes, parameter counts and FLOPs for an input of shape
    /// `input`.
    pub fn layer_summaries(&self, input: &Shape) -> Result<Vec<LayerSummary>, NnError> {
        let mut shape = input.clone();
        let mut rows = Vec::with_capacity(self.layers.len());
        for (index, layer) in self.layers.iter().enumerate() {
            let flops = layer.flops(&shape)?;
            shape = layer.output_shape(&shape)?;
            rows.push(LayerSummary {
                index,
                kind: layer.kind(),
                description: layer.describe(),
                output_shape: shape.clone(),
                parameters: layer.num_parameters(),
                flops,
            });
        }
        Ok(rows)
    }

    fn check_input(&self, x: &Tensor) -> Result<(), NnError> {
        if x.dtype() != self.dtype {
            return Err(NnError::InvalidInput {
                module: self.name.clone(),
                detail: format!("input dtype {} does not match parameters ({})", x.dtype(), self.dtype),
            });
        }
        if x.device() != self.device {
            return Err(NnError::InvalidInput {
                module: self.name.clone(),
                detail: format!("input on {} but parameters on {}", x.device(), self.device),
            });
        }
        Ok(())
    }

    /// Runs every layer over `x`. With `fuse` and outside training, a
    /// convolution or linear layer directly followed by a ReLU computes
    /// both in one pass.
    pub(crate) fn run(&mut self, x: &Tensor, fuse: bool) -> Result<Tensor, NnError> {
        self.check_input(x)?;
        let training = self.training;
        let fuse = fuse && !training;

        let mut h = x.clone();
        let mut i = 0;
        while i < self.layers.len() {
            let absorb_next = fuse
                && self.layers[i].is_relu_producer()
                && matches!(self.layers.get(i + 1), Some(Layer::Relu(_)));
            h = self.layers[i].forward(&h, training, absorb_next)?;
            i += if absorb_next { 2 } else { 1 };
        }
        Ok(if self.dtype == DType::F32 {
            h
        } else {
            h.to_dtype(self.dtype)
        })
    }
}

impl Module for Classifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, inputs: &[Tensor]) -> Result<Tensor, NnError> {
        expect_arity(&self.name, inputs, 1)?;
        self.run(&inputs[0], false)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<(), NnError> {
        if !self.training {
            return Err(NnError::Unsupported(format!(
                "backward on '{}' in eval mode",
                self.name
            )));
        }
        let mut grad = grad_output.to_dtype(DType::F32);
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(())
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parameters_mut())
            .collect()
    }

    fn set_training(&mut self, training: bool) {
        if !training {
            self.layers.iter_mut().for_each(Layer::clear_cache);
        }
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        self.device
    }

    fn cast(&mut self, dtype: DType) -> Result<(), NnError> {
        self.layers.iter_mut().for_each(|l| l.cast(dtype));
        self.dtype = dtype;
        Ok(())
    }

    fn flops(&self, input_shapes: &[Shape]) -> Result<u64, NnError> {
        if input_shapes.len() != 1 {
            return Err(NnError::InputArity {
                module: self.name.clone(),
                expected: 1,
                actual: input_shapes.len(),
            });
        }
        let mut shape = input_shapes[0].clone();
        let mut total = 0u64;
        for layer in &self.layers {
            total += layer.flops(&shape)?;
            shape = layer.output_shape(&shape)?;
        }
        Ok(total)
    }

    fn boxed_clone(&self) -> Box<dyn Module> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Flatten, Linear, Relu};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny() -> Classifier {
        let mut rng = StdRng::seed_from_u64(3);
        Classifier::new(
            "tiny",
            vec![
                Layer::Flatten(Flatten::default()),
                Layer::Linear(Linear::new(4, 3, &mut rng)),
                Layer::Relu(Relu::default()),
                Layer::Linear(Linear::new(3, 2, &mut rng)),
            ],
        )
    }

    fn input() -> Tensor {
        Tensor::randn(Shape::nchw(2, 1, 2, 2), &mut StdRng::seed_from_u64(9))
    }

    #[test]
    fn test_forward_shape_and_flops() {
        let mut m = tiny();
        let y = m.forward(&[input()]).unwrap();
        assert_eq!(y.shape(), &Shape::matrix(2, 2));
        assert_eq!(m.flops(&[Shape::nchw(2, 1, 2, 2)]).unwrap(), 2 * (4 * 3 + 3 * 2));
        assert_eq!(m.num_parameters(), 4 * 3 + 3 + 3 * 2 + 2);
    }

    #[test]
    fn test_fused_run_matches_eager() {
        let mut m = tiny();
        m.set_training(false);
        let eager = m.run(&input(), false).unwrap();
        let fused = m.run(&input(), true).unwrap();
        assert_eq!(eager, fused);
    }

    #[test]
    fn test_backward_fills_every_gradient() {
        let mut m = tiny();
        let y = m.forward(&[input()]).unwrap();
        m.backward(&Tensor::from_f32(y.shape().clone(), &[1.0; 4]).unwrap())
            .unwrap();
        assert!(m.parameters_mut().iter().all(|p| p.grad.is_some()));
    }

    #[test]
    fn test_backward_in_eval_mode_fails() {
        let mut m = tiny();
        m.set_training(false);
        let y = m.forward(&[input()]).unwrap();
        assert!(matches!(m.backward(&y), Err(NnError::Unsupported(_))));
    }

    #[test]
    fn test_dtype_and_device_checks() {
        let mut m = tiny();
        m.cast(DType::F16).unwrap();
        assert!(m.forward(&[input()]).is_err());
        let y = m.forward(&[input().to_dtype(DType::F16)]).unwrap();
        assert_eq!(y.dtype(), DType::F16);

        m.to_device(Device::Cuda);
        assert!(m.forward(&[input().to_dtype(DType::F16)]).is_err());
        assert!(m
            .forward(&[input().to_dtype(DType::F16).to_device(Device::Cuda)])
            .is_ok());
    }

    #[test]
    fn test_arity() {
        let mut m = tiny();
        assert!(matches!(
            m.forward(&[input(), input()]),
            Err(NnError::InputArity { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_layer_summaries() {
        let rows = tiny().layer_summaries(&Shape::nchw(1, 1, 2, 2)).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].output_shape, Shape::matrix(1, 4));
        assert_eq!(rows[3].output_shape, Shape::matrix(1, 2));
        assert_eq!(rows[1].flops, 12);
    }
}
