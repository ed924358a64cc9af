// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layers of an image classifier.
//!
//! Every layer computes in `f32` and returns an `f32` tensor; parameters
//! may be stored in `f16`. In training mode a layer caches what its
//! backward pass needs. FLOP counts follow the fvcore convention: one FLOP
//! per multiply-accumulate in convolutions and linear layers, and zero for
//! activations, pooling and reshapes.

use crate::{NnError, Parameter};
use rand::Rng;
use tensor_core::{
    conv2d, conv2d_backward, matmul, max_pool2d, max_pool2d_backward, relu, relu_backward,
    Conv2dParams, DType, Device, Shape, Tensor,
};

/// Uniform `(-bound, bound)` initialisation with `bound = 1/sqrt(fan_in)`.
fn init_uniform<R: Rng + ?Sized>(shape: Shape, fan_in: usize, rng: &mut R) -> Tensor {
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    let mut t = Tensor::rand(shape, rng);
    t.as_f32_slice_mut()
        .iter_mut()
        .for_each(|x| *x = (*x * 2.0 - 1.0) * bound);
    t
}

fn expect_rank(layer: &str, input: &Shape, rank: usize) -> Result<(), NnError> {
    if input.rank() != rank {
        return Err(NnError::InvalidInput {
            module: layer.to_string(),
            detail: format!("expected rank {rank}, got shape {input}"),
        });
    }
    Ok(())
}

// ── Conv2d ─────────────────────────────────────────────────────

/// Square-kernel 2-D convolution with bias.
#[derive(Debug, Clone)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub params: Conv2dParams,
    pub weight: Parameter,
    pub bias: Parameter,
    /// Apply ReLU inside the convolution kernel.
    pub fused_relu: bool,
    cached_input: Option<Tensor>,
}

impl Conv2d {
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        params: Conv2dParams,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel * kernel;
        Self {
            in_channels,
            out_channels,
            kernel,
            params,
            weight: Parameter::new(init_uniform(
                Shape::nchw(out_channels, in_channels, kernel, kernel),
                fan_in,
                rng,
            )),
            bias: Parameter::new(init_uniform(Shape::vector(out_channels), fan_in, rng)),
            fused_relu: false,
            cached_input: None,
        }
    }

    fn forward(&mut self, x: &Tensor, training: bool, fuse_relu: bool) -> Result<Tensor, NnError> {
        let y = conv2d(
            x,
            &self.weight.value,
            Some(&self.bias.value),
            self.params,
            fuse_relu || self.fused_relu,
        )?;
        self.cached_input = training.then(|| x.clone());
        Ok(y)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        if self.fused_relu {
            return Err(NnError::Unsupported(
                "backward through a conv2d with a folded activation".into(),
            ));
        }
        let x = self
            .cached_input
            .take()
            .ok_or_else(|| NnError::MissingActivation("conv2d".into()))?;
        let grads = conv2d_backward(&x, &self.weight.value, grad, self.params, true)?;
        self.weight.accumulate(grads.weight)?;
        if let Some(db) = grads.bias {
            self.bias.accumulate(db)?;
        }
        Ok(grads.input)
    }

    fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        expect_rank("conv2d", input, 4)?;
        let d = input.dims();
        if d[1] != self.in_channels {
            return Err(NnError::InvalidInput {
                module: "conv2d".into(),
                detail: format!("expected {} channels, got {}", self.in_channels, d[1]),
            });
        }
        let (oh, ow) = self
            .params
            .output_hw("conv2d", d[2], d[3], self.kernel, self.kernel)?;
        Ok(Shape::nchw(d[0], self.out_channels, oh, ow))
    }

    fn flops(&self, input: &Shape) -> Result<u64, NnError> {
        let out = self.output_shape(input)?;
        let macs_per_output = (self.in_channels * self.kernel * self.kernel) as u64;
        Ok(out.num_elements() as u64 * macs_per_output)
    }
}

// ── Linear ─────────────────────────────────────────────────────

/// Fully connected layer: `y = x @ W + b` with `W` stored as `[in, out]`.
#[derive(Debug, Clone)]
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
    pub weight: Parameter,
    pub bias: Parameter,
    pub fused_relu: bool,
    cached_input: Option<Tensor>,
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self {
            in_features,
            out_features,
            weight: Parameter::new(init_uniform(
                Shape::matrix(in_features, out_features),
                in_features,
                rng,
            )),
            bias: Parameter::new(init_uniform(Shape::vector(out_features), in_features, rng)),
            fused_relu: false,
            cached_input: None,
        }
    }

    fn forward(&mut self, x: &Tensor, training: bool, fuse_relu: bool) -> Result<Tensor, NnError> {
        self.output_shape(x.shape())?;
        let batch = x.shape().dims()[0];
        let mut y = Tensor::zeros(Shape::matrix(batch, self.out_features), DType::F32)
            .to_device(x.device());
        matmul(x, &self.weight.value, &mut y)?;

        let b = self.bias.value.as_f32();
        let relu_after = fuse_relu || self.fused_relu;
        for row in y.as_f32_slice_mut().chunks_mut(self.out_features) {
            for (v, bias) in row.iter_mut().zip(b.iter()) {
                *v += bias;
                if relu_after {
                    *v = v.max(0.0);
                }
            }
        }
        self.cached_input = training.then(|| x.clone());
        Ok(y)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        if self.fused_relu {
            return Err(NnError::Unsupported(
                "backward through a linear layer with a folded activation".into(),
            ));
        }
        let x = self
            .cached_input
            .take()
            .ok_or_else(|| NnError::MissingActivation("linear".into()))?;
        let batch = x.shape().dims()[0];

        let mut dw = Tensor::zeros(Shape::matrix(self.in_features, self.out_features), DType::F32)
            .to_device(x.device());
        matmul(&x.transpose2d()?, grad, &mut dw)?;

        let mut db = vec![0.0f32; self.out_features];
        for row in grad.as_f32().chunks(self.out_features) {
            db.iter_mut().zip(row).for_each(|(a, b)| *a += b);
        }

        let mut dx = Tensor::zeros(Shape::matrix(batch, self.in_features), DType::F32)
            .to_device(x.device());
        matmul(grad, &self.weight.value.transpose2d()?, &mut dx)?;

        self.weight.accumulate(dw)?;
        self.bias
            .accumulate(Tensor::from_vec(Shape::vector(self.out_features), db)?.to_device(x.device()))?;
        Ok(dx)
    }

    fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        expect_rank("linear", input, 2)?;
        if input.dims()[1] != self.in_features {
            return Err(NnError::InvalidInput {
                module: "linear".into(),
                detail: format!(
                    "expected {} features, got {}",
                    self.in_features,
                    input.dims()[1]
                ),
            });
        }
        Ok(Shape::matrix(input.dims()[0], self.out_features))
    }

    fn flops(&self, input: &Shape) -> Result<u64, NnError> {
        let out = self.output_shape(input)?;
        Ok(out.dims()[0] as u64 * (self.in_features * self.out_features) as u64)
    }
}

// ── Activations, pooling, reshapes ─────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Relu {
    cached_output: Option<Tensor>,
}

impl Relu {
    fn forward(&mut self, x: &Tensor, training: bool) -> Result<Tensor, NnError> {
        let mut y = Tensor::zeros(x.shape().clone(), DType::F32).to_device(x.device());
        relu(x, &mut y)?;
        self.cached_output = training.then(|| y.clone());
        Ok(y)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        let y = self
            .cached_output
            .take()
            .ok_or_else(|| NnError::MissingActivation("relu".into()))?;
        let mut dx = Tensor::zeros(y.shape().clone(), DType::F32).to_device(y.device());
        relu_backward(&y, grad, &mut dx)?;
        Ok(dx)
    }
}

#[derive(Debug, Clone)]
pub struct MaxPool2d {
    pub kernel: usize,
    pub params: Conv2dParams,
    cache: Option<(Shape, Vec<usize>)>,
}

impl MaxPool2d {
    pub fn new(kernel: usize, stride: usize) -> Self {
        Self {
            kernel,
            params: Conv2dParams::new(stride, 0),
            cache: None,
        }
    }

    fn forward(&mut self, x: &Tensor, training: bool) -> Result<Tensor, NnError> {
        let pooled = max_pool2d(x, self.kernel, self.params)?;
        self.cache = training.then(|| (x.shape().clone(), pooled.argmax));
        Ok(pooled.output)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        let (shape, argmax) = self
            .cache
            .take()
            .ok_or_else(|| NnError::MissingActivation("max_pool2d".into()))?;
        Ok(max_pool2d_backward(grad, &argmax, &shape)?)
    }

    fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        expect_rank("max_pool2d", input, 4)?;
        let d = input.dims();
        let (oh, ow) = self
            .params
            .output_hw("max_pool2d", d[2], d[3], self.kernel, self.kernel)?;
        Ok(Shape::nchw(d[0], d[1], oh, ow))
    }
}

/// Collapses all non-batch dimensions.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    cached_shape: Option<Shape>,
}

impl Flatten {
    fn forward(&mut self, x: &Tensor, training: bool) -> Result<Tensor, NnError> {
        let out = self.output_shape(x.shape())?;
        self.cached_shape = training.then(|| x.shape().clone());
        Ok(x.to_dtype(DType::F32).reshape(out)?)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        let shape = self
            .cached_shape
            .take()
            .ok_or_else(|| NnError::MissingActivation("flatten".into()))?;
        Ok(grad.clone().reshape(shape)?)
    }

    fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        if input.rank() < 2 {
            return Err(NnError::InvalidInput {
                module: "flatten".into(),
                detail: format!("expected a batched tensor, got shape {input}"),
            });
        }
        Ok(Shape::matrix(input.batch(), input.sample_elements()))
    }
}

// ── Layer ──────────────────────────────────────────────────────

/// One stage of a [`crate::Classifier`].
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    Linear(Linear),
    Relu(Relu),
    MaxPool2d(MaxPool2d),
    Flatten(Flatten),
}

impl Layer {
    /// Short label used in traces and inspection tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Conv2d(_) => "conv2d",
            Layer::Linear(_) => "linear",
            Layer::Relu(_) => "relu",
            Layer::MaxPool2d(_) => "max_pool2d",
            Layer::Flatten(_) => "flatten",
        }
    }

    /// Human-readable description including hyper-parameters.
    pub fn describe(&self) -> String {
        let fused = |f: bool| if f { " +relu" } else { "" };
        match self {
            Layer::Conv2d(c) => format!(
                "conv2d {}→{} k{} s{} p{}{}",
                c.in_channels,
                c.out_channels,
                c.kernel,
                c.params.stride,
                c.params.padding,
                fused(c.fused_relu)
            ),
            Layer::Linear(l) => format!(
                "linear {}→{}{}",
                l.in_features,
                l.out_features,
                fused(l.fused_relu)
            ),
            Layer::Relu(_) => "relu".into(),
            Layer::MaxPool2d(p) => format!("max_pool2d k{} s{}", p.kernel, p.params.stride),
            Layer::Flatten(_) => "flatten".into(),
        }
    }

    /// Runs the layer. `fuse_relu` asks conv/linear producers to apply the
    /// activation in their own output pass.
    pub(crate) fn forward(
        &mut self,
        x: &Tensor,
        training: bool,
        fuse_relu: bool,
    ) -> Result<Tensor, NnError> {
        match self {
            Layer::Conv2d(l) => l.forward(x, training, fuse_relu),
            Layer::Linear(l) => l.forward(x, training, fuse_relu),
            Layer::Relu(l) => l.forward(x, training),
            Layer::MaxPool2d(l) => l.forward(x, training),
            Layer::Flatten(l) => l.forward(x, training),
        }
    }

    pub(crate) fn backward(&mut self, grad: &Tensor) -> Result<Tensor, NnError> {
        match self {
            Layer::Conv2d(l) => l.backward(grad),
            Layer::Linear(l) => l.backward(grad),
            Layer::Relu(l) => l.backward(grad),
            Layer::MaxPool2d(l) => l.backward(grad),
            Layer::Flatten(l) => l.backward(grad),
        }
    }

    pub fn output_shape(&self, input: &Shape) -> Result<Shape, NnError> {
        match self {
            Layer::Conv2d(l) => l.output_shape(input),
            Layer::Linear(l) => l.output_shape(input),
            Layer::Relu(_) => Ok(input.clone()),
            Layer::MaxPool2d(l) => l.output_shape(input),
            Layer::Flatten(l) => l.output_shape(input),
        }
    }

    pub fn flops(&self, input: &Shape) -> Result<u64, NnError> {
        match self {
            Layer::Conv2d(l) => l.flops(input),
            Layer::Linear(l) => l.flops(input),
            _ => Ok(0),
        }
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        match self {
            Layer::Conv2d(l) => vec![&mut l.weight, &mut l.bias],
            Layer::Linear(l) => vec![&mut l.weight, &mut l.bias],
            _ => Vec::new(),
        }
    }

    pub fn num_parameters(&self) -> usize {
        match self {
            Layer::Conv2d(l) => l.weight.num_elements() + l.bias.num_elements(),
            Layer::Linear(l) => l.weight.num_elements() + l.bias.num_elements(),
            _ => 0,
        }
    }

    /// Whether this layer can absorb a following ReLU.
    pub(crate) fn is_relu_producer(&self) -> bool {
        matches!(self, Layer::Conv2d(_) | Layer::Linear(_))
    }

    pub(crate) fn set_fused_relu(&mut self) {
        match self {
            Layer::Conv2d(l) => l.fused_relu = true,
            Layer::Linear(l) => l.fused_relu = true,
            _ => {}
        }
    }

    pub(crate) fn clear_cache(&mut self) {
        match self {
            Layer::Conv2d(l) => l.cached_input = None,
            Layer::Linear(l) => l.cached_input = None,
            Layer::Relu(l) => l.cached_output = None,
            Layer::MaxPool2d(l) => l.cache = None,
            Layer::Flatten(l) => l.cached_shape = None,
        }
    }

    pub(crate) fn cast(&mut self, dtype: DType) {
        self.parameters_mut().into_iter().for_each(|p| p.cast(dtype));
    }

    pub(crate) fn to_device(&mut self, device: Device) {
        self.parameters_mut()
            .into_iter()
            .for_each(|p| p.to_device(device));
    }
}
