// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named image-classification architectures.
//!
//! | name      | default input | classes | train batch | eval batch |
//! |-----------|---------------|---------|-------------|------------|
//! | `lenet5`  | 3×32×32       | 10      | 64          | 256        |
//! | `alexnet` | 3×224×224     | 1000    | 128         | 128        |
//! | `vgg11`   | 3×224×224     | 1000    | 64          | 64         |
//! | `vgg16`   | 3×224×224     | 1000    | 64          | 64         |
//!
//! Classifier heads are sized from the actual feature map, so any image
//! size the convolution stack accepts can be used.

use crate::{Classifier, Conv2d, Flatten, Layer, Linear, MaxPool2d, NnError, Relu};
use rand::RngCore;
use tensor_core::{Conv2dParams, Shape};

/// Input geometry and head width of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchConfig {
    pub image_size: usize,
    pub num_classes: usize,
    pub in_channels: usize,
}

type BuildFn = fn(&ArchConfig, &mut dyn RngCore) -> Result<Vec<Layer>, NnError>;

/// A registered architecture and its benchmark defaults.
#[derive(Clone, Copy)]
pub struct ArchSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub default_train_batch: usize,
    pub default_eval_batch: usize,
    pub default_image_size: usize,
    pub default_num_classes: usize,
    build: BuildFn,
}

impl std::fmt::Debug for ArchSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchSpec")
            .field("name", &self.name)
            .field("default_train_batch", &self.default_train_batch)
            .field("default_eval_batch", &self.default_eval_batch)
            .field("default_image_size", &self.default_image_size)
            .field("default_num_classes", &self.default_num_classes)
            .finish_non_exhaustive()
    }
}

impl ArchSpec {
    pub fn default_config(&self) -> ArchConfig {
        ArchConfig {
            image_size: self.default_image_size,
            num_classes: self.default_num_classes,
            in_channels: 3,
        }
    }
}

const ARCHITECTURES: &[ArchSpec] = &[
    ArchSpec {
        name: "lenet5",
        description: "LeNet-5: two conv/pool stages and a three-layer head",
        default_train_batch: 64,
        default_eval_batch: 256,
        default_image_size: 32,
        default_num_classes: 10,
        build: lenet5,
    },
    ArchSpec {
        name: "alexnet",
        description: "AlexNet: five convolutions, three max-pools, 4096-wide head",
        default_train_batch: 128,
        default_eval_batch: 128,
        default_image_size: 224,
        default_num_classes: 1000,
        build: alexnet,
    },
    ArchSpec {
        name: "vgg11",
        description: "VGG-11 (configuration A), 3x3 convolutions throughout",
        default_train_batch: 64,
        default_eval_batch: 64,
        default_image_size: 224,
        default_num_classes: 1000,
        build: vgg11,
    },
    ArchSpec {
        name: "vgg16",
        description: "VGG-16 (configuration D), 3x3 convolutions throughout",
        default_train_batch: 64,
        default_eval_batch: 64,
        default_image_size: 224,
        default_num_classes: 1000,
        build: vgg16,
    },
];

/// Every registered architecture.
pub fn architectures() -> &'static [ArchSpec] {
    ARCHITECTURES
}

/// Looks up an architecture by name (case-insensitive).
pub fn find(name: &str) -> Option<&'static ArchSpec> {
    ARCHITECTURES
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
}

/// Builds a freshly initialised classifier in training mode.
pub fn build(
    name: &str,
    config: &ArchConfig,
    rng: &mut dyn RngCore,
) -> Result<Classifier, NnError> {
    let spec = find(name).ok_or_else(|| NnError::UnknownArchitecture(name.to_string()))?;
    let layers = (spec.build)(config, rng)?;
    let model = Classifier::new(spec.name, layers);
    tracing::debug!(
        arch = spec.name,
        image_size = config.image_size,
        num_classes = config.num_classes,
        parameters = model.num_parameters(),
        "built classifier"
    );
    Ok(model)
}

// ── Builder ────────────────────────────────────────────────────

/// Appends layers while tracking the per-sample feature shape so each
/// layer is sized from its actual input.
struct StackBuilder<'a> {
    rng: &'a mut dyn RngCore,
    layers: Vec<Layer>,
    shape: Shape,
}

impl<'a> StackBuilder<'a> {
    fn new(config: &ArchConfig, rng: &'a mut dyn RngCore) -> Self {
        Self {
            rng,
            layers: Vec::new(),
            shape: Shape::nchw(1, config.in_channels, config.image_size, config.image_size),
        }
    }

    fn push(&mut self, layer: Layer) -> Result<&mut Self, NnError> {
        self.shape = layer.output_shape(&self.shape)?;
        self.layers.push(layer);
        Ok(self)
    }

    fn conv_relu(&mut self, out: usize, kernel: usize, stride: usize, pad: usize) -> Result<&mut Self, NnError> {
        let conv = Conv2d::new(
            self.shape.dims()[1],
            out,
            kernel,
            Conv2dParams::new(stride, pad),
            &mut *self.rng,
        );
        self.push(Layer::Conv2d(conv))?
            .push(Layer::Relu(Relu::default()))
    }

    fn max_pool(&mut self, kernel: usize, stride: usize) -> Result<&mut Self, NnError> {
        self.push(Layer::MaxPool2d(MaxPool2d::new(kernel, stride)))
    }

    fn flatten(&mut self) -> Result<&mut Self, NnError> {
        self.push(Layer::Flatten(Flatten::default()))
    }

    fn linear(&mut self, out: usize) -> Result<&mut Self, NnError> {
        let linear = Linear::new(self.shape.dims()[1], out, &mut *self.rng);
        self.push(Layer::Linear(linear))
    }

    fn linear_relu(&mut self, out: usize) -> Result<&mut Self, NnError> {
        self.linear(out)?.push(Layer::Relu(Relu::default()))
    }

    fn finish(self) -> Vec<Layer> {
        self.layers
    }
}

// ── Architectures ──────────────────────────────────────────────

fn lenet5(config: &ArchConfig, rng: &mut dyn RngCore) -> Result<Vec<Layer>, NnError> {
    let mut b = StackBuilder::new(config, rng);
    b.conv_relu(6, 5, 1, 0)?.max_pool(2, 2)?;
    b.conv_relu(16, 5, 1, 0)?.max_pool(2, 2)?;
    b.flatten()?
        .linear_relu(120)?
        .linear_relu(84)?
        .linear(config.num_classes)?;
    Ok(b.finish())
}

fn alexnet(config: &ArchConfig, rng: &mut dyn RngCore) -> Result<Vec<Layer>, NnError> {
    let mut b = StackBuilder::new(config, rng);
    b.conv_relu(64, 11, 4, 2)?.max_pool(3, 2)?;
    b.conv_relu(192, 5, 1, 2)?.max_pool(3, 2)?;
    b.conv_relu(384, 3, 1, 1)?
        .conv_relu(256, 3, 1, 1)?
        .conv_relu(256, 3, 1, 1)?
        .max_pool(3, 2)?;
    b.flatten()?
        .linear_relu(4096)?
        .linear_relu(4096)?
        .linear(config.num_classes)?;
    Ok(b.finish())
}

/// `Some(c)` is a 3x3 convolution to `c` channels, `None` a 2x2 max-pool.
fn vgg(
    plan: &[Option<usize>],
    config: &ArchConfig,
    rng: &mut dyn RngCore,
) -> Result<Vec<Layer>, NnError> {
    let mut b = StackBuilder::new(config, rng);
    for step in plan {
        match step {
            Some(channels) => b.conv_relu(*channels, 3, 1, 1)?,
            None => b.max_pool(2, 2)?,
        };
    }
    b.flatten()?
        .linear_relu(4096)?
        .linear_relu(4096)?
        .linear(config.num_classes)?;
    Ok(b.finish())
}

const M: Option<usize> = None;

fn vgg11(config: &ArchConfig, rng: &mut dyn RngCore) -> Result<Vec<Layer>, NnError> {
    #[rustfmt::skip]
    let plan = [
        Some(64), M,
        Some(128), M,
        Some(256), Some(256), M,
        Some(512), Some(512), M,
        Some(512), Some(512), M,
    ];
    vgg(&plan, config, rng)
}

fn vgg16(config: &ArchConfig, rng: &mut dyn RngCore) -> Result<Vec<Layer>, NnError> {
    #[rustfmt::skip]
    let plan = [
        Some(64), Some(64), M,
        Some(128), Some(128), M,
        Some(256), Some(256), Some(256), M,
        Some(512), Some(512), Some(512), M,
        Some(512), Some(512), Some(512), M,
    ];
    vgg(&plan, config, rng)
}
