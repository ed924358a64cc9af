// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # vision-nn
//!
//! The trainable image-classification stack the benchmark harness drives.
//!
//! - [`Layer`]: convolution, linear, ReLU, max-pool and flatten layers with
//!   hand-written backward passes.
//! - [`Module`]: the object-safe interface every runnable model exposes.
//!   Backends replace one `Box<dyn Module>` with another.
//! - [`Classifier`]: an ordered stack of layers.
//! - [`zoo`]: named architectures (`lenet5`, `alexnet`, `vgg11`, `vgg16`).
//! - [`CrossEntropyLoss`] and [`Adam`] for training loops.
//! - [`jit`]: shape-traced scripted modules and inference freezing.
//! - [`fuser`]: the process-wide kernel-fusion selection scripted modules
//!   consult.
//!
//! # Example
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use tensor_core::{Shape, Tensor};
//! use vision_nn::{zoo, ArchConfig, Module};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let config = ArchConfig {
//!     image_size: 32,
//!     num_classes: 10,
//!     in_channels: 3,
//! };
//! let mut model = zoo::build("lenet5", &config, &mut rng).unwrap();
//! model.set_training(false);
//! let x = Tensor::randn(Shape::nchw(2, 3, 32, 32), &mut rng);
//! let logits = model.forward(&[x]).unwrap();
//! assert_eq!(logits.shape(), &Shape::matrix(2, 10));
//! ```

mod classifier;
mod error;
pub mod fuser;
pub mod jit;
mod layers;
mod loss;
mod module;
mod optim;
mod param;
pub mod zoo;

pub use classifier::{Classifier, LayerSummary};
pub use error::NnError;
pub use fuser::Fuser;
pub use jit::ScriptedModule;
pub use layers::{Conv2d, Flatten, Layer, Linear, MaxPool2d, Relu};
pub use loss::{CrossEntropyLoss, LossOutput};
pub use module::Module;
pub use optim::{Adam, AdamConfig};
pub use param::Parameter;
pub use zoo::{ArchConfig, ArchSpec};
