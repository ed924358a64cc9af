// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # bench-harness
//!
//! Drives benchmark models through train/eval loops with optional
//! acceleration backends selected by extra command-line arguments.
//!
//! The harness takes:
//! - A [`BenchmarkModel`], usually a [`VisionModel`] built from the zoo.
//! - A list of extra-argument tokens (`--fp16`, `--fx2trt`, `--torch_trt`,
//!   `--fuser <name>`, `--flops`).
//! - A [`Backends`] implementation, usually [`ReferenceBackends`].
//!
//! [`parse_args`] turns the tokens into a validated [`OptionSet`] without
//! touching the model. [`apply_args`] then applies the selected backends in
//! a fixed order, replacing the model's module as it goes. Every rejected
//! combination surfaces as [`HarnessError::Unsupported`].
//!
//! # Example
//! ```no_run
//! use bench_harness::{run_benchmark, HarnessConfig, ReferenceBackends, TestMode};
//!
//! let config = HarnessConfig {
//!     model: "alexnet".into(),
//!     test: TestMode::Eval,
//!     batch_size: Some(8),
//!     extra_args: vec!["--flops".into()],
//!     ..Default::default()
//! };
//! let metrics = run_benchmark(&config, &ReferenceBackends::new())?;
//! println!("{}", metrics.summary());
//! # Ok::<(), bench_harness::HarnessError>(())
//! ```

pub mod backends;
mod config;
mod error;
mod extra_args;
mod metrics;
mod model;
mod runner;
mod vision;

pub use backends::{Backends, ReferenceBackends};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use extra_args::{allow_fp16, apply_args, parse_args, OptionSet, Precision};
pub use metrics::RunMetrics;
pub use model::{BenchmarkModel, ModelFamily, ModuleState, TestMode};
pub use runner::{run_benchmark, run_model};
pub use vision::{ModelOptions, VisionModel};
