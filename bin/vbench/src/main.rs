// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # vbench
//!
//! Command-line interface for the visionbench harness.
//!
//! ## Usage
//! ```bash
//! # Benchmark inference with the default backends
//! vbench run --model alexnet --device cuda --test eval
//!
//! # Pass extra arguments through to the harness
//! vbench run --model vgg16 --device cuda -- --fx2trt --flops
//!
//! # List the model zoo
//! vbench list
//!
//! # Inspect a model's layers, parameters and FLOPs
//! vbench inspect --model lenet5
//! ```

mod commands;

use bench_harness::TestMode;
use clap::{Parser, Subcommand};
use tensor_core::Device;

#[derive(Parser)]
#[command(
    name = "vbench",
    about = "Train/eval benchmarks for vision models with pluggable acceleration backends",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a model, apply extra arguments and time its train/eval loop.
    Run {
        /// Architecture name from the model zoo.
        #[arg(short, long, default_value = "lenet5")]
        model: String,

        /// Benchmark mode: train or eval.
        #[arg(short, long, default_value = "eval")]
        test: TestMode,

        /// Device tag: cpu or cuda.
        #[arg(short, long, default_value = "cpu")]
        device: Device,

        /// Script the model at construction.
        #[arg(long)]
        jit: bool,

        /// Batch size (defaults to the architecture's train/eval batch).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Timed iterations (defaults to 3 for train, 1 for eval).
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Untimed warm-up iterations.
        #[arg(long, default_value_t = 1)]
        warmup: usize,

        /// Seed for weights and synthetic data.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Extra arguments for the harness, after `--`
        /// (e.g. `-- --fp16 --fuser fuser2 --flops`).
        #[arg(last = true, allow_hyphen_values = true)]
        extra_args: Vec<String>,
    },

    /// List the architectures in the model zoo.
    List,

    /// Print the layer table of a model: shapes, parameters and FLOPs.
    Inspect {
        /// Architecture name from the model zoo.
        #[arg(short, long)]
        model: String,

        /// Batch size used for the shape walk.
        #[arg(short, long, default_value_t = 1)]
        batch_size: usize,

        /// Input image side (defaults to the architecture's).
        #[arg(long)]
        image_size: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            model,
            test,
            device,
            jit,
            batch_size,
            iterations,
            warmup,
            seed,
            json,
            extra_args,
        } => {
            let config = match cli.config {
                Some(path) => commands::run::from_file(&path, extra_args)?,
                None => bench_harness::HarnessConfig {
                    model,
                    test,
                    device,
                    jit,
                    batch_size,
                    iterations,
                    warmup,
                    seed,
                    extra_args,
                    ..Default::default()
                },
            };
            commands::run::execute(config, json)
        }
        Commands::List => commands::list::execute(),
        Commands::Inspect {
            model,
            batch_size,
            image_size,
        } => commands::inspect::execute(&model, batch_size, image_size),
    }
}
