// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-to-end benchmark runs.
//!
//! ```text
//! HarnessConfig ─► VisionModel::new ─► parse_args ─► apply_args
//!                                                        │
//!                  RunMetrics ◄── timed loop ◄── warm-up ◄┘
//! ```

use crate::{
    apply_args, parse_args, Backends, BenchmarkModel, HarnessConfig, HarnessError, RunMetrics,
    TestMode, VisionModel,
};
use std::time::Instant;

/// Builds the configured model and benchmarks it.
pub fn run_benchmark(
    config: &HarnessConfig,
    backends: &dyn Backends,
) -> Result<RunMetrics, HarnessError> {
    config.validate()?;
    let mut model = VisionModel::new(&config.model, &config.model_options())?;
    run_model(&mut model, config, backends)
}

/// Resolves and applies `config.extra_args` to an existing model, then
/// times its loop.
///
/// Each timed iteration is one `train(1)` or `eval(1)` call, so a training
/// iteration is a full optimizer step.
pub fn run_model(
    model: &mut dyn BenchmarkModel,
    config: &HarnessConfig,
    backends: &dyn Backends,
) -> Result<RunMetrics, HarnessError> {
    let options = parse_args(model, &config.extra_args)?;
    apply_args(model, &options, backends)?;
    let applied = options.enabled_backends();
    let flops_enabled = options.flops;
    model.set_options(options);

    let mut metrics = RunMetrics::new(
        model.name(),
        model.test(),
        model.device(),
        model.batch_size(),
        applied,
        config.warmup,
    );
    if flops_enabled {
        metrics.flops_per_batch = Some(model.get_flops()?);
    }

    tracing::info!(
        model = model.name(),
        test = %model.test(),
        warmup = config.warmup,
        iterations = config.resolve_iterations(),
        "benchmark starting"
    );

    for _ in 0..config.warmup {
        step(model)?;
    }
    for iteration in 0..config.resolve_iterations() {
        let start = Instant::now();
        step(model)?;
        let elapsed = start.elapsed();
        tracing::debug!(iteration, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "iteration done");
        metrics.record_iteration(elapsed);
    }

    tracing::info!("{}", metrics.summary());
    Ok(metrics)
}

fn step(model: &mut dyn BenchmarkModel) -> Result<(), HarnessError> {
    match model.test() {
        TestMode::Train => model.train(1),
        TestMode::Eval => model.eval(1),
    }
}
