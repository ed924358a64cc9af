// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vbench run` command: build a zoo model, apply the extra arguments and
//! time its loop.
//!
//! ```text
//! HarnessConfig → VisionModel → parse_args → apply_args → warm-up → timed loop
//! ```

use bench_harness::{run_benchmark, HarnessConfig, ReferenceBackends, RunMetrics};
use std::path::Path;

/// Loads `path` and appends any extra arguments given on the command line.
pub fn from_file(path: &Path, extra_args: Vec<String>) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::from_file(path)?;
    config.extra_args.extend(extra_args);
    Ok(config)
}

pub fn execute(config: HarnessConfig, json: bool) -> anyhow::Result<()> {
    let backends = ReferenceBackends::new();

    if json {
        let metrics = run_benchmark(&config, &backends)?;
        println!("{}", serde_json::to_string_pretty(&Report::from(&metrics))?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              vbench · Benchmark Runner               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    println!("  Config:");
    println!("   Model:      {}", config.model);
    println!("   Test:       {}", config.test);
    println!("   Device:     {}", config.device);
    println!("   JIT:        {}", config.jit);
    match config.batch_size {
        Some(b) => println!("   Batch:      {b}"),
        None => println!("   Batch:      (architecture default)"),
    }
    println!(
        "   Iterations: {} (+{} warm-up)",
        config.resolve_iterations(),
        config.warmup
    );
    if !config.extra_args.is_empty() {
        println!("   Extra args: {}", config.extra_args.join(" "));
    }
    println!();

    let metrics = match run_benchmark(&config, &backends) {
        Ok(m) => m,
        Err(e) if e.is_unsupported() => {
            println!("  Configuration rejected: {e}");
            println!();
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    // ── Results ────────────────────────────────────────────────
    let backends = if metrics.backends.is_empty() {
        "none".to_string()
    } else {
        metrics.backends.join(", ")
    };
    println!("  Results:");
    println!("   Batch size:   {}", metrics.batch_size);
    println!("   Backends:     {backends}");
    println!(
        "   Mean:         {:.2}ms  (min {:.2}ms, max {:.2}ms)",
        ms(metrics.mean_duration()),
        ms(metrics.min_duration()),
        ms(metrics.max_duration()),
    );
    println!("   Throughput:   {:.1} samples/s", metrics.samples_per_second());
    if let Some(flops) = metrics.flops_per_batch {
        println!("   FLOPs/batch:  {:.3} G", flops as f64 / 1e9);
    }
    if let Some(rate) = metrics.gflops_per_second() {
        println!("   Compute:      {rate:.2} GFLOP/s");
    }
    println!();

    // ── Per-Iteration ──────────────────────────────────────────
    println!("  {:<6} {:>12}", "Iter", "Time");
    println!("  {}", "-".repeat(20));
    for (i, d) in metrics.iteration_durations.iter().enumerate() {
        println!("  {:<6} {:>10.2}ms", i, ms(*d));
    }
    println!();

    Ok(())
}

fn ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// JSON form of a run: the raw metrics plus derived rates.
#[derive(serde::Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    metrics: &'a RunMetrics,
    mean_ms: f64,
    min_ms: f64,
    max_ms: f64,
    samples_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gflops_per_second: Option<f64>,
}

impl<'a> From<&'a RunMetrics> for Report<'a> {
    fn from(metrics: &'a RunMetrics) -> Self {
        Self {
            metrics,
            mean_ms: ms(metrics.mean_duration()),
            min_ms: ms(metrics.min_duration()),
            max_ms: ms(metrics.max_duration()),
            samples_per_second: metrics.samples_per_second(),
            gflops_per_second: metrics.gflops_per_second(),
        }
    }
}
