// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark timing metrics.

use crate::TestMode;
use std::time::Duration;
use tensor_core::Device;

/// Timing and throughput of one benchmark run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunMetrics {
    pub model: String,
    pub test: TestMode,
    pub device: Device,
    pub batch_size: usize,
    /// Backends applied before timing, in application order.
    pub backends: Vec<String>,
    pub warmup: usize,
    /// Wall-clock time of each timed call.
    pub iteration_durations: Vec<Duration>,
    pub total_duration: Duration,
    /// Forward FLOPs of one batch, when counted.
    pub flops_per_batch: Option<u64>,
}

impl RunMetrics {
    pub fn new(
        model: impl Into<String>,
        test: TestMode,
        device: Device,
        batch_size: usize,
        backends: Vec<String>,
        warmup: usize,
    ) -> Self {
        Self {
            model: model.into(),
            test,
            device,
            batch_size,
            backends,
            warmup,
            iteration_durations: Vec::new(),
            total_duration: Duration::ZERO,
            flops_per_batch: None,
        }
    }

    pub fn record_iteration(&mut self, elapsed: Duration) {
        self.iteration_durations.push(elapsed);
        self.total_duration += elapsed;
    }

    pub fn iterations(&self) -> usize {
        self.iteration_durations.len()
    }

    pub fn mean_duration(&self) -> Duration {
        match self.iterations() {
            0 => Duration::ZERO,
            n => self.total_duration / n as u32,
        }
    }

    pub fn min_duration(&self) -> Duration {
        self.iteration_durations.iter().copied().min().unwrap_or_default()
    }

    pub fn max_duration(&self) -> Duration {
        self.iteration_durations.iter().copied().max().unwrap_or_default()
    }

    /// Samples processed per second across the timed calls.
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.batch_size * self.iterations()) as f64 / secs
    }

    /// Achieved forward GFLOP/s, when FLOPs were counted.
    pub fn gflops_per_second(&self) -> Option<f64> {
        let flops = self.flops_per_batch?;
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 {
            return Some(0.0);
        }
        Some(flops as f64 * self.iterations() as f64 / secs / 1e9)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let backends = if self.backends.is_empty() {
            "none".to_string()
        } else {
            self.backends.join(",")
        };
        let mut line = format!(
            "{} {} on {}: batch {}, {} iterations, {:.2}ms mean ({:.2}-{:.2}ms), \
             {:.1} samples/s, backends: {}",
            self.model,
            self.test,
            self.device,
            self.batch_size,
            self.iterations(),
            self.mean_duration().as_secs_f64() * 1000.0,
            self.min_duration().as_secs_f64() * 1000.0,
            self.max_duration().as_secs_f64() * 1000.0,
            self.samples_per_second(),
            backends,
        );
        if let (Some(flops), Some(rate)) = (self.flops_per_batch, self.gflops_per_second()) {
            line.push_str(&format!(", {:.3} GFLOP/batch ({rate:.2} GFLOP/s)", flops as f64 / 1e9));
        }
        line
    }
}
