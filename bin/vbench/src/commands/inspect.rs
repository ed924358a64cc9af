// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vbench inspect` command: display a model's layer table.
//!
//! Builds the architecture with its default configuration and walks the
//! input shape through every layer, printing output shapes, parameter
//! counts and multiply-accumulate counts.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tensor_core::Shape;
use vision_nn::zoo;

pub fn execute(model: &str, batch_size: usize, image_size: Option<usize>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               vbench · Model Inspector               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let arch = zoo::find(model).ok_or_else(|| {
        let known: Vec<&str> = zoo::architectures().iter().map(|a| a.name).collect();
        anyhow::anyhow!("unknown model '{model}' (known: {})", known.join(", "))
    })?;
    if batch_size == 0 {
        anyhow::bail!("batch size must be positive");
    }
    let mut config = arch.default_config();
    if let Some(size) = image_size {
        config.image_size = size;
    }
    let classifier = zoo::build(arch.name, &config, &mut StdRng::seed_from_u64(0))?;
    let input = Shape::nchw(batch_size, config.in_channels, config.image_size, config.image_size);
    let summaries = classifier.layer_summaries(&input)?;

    // ── Summary ────────────────────────────────────────────────
    let total_flops: u64 = summaries.iter().map(|s| s.flops).sum();
    println!("  Model:       {} ({})", arch.name, arch.description);
    println!("  Input:       {input}");
    println!("  Output:      {}", classifier.output_shape(&input)?);
    println!("  Layers:      {}", summaries.len());
    println!(
        "  Parameters:  {} ({:.2} MB as f32)",
        classifier.num_parameters(),
        (classifier.num_parameters() * 4) as f64 / (1024.0 * 1024.0),
    );
    println!("  GFLOPs:      {:.3}", total_flops as f64 / 1e9);
    println!();

    // ── Per-Layer Detail ───────────────────────────────────────
    println!(
        "  {:<4} {:<10} {:<32} {:<20} {:>10} {:>12}",
        "Idx", "Kind", "Layer", "Output", "Params", "MACs",
    );
    println!("  {}", "-".repeat(94));
    for s in &summaries {
        println!(
            "  {:<4} {:<10} {:<32} {:<20} {:>10} {:>12}",
            s.index,
            s.kind,
            super::truncate(&s.description, 32),
            s.output_shape.to_string(),
            s.parameters,
            s.flops,
        );
    }
    println!();

    Ok(())
}
