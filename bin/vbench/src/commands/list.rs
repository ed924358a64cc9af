// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vbench list` command: print the model zoo.

use vision_nn::zoo;

pub fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║                 vbench · Model Zoo                   ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!(
        "  {:<10} {:>6} {:>8} {:>11} {:>10}  {}",
        "Name", "Image", "Classes", "Train batch", "Eval batch", "Description",
    );
    println!("  {}", "-".repeat(88));

    for arch in zoo::architectures() {
        println!(
            "  {:<10} {:>6} {:>8} {:>11} {:>10}  {}",
            arch.name,
            arch.default_image_size,
            arch.default_num_classes,
            arch.default_train_batch,
            arch.default_eval_batch,
            super::truncate(arch.description, 40),
        );
    }
    println!();

    Ok(())
}
