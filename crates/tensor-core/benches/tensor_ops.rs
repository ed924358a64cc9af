// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for tensor operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tensor_core::{conv2d, matmul, softmax, Conv2dParams, DType, Shape, Tensor};

fn bench_matmul(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let a = Tensor::randn(Shape::matrix(128, 256), &mut rng);
    let b = Tensor::randn(Shape::matrix(256, 128), &mut rng);
    let mut out = Tensor::zeros(Shape::matrix(128, 128), DType::F32);

    c.bench_function("matmul_128x256x128", |bench| {
        bench.iter(|| matmul(black_box(&a), black_box(&b), &mut out).unwrap())
    });
}

fn bench_softmax(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let logits = Tensor::randn(Shape::matrix(64, 1000), &mut rng);
    let mut out = Tensor::zeros(Shape::matrix(64, 1000), DType::F32);

    c.bench_function("softmax_64x1000", |bench| {
        bench.iter(|| softmax(black_box(&logits), &mut out).unwrap())
    });
}

fn bench_conv2d(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let x = Tensor::randn(Shape::nchw(4, 3, 32, 32), &mut rng);
    let w = Tensor::randn(Shape::nchw(16, 3, 3, 3), &mut rng);

    c.bench_function("conv2d_4x3x32x32_k3", |bench| {
        bench.iter(|| conv2d(black_box(&x), &w, None, Conv2dParams::new(1, 1), true).unwrap())
    });
}

criterion_group!(benches, bench_matmul, bench_softmax, bench_conv2d);
criterion_main!(benches);
