// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the train/eval loops of the model zoo.

use bench_harness::{
    apply_args, parse_args, BenchmarkModel, ModelOptions, ReferenceBackends, TestMode,
    VisionModel,
};
use criterion::{criterion_group, criterion_main, Criterion};
use tensor_core::Device;

fn lenet(test: TestMode, device: Device) -> VisionModel {
    let opts = ModelOptions {
        test,
        device,
        batch_size: Some(8),
        ..ModelOptions::default()
    };
    VisionModel::new("lenet5", &opts).unwrap()
}

fn bench_lenet_train(c: &mut Criterion) {
    let mut model = lenet(TestMode::Train, Device::Cpu);
    c.bench_function("lenet5_train_step", |b| b.iter(|| model.train(1).unwrap()));
}

fn bench_lenet_eval(c: &mut Criterion) {
    let mut model = lenet(TestMode::Eval, Device::Cpu);
    c.bench_function("lenet5_eval_step", |b| b.iter(|| model.eval(1).unwrap()));
}

fn bench_lenet_eval_lowered(c: &mut Criterion) {
    let mut model = lenet(TestMode::Eval, Device::Cuda);
    let options = parse_args(&model, &["--fx2trt"]).unwrap();
    apply_args(&mut model, &options, &ReferenceBackends::new()).unwrap();
    c.bench_function("lenet5_eval_fx2trt_fp16", |b| b.iter(|| model.eval(1).unwrap()));
}

criterion_group!(
    benches,
    bench_lenet_train,
    bench_lenet_eval,
    bench_lenet_eval_lowered
);
criterion_main!(benches);
