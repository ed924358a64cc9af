// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: option resolution, backend application and full
//! benchmark runs.
//!
//! These tests drive the public API only, combining the zoo, the reference
//! backends and the runner the same way the CLI does.

use bench_harness::{
    apply_args, parse_args, run_benchmark, run_model, Backends, BenchmarkModel, HarnessConfig,
    HarnessError, ModelFamily, ModelOptions, ModuleState, OptionSet, Precision, ReferenceBackends,
    TestMode, VisionModel,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;
use tensor_core::{DType, Device, Shape, Tensor};
use vision_nn::{Classifier, Flatten, Layer, Linear, Module};

// ── Helpers ────────────────────────────────────────────────────

const DEVICES: [Device; 2] = [Device::Cpu, Device::Cuda];
const TESTS: [TestMode; 2] = [TestMode::Train, TestMode::Eval];

/// A model outside the image-classification family.
struct SequenceModel {
    device: Device,
    test: TestMode,
    state: ModuleState,
    flops: Option<u64>,
}

impl SequenceModel {
    fn new(device: Device, test: TestMode) -> Self {
        let mut rng = StdRng::seed_from_u64(11);
        let mut module = Classifier::new(
            "sequence",
            vec![
                Layer::Flatten(Flatten::default()),
                Layer::Linear(Linear::new(8, 4, &mut rng)),
            ],
        );
        module.set_training(test == TestMode::Train);
        let input = Tensor::randn(Shape::matrix(2, 8), &mut rng);
        Self {
            device,
            test,
            state: ModuleState::new(Box::new(module), vec![input]),
            flops: None,
        }
    }
}

impl BenchmarkModel for SequenceModel {
    fn name(&self) -> &str {
        "sequence"
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Other
    }

    fn device(&self) -> Device {
        self.device
    }

    fn test(&self) -> TestMode {
        self.test
    }

    fn jit(&self) -> bool {
        false
    }

    fn batch_size(&self) -> usize {
        2
    }

    fn get_module(&self) -> &ModuleState {
        &self.state
    }

    fn set_module_state(&mut self, state: ModuleState) {
        self.state = state;
    }

    fn set_module(&mut self, module: Box<dyn Module>) {
        self.state.module = module;
    }

    fn set_flops(&mut self, per_sample: u64) {
        self.flops = Some(per_sample);
    }

    fn get_flops(&self) -> Result<u64, HarnessError> {
        self.flops
            .map(|f| f * 2)
            .ok_or_else(|| HarnessError::Unsupported("flops disabled".into()))
    }

    fn set_options(&mut self, _options: OptionSet) {}

    fn train(&mut self, _iterations: usize) -> Result<(), HarnessError> {
        Ok(())
    }

    fn eval(&mut self, iterations: usize) -> Result<(), HarnessError> {
        for _ in 0..iterations {
            self.state.module.forward(&self.state.example_inputs)?;
        }
        Ok(())
    }
}

fn lenet(device: Device, test: TestMode, jit: bool) -> VisionModel {
    let opts = ModelOptions {
        test,
        device,
        jit,
        batch_size: Some(2),
        ..ModelOptions::default()
    };
    VisionModel::new("lenet5", &opts).unwrap()
}

/// Records the order backends are applied in. The fuser is only recorded
/// so that no process-wide state leaks between tests.
#[derive(Default)]
struct RecordingBackends {
    calls: Mutex<Vec<String>>,
}

impl RecordingBackends {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Backends for RecordingBackends {
    fn enable_fuser(&self, name: &str) -> Result<(), HarnessError> {
        self.record(format!("fuser:{name}"));
        Ok(())
    }

    fn enable_fp16(&self, state: &ModuleState) -> Result<ModuleState, HarnessError> {
        self.record("fp16");
        ReferenceBackends.enable_fp16(state)
    }

    fn enable_fx2trt(
        &self,
        batch_size: usize,
        fp16: bool,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError> {
        self.record(format!("fx2trt:{batch_size}:{fp16}"));
        ReferenceBackends.enable_fx2trt(batch_size, fp16, module, example_inputs)
    }

    fn enable_torch_trt(
        &self,
        precision: Precision,
        module: &dyn Module,
        example_inputs: &[Tensor],
    ) -> Result<Box<dyn Module>, HarnessError> {
        self.record(format!("torch_trt:{precision}"));
        ReferenceBackends.enable_torch_trt(precision, module, example_inputs)
    }

    fn enable_flops(&self, model: &mut dyn BenchmarkModel) -> Result<(), HarnessError> {
        self.record("flops");
        ReferenceBackends.enable_flops(model)
    }
}

fn assert_unsupported(result: Result<OptionSet, HarnessError>) {
    match result {
        Err(e) => assert!(e.is_unsupported(), "expected unsupported, got {e}"),
        Ok(options) => panic!("expected unsupported, got {options:?}"),
    }
}

// ── Resolution properties ──────────────────────────────────────

#[test]
fn test_fp16_never_allowed_outside_image_classification() {
    for device in DEVICES {
        for test in TESTS {
            let model = SequenceModel::new(device, test);
            assert_unsupported(parse_args(&model, &["--fp16"]));
        }
    }
}

#[test]
fn test_fp16_default_only_for_cuda_inference() {
    for device in DEVICES {
        for test in TESTS {
            let model = lenet(device, test, false);
            let options = parse_args(&model, &[] as &[&str]).unwrap();
            assert_eq!(
                options.fp16,
                device == Device::Cuda && test == TestMode::Eval,
                "{device} {test}"
            );
        }
    }
}

#[test]
fn test_cpu_always_drops_fuser() {
    for test in TESTS {
        let model = lenet(Device::Cpu, test, false);
        for name in ["nvfuser", "fuser1", "no-such-fuser"] {
            let options = parse_args(&model, &["--fuser", name]).unwrap();
            assert_eq!(options.fuser, None);
        }
    }
}

#[test]
fn test_cuda_keeps_fuser() {
    let model = lenet(Device::Cuda, TestMode::Train, false);
    let options = parse_args(&model, &["--fuser", "fuser2"]).unwrap();
    assert_eq!(options.fuser.as_deref(), Some("fuser2"));
}

#[test]
fn test_repeated_flags_resolve_last_wins() {
    let model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(
        &model,
        &["--flops", "--flops", "--fp16", "--fp16", "--fuser", "te", "--fuser", "nvfuser"],
    )
    .unwrap();
    assert!(options.flops);
    assert!(options.fp16);
    assert_eq!(options.fuser.as_deref(), Some("nvfuser"));

    let options = parse_args(&model, &["--no-fp16", "--no-fp16"]).unwrap();
    assert!(!options.fp16);
}

#[test]
fn test_empty_fuser_is_disabled() {
    let model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(&model, &["--fuser", ""]).unwrap();
    assert_eq!(options.fuser, None);
    assert!(options.enabled_backends().iter().all(|b| !b.starts_with("fuser")));
}

#[test]
fn test_trt_backends_require_cuda_inference() {
    let combos = [
        (Device::Cpu, TestMode::Eval),
        (Device::Cpu, TestMode::Train),
        (Device::Cuda, TestMode::Train),
    ];
    for (device, test) in combos {
        let model = lenet(device, test, false);
        for flag in ["--fx2trt", "--torch_trt"] {
            assert_unsupported(parse_args(&model, &[flag]));
        }
        let other = SequenceModel::new(device, test);
        assert_unsupported(parse_args(&other, &["--torch_trt"]));
    }
}

#[test]
fn test_flops_rejected_and_reset_outside_image_classification() {
    let model = SequenceModel::new(Device::Cuda, TestMode::Eval);
    let mut options = OptionSet::from_args(&model, &["--flops"]).unwrap();
    assert!(options.flops);
    assert!(options.validate(&model).unwrap_err().is_unsupported());
    assert!(!options.flops);

    assert_unsupported(parse_args(&model, &["--flops"]));
}

#[test]
fn test_model_owned_fields_are_copied() {
    let model = lenet(Device::Cuda, TestMode::Eval, true);
    let options = parse_args(&model, &["--no-fp16"]).unwrap();
    assert_eq!(options.device, Device::Cuda);
    assert_eq!(options.test, TestMode::Eval);
    assert_eq!(options.batch_size, 2);
    assert!(options.jit);
    assert!(!options.fp16);
}

#[test]
fn test_malformed_arguments() {
    let model = lenet(Device::Cpu, TestMode::Eval, false);
    let err = parse_args(&model, &["--fp16", "--no-fp16"]).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidArguments(_)));
    let err = parse_args(&model, &["--warp-speed"]).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidArguments(_)));
}

// ── End-to-end scenarios ───────────────────────────────────────

#[test]
fn test_cuda_eval_defaults() {
    let model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(&model, &[] as &[&str]).unwrap();
    assert!(options.fp16);
    assert!(!options.cudagraph);
}

#[test]
fn test_cpu_train_with_fuser() {
    let model = lenet(Device::Cpu, TestMode::Train, false);
    let options = parse_args(&model, &["--fuser", "nvfuser"]).unwrap();
    assert_eq!(options.fuser, None);
    assert!(!options.fp16);
}

#[test]
fn test_fx2trt_with_jit_not_implemented() {
    let mut model = lenet(Device::Cuda, TestMode::Eval, true);
    let options = parse_args(&model, &["--fx2trt", "--jit"]).unwrap();
    assert!(options.fx2trt);
    let err = apply_args(&mut model, &options, &ReferenceBackends::new()).unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("not implemented"));
}

#[test]
fn test_failed_resolution_leaves_model_untouched() {
    let model = lenet(Device::Cpu, TestMode::Eval, false);
    assert_unsupported(parse_args(&model, &["--fp16"]));
    assert_eq!(model.get_module().module.dtype(), DType::F32);
    assert_eq!(model.get_module().example_inputs[0].dtype(), DType::F32);
}

// ── Application ────────────────────────────────────────────────

#[test]
fn test_backends_applied_in_order() {
    let mut model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(
        &model,
        &["--flops", "--torch_trt", "--fx2trt", "--fuser", "fuser1"],
    )
    .unwrap();
    let recorder = RecordingBackends::default();
    apply_args(&mut model, &options, &recorder).unwrap();

    assert_eq!(
        recorder.calls(),
        ["fuser:fuser1", "fp16", "fx2trt:2:true", "torch_trt:fp16", "flops"]
    );
    assert_eq!(
        options.enabled_backends(),
        ["fuser=fuser1", "fp16", "fx2trt", "torch_trt", "flops"]
    );
}

#[test]
fn test_fp16_replaces_module_and_inputs() {
    let mut model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(&model, &[] as &[&str]).unwrap();
    apply_args(&mut model, &options, &ReferenceBackends::new()).unwrap();
    let state = model.get_module();
    assert_eq!(state.module.dtype(), DType::F16);
    assert_eq!(state.example_inputs[0].dtype(), DType::F16);
    model.eval(1).unwrap();
}

#[test]
fn test_torch_trt_precision_follows_fp16() {
    let mut model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(&model, &["--torch_trt", "--no-fp16"]).unwrap();
    let recorder = RecordingBackends::default();
    apply_args(&mut model, &options, &recorder).unwrap();
    assert_eq!(recorder.calls(), ["torch_trt:fp32"]);
    assert_eq!(model.get_module().module.dtype(), DType::F32);
}

#[test]
fn test_lowered_module_is_frozen() {
    let mut model = lenet(Device::Cuda, TestMode::Eval, false);
    let options = parse_args(&model, &["--fx2trt"]).unwrap();
    apply_args(&mut model, &options, &ReferenceBackends::new()).unwrap();
    let mut module = model.get_module().module.clone();
    assert!(module.parameters_mut().is_empty());
    assert!(!module.is_training());
    model.eval(2).unwrap();
}

#[test]
fn test_flops_per_batch() {
    let mut model = lenet(Device::Cpu, TestMode::Eval, false);
    assert!(model.get_flops().is_err());
    let options = parse_args(&model, &["--flops"]).unwrap();
    apply_args(&mut model, &options, &ReferenceBackends::new()).unwrap();

    let per_sample: u64 = 6 * 28 * 28 * 75 + 16 * 10 * 10 * 150 + 400 * 120 + 120 * 84 + 84 * 10;
    assert_eq!(model.get_flops().unwrap(), per_sample * 2);
}

// ── Runner ─────────────────────────────────────────────────────

#[test]
fn test_run_benchmark_eval_with_flops() {
    let config = HarnessConfig {
        batch_size: Some(2),
        iterations: Some(3),
        warmup: 0,
        extra_args: vec!["--flops".into()],
        ..Default::default()
    };
    let metrics = run_benchmark(&config, &ReferenceBackends::new()).unwrap();
    assert_eq!(metrics.model, "lenet5");
    assert_eq!(metrics.iterations(), 3);
    assert_eq!(metrics.backends, ["flops"]);
    assert!(metrics.flops_per_batch.unwrap() > 0);
    assert!(metrics.gflops_per_second().is_some());
}

#[test]
fn test_run_benchmark_train_with_jit() {
    let config = HarnessConfig {
        test: TestMode::Train,
        jit: true,
        batch_size: Some(2),
        iterations: Some(2),
        ..Default::default()
    };
    let metrics = run_benchmark(&config, &ReferenceBackends::new()).unwrap();
    assert_eq!(metrics.test, TestMode::Train);
    assert_eq!(metrics.iterations(), 2);
    assert!(metrics.backends.is_empty());
}

#[test]
fn test_run_benchmark_with_appended_duplicate_args() {
    let mut config = HarnessConfig::from_toml(
        "model = \"lenet5\"\nbatch_size = 2\nwarmup = 0\nextra_args = [\"--flops\"]\n",
    )
    .unwrap();
    config.extra_args.push("--flops".into());
    let metrics = run_benchmark(&config, &ReferenceBackends::new()).unwrap();
    assert_eq!(metrics.backends, ["flops"]);
    assert!(metrics.flops_per_batch.is_some());
}

#[test]
fn test_run_benchmark_unknown_model() {
    let config = HarnessConfig {
        model: "resnet50".into(),
        ..Default::default()
    };
    let err = run_benchmark(&config, &ReferenceBackends::new()).unwrap_err();
    assert!(matches!(err, HarnessError::UnknownModel(_)));
}

#[test]
fn test_run_model_rejects_flops_for_other_family() {
    let mut model = SequenceModel::new(Device::Cpu, TestMode::Eval);
    let config = HarnessConfig {
        extra_args: vec!["--flops".into()],
        ..Default::default()
    };
    let err = run_model(&mut model, &config, &ReferenceBackends::new()).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_run_model_other_family() {
    let mut model = SequenceModel::new(Device::Cpu, TestMode::Eval);
    let config = HarnessConfig {
        iterations: Some(2),
        ..Default::default()
    };
    let metrics = run_model(&mut model, &config, &ReferenceBackends::new()).unwrap();
    assert_eq!(metrics.model, "sequence");
    assert_eq!(metrics.iterations(), 2);
}
