// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark adapter for the image-classification zoo.

use crate::{BenchmarkModel, HarnessError, ModelFamily, ModuleState, OptionSet, TestMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tensor_core::{Device, Shape, Tensor};
use vision_nn::{jit, zoo, Adam, AdamConfig, ArchConfig, CrossEntropyLoss, Module};

/// How to construct a [`VisionModel`]. Unset sizes fall back to the
/// architecture's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOptions {
    pub test: TestMode,
    pub device: Device,
    pub jit: bool,
    pub batch_size: Option<usize>,
    pub image_size: Option<usize>,
    pub num_classes: Option<usize>,
    pub seed: u64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            test: TestMode::Eval,
            device: Device::Cpu,
            jit: false,
            batch_size: None,
            image_size: None,
            num_classes: None,
            seed: 0,
        }
    }
}

/// An image classifier prepared for train/eval benchmark loops.
///
/// The loops run on a fixed random workload: `train` fits the "real"
/// input/target pair, `eval` runs inference over the example inputs.
#[derive(Debug)]
pub struct VisionModel {
    name: String,
    test: TestMode,
    device: Device,
    jit: bool,
    batch_size: usize,
    arch: ArchConfig,
    state: ModuleState,
    example_outputs: Tensor,
    real_input: Vec<Tensor>,
    real_output: Vec<Tensor>,
    optimizer: Option<Adam>,
    loss_fn: CrossEntropyLoss,
    options: Option<OptionSet>,
    flops: Option<u64>,
    graph_captured: bool,
}

impl VisionModel {
    /// Builds architecture `arch` with random weights and a random
    /// workload, all derived from `opts.seed`.
    pub fn new(arch: &str, opts: &ModelOptions) -> Result<Self, HarnessError> {
        let spec = zoo::find(arch).ok_or_else(|| HarnessError::UnknownModel(arch.to_string()))?;
        let batch_size = opts.batch_size.unwrap_or(match opts.test {
            TestMode::Train => spec.default_train_batch,
            TestMode::Eval => spec.default_eval_batch,
        });
        if batch_size == 0 {
            return Err(HarnessError::Config("batch size must be positive".into()));
        }
        let arch_config = ArchConfig {
            image_size: opts.image_size.unwrap_or(spec.default_image_size),
            num_classes: opts.num_classes.unwrap_or(spec.default_num_classes),
            in_channels: 3,
        };

        let mut rng = StdRng::seed_from_u64(opts.seed);
        let mut model = zoo::build(spec.name, &arch_config, &mut rng)?;
        model.to_device(opts.device);

        let example = Tensor::randn(
            Shape::nchw(
                batch_size,
                arch_config.in_channels,
                arch_config.image_size,
                arch_config.image_size,
            ),
            &mut rng,
        )
        .to_device(opts.device);

        model.set_training(false);
        let example_outputs = model.forward(std::slice::from_ref(&example))?.rand_like(&mut rng);

        let optimizer = match opts.test {
            TestMode::Train => {
                model.set_training(true);
                Some(Adam::new(AdamConfig::default()))
            }
            TestMode::Eval => None,
        };

        let real_input = vec![example.rand_like(&mut rng)];
        let real_output = vec![example_outputs.rand_like(&mut rng)];

        let module: Box<dyn Module> = if opts.jit {
            let scripted = jit::script(model, std::slice::from_ref(&example))?;
            match opts.test {
                TestMode::Eval => Box::new(scripted.optimize_for_inference()?),
                TestMode::Train => Box::new(scripted),
            }
        } else {
            Box::new(model)
        };

        tracing::info!(
            model = spec.name,
            test = %opts.test,
            device = %opts.device,
            jit = opts.jit,
            batch_size,
            image_size = arch_config.image_size,
            "model ready"
        );

        Ok(Self {
            name: spec.name.to_string(),
            test: opts.test,
            device: opts.device,
            jit: opts.jit,
            batch_size,
            arch: arch_config,
            state: ModuleState::new(module, vec![example]),
            example_outputs,
            real_input,
            real_output,
            optimizer,
            loss_fn: CrossEntropyLoss::new(),
            options: None,
            flops: None,
            graph_captured: false,
        })
    }

    pub fn arch_config(&self) -> &ArchConfig {
        &self.arch
    }

    pub fn example_outputs(&self) -> &Tensor {
        &self.example_outputs
    }

    /// The fixed input/target pair the training loop fits.
    pub fn real_pair(&self) -> (&[Tensor], &[Tensor]) {
        (&self.real_input, &self.real_output)
    }

    pub fn options(&self) -> Option<&OptionSet> {
        self.options.as_ref()
    }

    pub fn is_graph_captured(&self) -> bool {
        self.graph_captured
    }

    /// Records one training step over the example buffers for later
    /// replay. Replays read whatever the buffers hold at that time.
    pub fn capture_graph(&mut self) -> Result<(), HarnessError> {
        let optimizer = self.optimizer.as_mut().ok_or_else(|| {
            HarnessError::unsupported("graph capture is only available for training")
        })?;
        optimizer.zero_grad(self.state.module.parameters_mut());
        training_step(
            self.state.module.as_mut(),
            optimizer,
            &self.loss_fn,
            &self.state.example_inputs[0],
            &self.example_outputs,
        )?;
        self.graph_captured = true;
        tracing::info!(model = self.name.as_str(), "captured training graph");
        Ok(())
    }

    fn cudagraph(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.cudagraph)
    }
}

/// Forward, loss, backward and optimizer step. Returns the loss.
fn training_step(
    module: &mut dyn Module,
    optimizer: &mut Adam,
    loss_fn: &CrossEntropyLoss,
    input: &Tensor,
    target: &Tensor,
) -> Result<f32, HarnessError> {
    let pred = module.forward(std::slice::from_ref(input))?;
    let loss = loss_fn.forward(&pred, target)?;
    module.backward(&loss.grad)?;
    optimizer.step(module.parameters_mut())?;
    Ok(loss.loss)
}

impl BenchmarkModel for VisionModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::ImageClassification
    }

    fn device(&self) -> Device {
        self.device
    }

    fn test(&self) -> TestMode {
        self.test
    }

    fn jit(&self) -> bool {
        self.jit
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn get_module(&self) -> &ModuleState {
        &self.state
    }

    fn set_module_state(&mut self, state: ModuleState) {
        self.state = state;
        self.graph_captured = false;
    }

    fn set_module(&mut self, module: Box<dyn Module>) {
        self.state.module = module;
        self.graph_captured = false;
    }

    fn set_flops(&mut self, per_sample: u64) {
        self.flops = Some(per_sample);
    }

    fn get_flops(&self) -> Result<u64, HarnessError> {
        self.flops
            .map(|f| f * self.batch_size as u64)
            .ok_or_else(|| HarnessError::unsupported("flop counting was not enabled"))
    }

    fn set_options(&mut self, options: OptionSet) {
        self.options = Some(options);
    }

    fn train(&mut self, iterations: usize) -> Result<(), HarnessError> {
        let cudagraph = self.cudagraph();
        if cudagraph && !self.graph_captured {
            return Err(HarnessError::unsupported(
                "cuda graph replay requested before a graph was captured",
            ));
        }
        let optimizer = self.optimizer.as_mut().ok_or_else(|| {
            HarnessError::unsupported(format!("'{}' was built for eval and cannot train", self.name))
        })?;

        for iteration in 0..iterations {
            optimizer.zero_grad(self.state.module.parameters_mut());
            for (data, target) in self.real_input.iter().zip(&self.real_output) {
                let loss = if cudagraph {
                    self.state.example_inputs[0].copy_from(data)?;
                    self.example_outputs.copy_from(target)?;
                    training_step(
                        self.state.module.as_mut(),
                        optimizer,
                        &self.loss_fn,
                        &self.state.example_inputs[0],
                        &self.example_outputs,
                    )?
                } else {
                    training_step(
                        self.state.module.as_mut(),
                        optimizer,
                        &self.loss_fn,
                        data,
                        target,
                    )?
                };
                tracing::debug!(iteration, loss, "train step");
            }
        }
        Ok(())
    }

    fn eval(&mut self, iterations: usize) -> Result<(), HarnessError> {
        if self.cudagraph() {
            return Err(HarnessError::unsupported(
                "not implemented: cuda graphs are not yet supported for inference",
            ));
        }
        for iteration in 0..iterations {
            self.state.module.forward(&self.state.example_inputs)?;
            tracing::debug!(iteration, "eval step");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::DType;

    fn lenet(test: TestMode, jit: bool) -> VisionModel {
        let opts = ModelOptions {
            test,
            jit,
            batch_size: Some(2),
            ..ModelOptions::default()
        };
        VisionModel::new("lenet5", &opts).unwrap()
    }

    fn options_for(model: &VisionModel, cudagraph: bool) -> OptionSet {
        OptionSet {
            device: model.device(),
            jit: model.jit(),
            test: model.test(),
            batch_size: model.batch_size(),
            flops: false,
            fx2trt: false,
            fuser: None,
            torch_trt: false,
            fp16: false,
            cudagraph,
        }
    }

    #[test]
    fn test_construction_shapes() {
        let m = lenet(TestMode::Eval, false);
        let state = m.get_module();
        assert_eq!(state.example_inputs[0].shape(), &Shape::nchw(2, 3, 32, 32));
        assert_eq!(m.example_outputs().shape(), &Shape::matrix(2, 10));
        let (input, output) = m.real_pair();
        assert_eq!(input[0].shape(), state.example_inputs[0].shape());
        assert_ne!(&input[0], &state.example_inputs[0]);
        assert_eq!(output[0].shape(), m.example_outputs().shape());
        assert!(!state.module.is_training());
    }

    #[test]
    fn test_default_batch_sizes() {
        let eval = VisionModel::new("lenet5", &ModelOptions::default()).unwrap();
        assert_eq!(eval.batch_size(), 256);
    }

    #[test]
    fn test_unknown_model() {
        let err = VisionModel::new("resnet50", &ModelOptions::default()).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownModel(_)));
    }

    #[test]
    fn test_train_updates_parameters() {
        let mut m = lenet(TestMode::Train, false);
        let before = m.state.module.parameters_mut()[0].value.clone();
        m.train(2).unwrap();
        let after = m.state.module.parameters_mut()[0].value.clone();
        assert_ne!(before, after);
        assert_eq!(m.optimizer.as_ref().unwrap().steps(), 2);
    }

    #[test]
    fn test_train_on_eval_model_fails() {
        let mut m = lenet(TestMode::Eval, false);
        assert!(m.train(1).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_eval_runs() {
        let mut m = lenet(TestMode::Eval, false);
        m.eval(2).unwrap();
    }

    #[test]
    fn test_jit_eval_is_frozen() {
        let mut m = lenet(TestMode::Eval, true);
        assert!(m.state.module.parameters_mut().is_empty());
        m.eval(1).unwrap();
    }

    #[test]
    fn test_jit_train_still_trains() {
        let mut m = lenet(TestMode::Train, true);
        m.train(1).unwrap();
        assert_eq!(m.optimizer.as_ref().unwrap().steps(), 1);
    }

    #[test]
    fn test_cudagraph_eval_not_implemented() {
        let mut m = lenet(TestMode::Eval, false);
        let opts = options_for(&m, true);
        m.set_options(opts);
        assert!(m.eval(1).unwrap_err().to_string().contains("not implemented"));
    }

    #[test]
    fn test_cudagraph_train_replays_captured_graph() {
        let mut m = lenet(TestMode::Train, false);
        let opts = options_for(&m, true);
        m.set_options(opts);
        assert!(m.train(1).is_err());

        m.capture_graph().unwrap();
        m.train(1).unwrap();
        assert_eq!(m.get_module().example_inputs[0], m.real_pair().0[0]);
        assert_eq!(m.optimizer.as_ref().unwrap().steps(), 2);
    }

    #[test]
    fn test_replacing_module_drops_captured_graph() {
        let mut m = lenet(TestMode::Train, false);
        m.capture_graph().unwrap();
        let module = m.get_module().module.clone();
        m.set_module(module);
        assert!(!m.is_graph_captured());
    }

    #[test]
    fn test_flops_require_enabling() {
        let mut m = lenet(TestMode::Eval, false);
        assert!(m.get_flops().is_err());
        m.set_flops(1_000);
        assert_eq!(m.get_flops().unwrap(), 2_000);
    }

    #[test]
    fn test_example_outputs_keep_f32() {
        let m = lenet(TestMode::Eval, false);
        assert_eq!(m.example_outputs().dtype(), DType::F32);
    }
}
