// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The benchmark-model abstraction the harness drives.

use crate::{HarnessError, OptionSet};
use std::fmt;
use std::str::FromStr;
use tensor_core::{Device, Tensor};
use vision_nn::Module;

/// Which loop a benchmark exercises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    Train,
    #[default]
    Eval,
}

impl TestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TestMode::Train => "train",
            TestMode::Eval => "eval",
        }
    }

    /// Loop count of a single `train`/`eval` call when none is given.
    pub fn default_iterations(self) -> usize {
        match self {
            TestMode::Train => 3,
            TestMode::Eval => 1,
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "train" => Ok(TestMode::Train),
            "eval" => Ok(TestMode::Eval),
            other => Err(format!("unknown test mode '{other}'; expected 'train' or 'eval'")),
        }
    }
}

/// Model family. Several backends are only offered to image classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    ImageClassification,
    Other,
}

/// The module a benchmark runs together with inputs matching it.
///
/// Backends that rewrite the module hand back a whole new state, so the
/// module and its inputs are always replaced together.
#[derive(Debug, Clone)]
pub struct ModuleState {
    pub module: Box<dyn Module>,
    pub example_inputs: Vec<Tensor>,
}

impl ModuleState {
    pub fn new(module: Box<dyn Module>, example_inputs: Vec<Tensor>) -> Self {
        Self {
            module,
            example_inputs,
        }
    }
}

/// A model wrapped for uniform benchmarking.
pub trait BenchmarkModel: Send {
    fn name(&self) -> &str;

    fn family(&self) -> ModelFamily;

    fn device(&self) -> Device;

    fn test(&self) -> TestMode;

    /// Whether the module was scripted at construction.
    fn jit(&self) -> bool;

    fn batch_size(&self) -> usize;

    /// The current module and example inputs.
    fn get_module(&self) -> &ModuleState;

    /// Replaces the module and example inputs together.
    fn set_module_state(&mut self, state: ModuleState);

    /// Replaces the module, keeping the example inputs.
    fn set_module(&mut self, module: Box<dyn Module>);

    /// Records the forward FLOPs of a single sample.
    fn set_flops(&mut self, per_sample: u64);

    /// Forward FLOPs of one batch. Fails unless flop counting was enabled.
    fn get_flops(&self) -> Result<u64, HarnessError>;

    /// Stores the resolved options the loops consult.
    fn set_options(&mut self, options: OptionSet);

    fn train(&mut self, iterations: usize) -> Result<(), HarnessError>;

    fn eval(&mut self, iterations: usize) -> Result<(), HarnessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("TRAIN".parse::<TestMode>().unwrap(), TestMode::Train);
        assert_eq!(TestMode::Eval.to_string(), "eval");
        assert!("infer".parse::<TestMode>().is_err());
    }

    #[test]
    fn test_default_iterations() {
        assert_eq!(TestMode::Train.default_iterations(), 3);
        assert_eq!(TestMode::Eval.default_iterations(), 1);
    }
}
