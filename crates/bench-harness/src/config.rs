// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! model = "alexnet"
//! test = "eval"
//! device = "cuda"
//! jit = false
//! batch_size = 32
//! iterations = 10
//! warmup = 2
//! seed = 7
//! extra_args = ["--flops", "--no-fp16"]
//! ```

use crate::{HarnessError, ModelOptions, TestMode};
use std::path::Path;
use tensor_core::Device;

/// Configuration for one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HarnessConfig {
    /// Architecture name from the model zoo.
    pub model: String,
    #[serde(default)]
    pub test: TestMode,
    #[serde(default)]
    pub device: Device,
    /// Script the model at construction (and freeze it for eval).
    #[serde(default)]
    pub jit: bool,
    /// Defaults to the architecture's train/eval batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<usize>,
    /// Timed `train`/`eval` calls; defaults to the test mode's loop count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    /// Untimed calls made before measuring.
    #[serde(default = "default_warmup")]
    pub warmup: usize,
    #[serde(default)]
    pub seed: u64,
    /// Extra-argument tokens, e.g. `["--fp16"]`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_warmup() -> usize {
    1
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, HarnessError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| HarnessError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, HarnessError> {
        toml::to_string_pretty(self)
            .map_err(|e| HarnessError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects zero sizes and counts.
    pub fn validate(&self) -> Result<(), HarnessError> {
        for (field, value) in [
            ("batch_size", self.batch_size),
            ("image_size", self.image_size),
            ("num_classes", self.num_classes),
            ("iterations", self.iterations),
        ] {
            if value == Some(0) {
                return Err(HarnessError::Config(format!("{field} must be positive")));
            }
        }
        Ok(())
    }

    /// Timed iterations, resolving the test-mode default.
    pub fn resolve_iterations(&self) -> usize {
        self.iterations.unwrap_or_else(|| self.test.default_iterations())
    }

    /// Construction options for the benchmark model.
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            test: self.test,
            device: self.device,
            jit: self.jit,
            batch_size: self.batch_size,
            image_size: self.image_size,
            num_classes: self.num_classes,
            seed: self.seed,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            model: "lenet5".to_string(),
            test: TestMode::Eval,
            device: Device::Cpu,
            jit: false,
            batch_size: None,
            image_size: None,
            num_classes: None,
            iterations: None,
            warmup: default_warmup(),
            seed: 0,
            extra_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = HarnessConfig::default();
        assert_eq!(c.model, "lenet5");
        assert_eq!(c.test, TestMode::Eval);
        assert_eq!(c.warmup, 1);
        assert_eq!(c.resolve_iterations(), 1);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
model = "alexnet"
test = "train"
device = "cuda"
batch_size = 8
extra_args = ["--fuser", "fuser2"]
"#;
        let c = HarnessConfig::from_toml(toml).unwrap();
        assert_eq!(c.model, "alexnet");
        assert_eq!(c.test, TestMode::Train);
        assert_eq!(c.device, Device::Cuda);
        assert_eq!(c.batch_size, Some(8));
        assert_eq!(c.warmup, 1);
        assert_eq!(c.resolve_iterations(), 3);
        assert_eq!(c.extra_args, ["--fuser", "fuser2"]);
    }

    #[test]
    fn test_minimal_toml() {
        let c = HarnessConfig::from_toml("model = \"vgg11\"").unwrap();
        assert_eq!(c.device, Device::Cpu);
        assert!(c.extra_args.is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(HarnessConfig::from_toml("model = \"lenet5\"\ndevice = \"tpu\"").is_err());
        assert!(HarnessConfig::from_toml("model = \"lenet5\"\nbatch_size = 0").is_err());
        assert!(HarnessConfig::from_toml("test = \"eval\"").is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = HarnessConfig {
            batch_size: Some(4),
            extra_args: vec!["--flops".into()],
            ..Default::default()
        };
        let back = HarnessConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(&path, "model = \"lenet5\"\nseed = 3\n").unwrap();
        assert_eq!(HarnessConfig::from_file(&path).unwrap().seed, 3);
        assert!(HarnessConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
