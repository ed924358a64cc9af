// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Extra-argument resolution and backend application.
//!
//! ```text
//! extra args ──parse_args──► OptionSet ──apply_args──► model with backends
//!                 │                          │
//!            validation                fuser → fp16 → fx2trt
//!        (no model mutation)              → torch_trt → flops
//! ```
//!
//! Resolution never touches the model; every incompatible combination is
//! rejected with [`HarnessError::Unsupported`] before the first backend is
//! applied.

use crate::{BenchmarkModel, Backends, HarnessError, ModelFamily, ModuleState, TestMode};
use clap::Parser;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tensor_core::{DType, Device};

/// Raw extra-argument flags.
#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct ExtraArgs {
    /// Enable FLOP counting.
    #[arg(long)]
    flops: bool,

    /// Lower the module with the fx2trt graph compiler.
    #[arg(long)]
    fx2trt: bool,

    /// Kernel fuser to enable process-wide; empty disables it.
    #[arg(long)]
    fuser: Option<String>,

    /// Lower the module with the torch_trt tensor compiler.
    #[arg(long = "torch_trt")]
    torch_trt: bool,

    /// Run the module in half precision.
    #[arg(long, conflicts_with = "no_fp16")]
    fp16: bool,

    #[arg(long = "no-fp16")]
    no_fp16: bool,

    /// Accepted for command-line compatibility; scripting is a property of
    /// the model and is read from it.
    #[arg(long, hide = true)]
    jit: bool,
}

/// Resolved options for one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSet {
    pub device: Device,
    pub jit: bool,
    pub test: TestMode,
    pub batch_size: usize,
    pub flops: bool,
    pub fx2trt: bool,
    pub fuser: Option<String>,
    pub torch_trt: bool,
    pub fp16: bool,
    pub cudagraph: bool,
}

/// Whether `model` may run in half precision: image classifiers in CUDA
/// inference only.
pub fn allow_fp16(model: &dyn BenchmarkModel) -> bool {
    model.family() == ModelFamily::ImageClassification
        && model.test() == TestMode::Eval
        && model.device() == Device::Cuda
}

impl OptionSet {
    /// Parses `extra_args` and fills in the model-owned fields, without
    /// validating the combination.
    pub fn from_args<S: AsRef<str>>(
        model: &dyn BenchmarkModel,
        extra_args: &[S],
    ) -> Result<Self, HarnessError> {
        let raw = ExtraArgs::try_parse_from(extra_args.iter().map(|s| -> &str { s.as_ref() }))
            .map_err(|e| HarnessError::InvalidArguments(e.to_string().trim_end().to_string()))?;

        if raw.jit {
            tracing::debug!("--jit ignored; scripting is taken from the model");
        }
        let fp16 = if raw.fp16 {
            true
        } else if raw.no_fp16 {
            false
        } else {
            allow_fp16(model)
        };

        Ok(Self {
            device: model.device(),
            jit: model.jit(),
            test: model.test(),
            batch_size: model.batch_size(),
            flops: raw.flops,
            fx2trt: raw.fx2trt,
            fuser: raw.fuser.filter(|f| !f.is_empty()),
            torch_trt: raw.torch_trt,
            fp16,
            cudagraph: false,
        })
    }

    /// Applies the model-dependent overrides and rejects unsupported
    /// combinations. Overrides made before a failure stay visible.
    pub fn validate(&mut self, model: &dyn BenchmarkModel) -> Result<(), HarnessError> {
        if self.device == Device::Cpu {
            if let Some(fuser) = self.fuser.take() {
                tracing::warn!(fuser = %fuser, "fusers are not available on cpu; ignoring");
            }
        }
        if self.fp16 && !allow_fp16(model) {
            return Err(HarnessError::unsupported(
                "fp16 is only implemented for image-classification inference on cuda",
            ));
        }
        if (self.fx2trt || self.torch_trt)
            && !(self.device == Device::Cuda && self.test == TestMode::Eval)
        {
            return Err(HarnessError::unsupported(
                "TensorRT backends only work for cuda inference",
            ));
        }
        if model.family() == ModelFamily::ImageClassification {
            self.cudagraph = false;
        } else if self.flops {
            self.flops = false;
            return Err(HarnessError::unsupported(
                "flop counting is only enabled for image-classification models",
            ));
        }
        Ok(())
    }

    /// Names of the backends these options enable, in application order.
    pub fn enabled_backends(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(fuser) = &self.fuser {
            names.push(format!("fuser={fuser}"));
        }
        for (enabled, name) in [
            (self.fp16, "fp16"),
            (self.fx2trt, "fx2trt"),
            (self.torch_trt, "torch_trt"),
            (self.flops, "flops"),
        ] {
            if enabled {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Parses and validates `extra_args` for `model`.
pub fn parse_args<S: AsRef<str>>(
    model: &dyn BenchmarkModel,
    extra_args: &[S],
) -> Result<OptionSet, HarnessError> {
    let mut options = OptionSet::from_args(model, extra_args)?;
    options.validate(model)?;
    tracing::debug!(?options, "resolved extra arguments");
    Ok(options)
}

/// Applies the backends `options` selects, in order: fuser, fp16, fx2trt,
/// torch_trt, flops. Each stage sees the module left by the previous one.
pub fn apply_args(
    model: &mut dyn BenchmarkModel,
    options: &OptionSet,
    backends: &dyn Backends,
) -> Result<(), HarnessError> {
    if let Some(fuser) = &options.fuser {
        backends.enable_fuser(fuser)?;
        tracing::info!(fuser = fuser.as_str(), "fuser enabled");
    }
    if options.fp16 {
        if !allow_fp16(model) {
            return Err(HarnessError::unsupported(
                "eval fp16 is only available on cuda for image-classification models",
            ));
        }
        let state = backends.enable_fp16(model.get_module())?;
        model.set_module_state(state);
        tracing::info!(model = model.name(), "fp16 enabled");
    }
    if options.fx2trt {
        if options.jit {
            return Err(HarnessError::unsupported(
                "not implemented: fx2trt cannot be combined with jit",
            ));
        }
        let ModuleState {
            module,
            example_inputs,
        } = model.get_module();
        let lowered =
            backends.enable_fx2trt(options.batch_size, options.fp16, &**module, example_inputs)?;
        model.set_module(lowered);
        tracing::info!(model = model.name(), "fx2trt enabled");
    }
    if options.torch_trt {
        let precision = if options.fp16 {
            Precision::Fp16
        } else {
            Precision::Fp32
        };
        let ModuleState {
            module,
            example_inputs,
        } = model.get_module();
        let lowered = backends.enable_torch_trt(precision, &**module, example_inputs)?;
        model.set_module(lowered);
        tracing::info!(model = model.name(), %precision, "torch_trt enabled");
    }
    if options.flops {
        backends.enable_flops(model)?;
        tracing::info!(model = model.name(), "flop counting enabled");
    }
    Ok(())
}

/// Numeric precision of a lowered engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Fp32,
    Fp16,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
        }
    }

    pub fn dtype(self) -> DType {
        match self {
            Precision::Fp32 => DType::F32,
            Precision::Fp16 => DType::F16,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fp32" => Ok(Precision::Fp32),
            "fp16" => Ok(Precision::Fp16),
            other => Err(HarnessError::unsupported(format!(
                "unknown precision '{other}'; expected 'fp16' or 'fp32'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_flags() {
        let raw = ExtraArgs::try_parse_from(["--flops", "--fuser", "fuser1", "--torch_trt"]).unwrap();
        assert!(raw.flops);
        assert!(raw.torch_trt);
        assert!(!raw.fx2trt);
        assert_eq!(raw.fuser.as_deref(), Some("fuser1"));
    }

    #[test]
    fn test_repeated_flags_last_wins() {
        let raw = ExtraArgs::try_parse_from([
            "--flops", "--flops", "--fp16", "--fp16", "--fuser", "te", "--fuser", "nvfuser",
        ])
        .unwrap();
        assert!(raw.flops && raw.fp16);
        assert_eq!(raw.fuser.as_deref(), Some("nvfuser"));
    }

    #[test]
    fn test_fp16_pair_is_exclusive() {
        assert!(ExtraArgs::try_parse_from(["--fp16", "--no-fp16"]).is_err());
        let raw = ExtraArgs::try_parse_from(["--no-fp16"]).unwrap();
        assert!(raw.no_fp16 && !raw.fp16);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(ExtraArgs::try_parse_from(["--bogus"]).is_err());
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("fp16".parse::<Precision>().unwrap(), Precision::Fp16);
        assert_eq!(Precision::Fp32.dtype(), DType::F32);
        assert!("bf16".parse::<Precision>().unwrap_err().is_unsupported());
    }
}
