// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide kernel-fusion selection.
//!
//! Scripted modules consult the active fuser on every forward pass; eager
//! classifiers ignore it.

use crate::NnError;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// Available fusion strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fuser {
    /// `fuser0`: the legacy fuser.
    Legacy,
    /// `fuser1`: the tensor-expression fuser.
    TensorExpr,
    /// `fuser2`: nvFuser.
    NvFuser,
}

impl Fuser {
    /// Canonical `fuserN` identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Fuser::Legacy => "fuser0",
            Fuser::TensorExpr => "fuser1",
            Fuser::NvFuser => "fuser2",
        }
    }
}

impl fmt::Display for Fuser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fuser {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fuser0" | "legacy" | "old" => Ok(Fuser::Legacy),
            "fuser1" | "te" | "nnc" => Ok(Fuser::TensorExpr),
            "fuser2" | "nvfuser" => Ok(Fuser::NvFuser),
            _ => Err(NnError::UnknownFuser(s.to_string())),
        }
    }
}

static ACTIVE_FUSER: RwLock<Option<Fuser>> = RwLock::new(None);

/// Installs `fuser` for the whole process and returns the previous one.
pub fn set_active_fuser(fuser: Option<Fuser>) -> Option<Fuser> {
    let mut guard = ACTIVE_FUSER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let previous = std::mem::replace(&mut *guard, fuser);
    if previous != fuser {
        tracing::debug!(?previous, current = ?fuser, "fuser changed");
    }
    previous
}

/// The fuser currently in effect, if any.
pub fn active_fuser() -> Option<Fuser> {
    *ACTIVE_FUSER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
