// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fuser selection.

use crate::HarnessError;
use vision_nn::fuser::{set_active_fuser, Fuser};

/// Parses `name` and installs it as the process-wide fuser.
pub fn enable_fuser(name: &str) -> Result<(), HarnessError> {
    let fuser: Fuser = name
        .parse()
        .map_err(|e: vision_nn::NnError| HarnessError::Unsupported(e.to_string()))?;
    if let Some(previous) = set_active_fuser(Some(fuser)) {
        if previous != fuser {
            tracing::warn!(%previous, current = %fuser, "replacing active fuser");
        }
    }
    Ok(())
}
