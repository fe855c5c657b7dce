// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::BoardProfile;
use anyhow::{Context, Result};

const PROFILES: &[(&str, &str)] = &[
    (
        "bluepill",
        include_str!("../../../configs/boards/bluepill.yaml"),
    ),
    (
        "nucleo-f103rb",
        include_str!("../../../configs/boards/nucleo-f103rb.yaml"),
    ),
    (
        "nucleo-f401re",
        include_str!("../../../configs/boards/nucleo-f401re.yaml"),
    ),
    (
        "nucleo-l476rg",
        include_str!("../../../configs/boards/nucleo-l476rg.yaml"),
    ),
    (
        "nucleo-h563zi",
        include_str!("../../../configs/boards/nucleo-h563zi.yaml"),
    ),
];

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    PROFILES.iter().map(|(name, _)| *name)
}

/// The embedded profile called `name`, if there is one.
pub fn builtin(name: &str) -> Result<Option<BoardProfile>> {
    let Some((_, yaml)) = PROFILES.iter().find(|(n, _)| *n == name) else {
        return Ok(None);
    };
    BoardProfile::from_yaml(yaml)
        .with_context(|| format!("Built-in board profile '{}' is invalid", name))
        .map(Some)
}
