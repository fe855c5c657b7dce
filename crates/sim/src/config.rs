// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

fn default_nop_cycles() -> u32 {
    1
}

fn default_clock_gating() -> bool {
    true
}

/// Knobs for a simulated run that are not part of the board itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Cycles charged for each busy-wait iteration.
    #[serde(default = "default_nop_cycles")]
    pub nop_cycles: u32,
    /// Replaces the board's delay count; host runs rarely want 500k spins.
    #[serde(default)]
    pub delay_override: Option<u32>,
    /// Drop writes to peripherals whose clock-enable bit is clear.
    #[serde(default = "default_clock_gating")]
    pub clock_gating: bool,
    /// End the run at the first toggle that recorded a bus fault.
    #[serde(default)]
    pub stop_on_fault: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nop_cycles: default_nop_cycles(),
            delay_override: None,
            clock_gating: default_clock_gating(),
            stop_on_fault: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_delay(mut self, delay: u32) -> Self {
        self.delay_override = Some(delay);
        self
    }

    pub fn without_clock_gating(mut self) -> Self {
        self.clock_gating = false;
        self
    }

    pub fn stopping_on_fault(mut self) -> Self {
        self.stop_on_fault = true;
        self
    }

    pub fn delay_for(&self, board_delay: u32) -> u32 {
        self.delay_override.unwrap_or(board_delay)
    }
}
