// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationError;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Debug, Clone)]
pub struct BusSnapshot {
    pub board: String,
    pub cycle: u64,
    pub peripherals: BTreeMap<String, PeripheralSnapshot>,
    pub faults: Vec<SimulationError>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PeripheralSnapshot {
    pub base_address: u32,
    pub size: u64,
    pub clock_enabled: bool,
    pub registers: serde_json::Value,
}
