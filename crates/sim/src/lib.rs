// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod config;
pub mod memory;
pub mod metrics;
pub mod observer;
pub mod peripherals;
pub mod session;
pub mod snapshot;

pub use bus::SystemBus;
pub use config::SimulationConfig;
pub use observer::{Access, AccessKind, AccessKinds, AccessTrace, BusObserver};
pub use session::{RunSummary, Session, StopReason};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationError {
    #[error("Memory access violation at {addr:#010x}")]
    MemoryViolation { addr: u32 },
    #[error("Unaligned 32-bit access at {addr:#010x}")]
    Unaligned { addr: u32 },
    #[error("Write of {value:#010x} to {addr:#010x} while '{peripheral}' clock is disabled")]
    ClockDisabled {
        peripheral: String,
        addr: u32,
        value: u32,
    },
}

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PinState {
    /// Configured as a general purpose output.
    pub output: bool,
    /// Level driven by the output data register.
    pub level: bool,
}

/// A memory-mapped peripheral model with 32-bit registers.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u32) -> SimResult<u32>;
    fn write(&mut self, offset: u32, value: u32) -> SimResult<()>;

    /// Back to power-on values.
    fn reset(&mut self);

    /// Force a register value, bypassing write side effects.
    fn preset(&mut self, offset: u32, value: u32) -> SimResult<()> {
        self.write(offset, value)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Pin configuration, for models that have pins.
    fn pin_state(&self, _pin: u8) -> Option<PinState> {
        None
    }
}
