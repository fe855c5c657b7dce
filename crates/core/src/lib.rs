// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bare-metal heartbeat: enable a GPIO bank clock, configure one pin as an
//! output and toggle it forever with a busy-wait in between.
//!
//! The crate is `no_std`. Hardware is reached through [`RegisterBus`], so the
//! same control loop runs against real memory-mapped registers ([`Mmio`]) on
//! the target and against a simulated bus on the host.

#![cfg_attr(not(test), no_std)]

pub mod blink;
pub mod board;
pub mod delay;
pub mod register;

pub use blink::{BlinkState, Blinker};
pub use board::{BlinkTarget, ClockGate, OutputBit, PinModeField};
pub use delay::{delay, BusyWait, CpuNop, Nop};
pub use register::{Mmio, Register, RegisterBus};
