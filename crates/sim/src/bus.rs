// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::RegisterFile;
use crate::observer::{Access, BusObserver};
use crate::snapshot::{BusSnapshot, PeripheralSnapshot};
use crate::{Peripheral, PinState, SimResult, SimulationError};
use anyhow::Context;
use heartbeat_config::BoardProfile;
use heartbeat_core::{ClockGate, Register, RegisterBus};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct PeripheralEntry {
    pub name: String,
    pub base: u32,
    pub size: u64,
    pub clock_gate: Option<ClockGate>,
    /// Offset -> value applied on top of the model's own reset state.
    pub reset_values: BTreeMap<u32, u32>,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    pub fn new(name: impl Into<String>, base: u32, size: u64, dev: Box<dyn Peripheral>) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            clock_gate: None,
            reset_values: BTreeMap::new(),
            dev,
        }
    }

    pub fn gated_by(mut self, gate: ClockGate) -> Self {
        self.clock_gate = Some(gate);
        self
    }

    pub fn contains(&self, addr: u32) -> bool {
        let addr = addr as u64;
        let base = self.base as u64;
        addr >= base && addr < base + self.size
    }

    fn apply_reset_values(&mut self) -> SimResult<()> {
        for (&offset, &value) in &self.reset_values {
            self.dev.preset(offset, value)?;
        }
        Ok(())
    }
}

/// The simulated address space the control loop runs against.
///
/// Accesses never fail from the caller's point of view, as on the real part:
/// an unmapped or unaligned read returns 0 and a faulting write is dropped.
/// Each such access is recorded as a [`SimulationError`] in [`Self::faults`].
pub struct SystemBus {
    board: String,
    pub peripherals: Vec<PeripheralEntry>,
    clock_gating: bool,
    cycle: Arc<AtomicU64>,
    observers: Vec<Arc<dyn BusObserver>>,
    faults: Mutex<Vec<SimulationError>>,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    pub fn new() -> Self {
        Self {
            board: String::new(),
            peripherals: Vec::new(),
            clock_gating: true,
            cycle: Arc::new(AtomicU64::new(0)),
            observers: Vec::new(),
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn from_profile(profile: &BoardProfile) -> anyhow::Result<Self> {
        profile.validate()?;
        let mut bus = Self::new();
        bus.board = profile.name.clone();

        for p_cfg in &profile.peripherals {
            let size = p_cfg.window_size()?;
            let dev = crate::peripherals::build(&p_cfg.r#type, p_cfg.layout.as_deref(), size)
                .with_context(|| format!("Failed to build peripheral '{}'", p_cfg.id))?;

            let mut entry = PeripheralEntry::new(p_cfg.id.clone(), p_cfg.base_address, size, dev);
            entry.clock_gate = p_cfg
                .clock_gate
                .map(|g| ClockGate::bit(Register::at(g.register), g.bit));
            entry.reset_values = p_cfg.reset_values.clone();
            entry
                .apply_reset_values()
                .with_context(|| format!("Invalid reset value for peripheral '{}'", p_cfg.id))?;

            tracing::debug!(
                id = %p_cfg.id,
                kind = %p_cfg.r#type,
                base = %Register::at(p_cfg.base_address),
                size,
                gated = entry.clock_gate.is_some(),
                "Mapped peripheral"
            );
            bus.map(entry);
        }

        if bus.peripherals.is_empty() {
            tracing::info!(
                "Profile '{}' declares no peripherals; backing its LED registers with plain memory",
                profile.name
            );
            let target = profile.blink_target();
            let registers: BTreeSet<u32> = [
                target.clock.register.addr(),
                target.mode.register.addr(),
                target.output.register.addr(),
            ]
            .into_iter()
            .collect();
            for addr in registers {
                bus.map(PeripheralEntry::new(
                    format!("reg@{:#010x}", addr),
                    addr,
                    4,
                    Box::new(RegisterFile::new(4)),
                ));
            }
        }

        Ok(bus)
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn map(&mut self, entry: PeripheralEntry) {
        self.peripherals.push(entry);
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BusObserver>) {
        self.observers.push(observer);
    }

    pub fn set_clock_gating(&mut self, enabled: bool) {
        self.clock_gating = enabled;
    }

    pub fn clock_gating(&self) -> bool {
        self.clock_gating
    }

    /// Shared cycle counter. Every bus access costs one cycle; whoever holds
    /// a handle may charge more (busy-wait iterations).
    pub fn clock(&self) -> Arc<AtomicU64> {
        self.cycle.clone()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle.load(Ordering::SeqCst)
    }

    pub fn faults(&self) -> Vec<SimulationError> {
        self.faults.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn fault_count(&self) -> usize {
        self.faults.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn clear_faults(&self) {
        if let Ok(mut f) = self.faults.lock() {
            f.clear();
        }
    }

    /// Mode and level of `pin` on the port that owns `addr`, when that
    /// peripheral models pins.
    pub fn pin_state(&self, addr: u32, pin: u8) -> Option<PinState> {
        let idx = self.index_of(addr)?;
        self.peripherals[idx].dev.pin_state(pin)
    }

    fn index_of(&self, addr: u32) -> Option<usize> {
        self.peripherals.iter().position(|p| p.contains(addr))
    }

    /// Read a register without charging a cycle or notifying observers.
    pub fn peek(&self, addr: u32) -> Option<u32> {
        let p = &self.peripherals[self.index_of(addr)?];
        p.dev.read(addr - p.base).ok()
    }

    fn gate_open(&self, gate: &ClockGate) -> bool {
        self.peek(gate.register.addr())
            .is_some_and(|v| v & gate.mask == gate.mask)
    }

    pub fn read_word(&self, addr: u32) -> SimResult<u32> {
        if addr % 4 != 0 {
            return Err(SimulationError::Unaligned { addr });
        }
        let idx = self
            .index_of(addr)
            .ok_or(SimulationError::MemoryViolation { addr })?;
        let p = &self.peripherals[idx];
        p.dev
            .read(addr - p.base)
            .map_err(|_| SimulationError::MemoryViolation { addr })
    }

    pub fn write_word(&mut self, addr: u32, value: u32) -> SimResult<()> {
        if addr % 4 != 0 {
            return Err(SimulationError::Unaligned { addr });
        }
        let idx = self
            .index_of(addr)
            .ok_or(SimulationError::MemoryViolation { addr })?;

        if self.clock_gating {
            if let Some(gate) = &self.peripherals[idx].clock_gate {
                if !self.gate_open(gate) {
                    return Err(SimulationError::ClockDisabled {
                        peripheral: self.peripherals[idx].name.clone(),
                        addr,
                        value,
                    });
                }
            }
        }

        let p = &mut self.peripherals[idx];
        p.dev
            .write(addr - p.base, value)
            .map_err(|_| SimulationError::MemoryViolation { addr })
    }

    fn tick(&self) -> u64 {
        self.cycle.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify_access(&self, access: Access) {
        let name = self
            .index_of(access.address)
            .map(|i| self.peripherals[i].name.as_str());
        for observer in &self.observers {
            observer.on_access(name, &access);
        }
    }

    fn record_fault(&self, fault: SimulationError) {
        tracing::warn!("{}", fault);
        for observer in &self.observers {
            observer.on_fault(&fault);
        }
        if let Ok(mut f) = self.faults.lock() {
            f.push(fault);
        }
    }

    /// Report a completed busy-wait to observers.
    pub fn notify_delay(&self, iterations: u64) {
        let cycle = self.cycle();
        for observer in &self.observers {
            observer.on_delay(iterations, cycle);
        }
    }

    /// Power-on reset: models, profile reset values, faults and the cycle
    /// counter.
    pub fn reset(&mut self) -> SimResult<()> {
        for p in &mut self.peripherals {
            p.dev.reset();
            p.apply_reset_values()?;
        }
        self.clear_faults();
        self.cycle.store(0, Ordering::SeqCst);
        Ok(())
    }

    pub fn snapshot(&self) -> BusSnapshot {
        let peripherals = self
            .peripherals
            .iter()
            .map(|p| {
                let clock_enabled = p.clock_gate.as_ref().map_or(true, |g| self.gate_open(g));
                (
                    p.name.clone(),
                    PeripheralSnapshot {
                        base_address: p.base,
                        size: p.size,
                        clock_enabled,
                        registers: p.dev.snapshot(),
                    },
                )
            })
            .collect();
        BusSnapshot {
            board: self.board.clone(),
            cycle: self.cycle(),
            peripherals,
            faults: self.faults(),
        }
    }
}

impl RegisterBus for SystemBus {
    fn read(&self, reg: Register) -> u32 {
        let cycle = self.tick();
        let (value, fault) = match self.read_word(reg.addr()) {
            Ok(v) => (v, None),
            Err(e) => (0, Some(e)),
        };
        self.notify_access(Access::read(reg.addr(), value).at_cycle(cycle));
        if let Some(fault) = fault {
            self.record_fault(fault);
        }
        value
    }

    fn write(&mut self, reg: Register, value: u32) {
        let cycle = self.tick();
        let result = self.write_word(reg.addr(), value);
        self.notify_access(Access::write(reg.addr(), value).at_cycle(cycle));
        if let Err(fault) = result {
            self.record_fault(fault);
        }
    }
}
