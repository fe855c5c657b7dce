// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bounded runs of the heartbeat control loop against a [`SystemBus`].

use crate::bus::SystemBus;
use crate::config::SimulationConfig;
use crate::observer::BusObserver;
use crate::{PinState, SimulationError};
use heartbeat_config::BoardProfile;
use heartbeat_core::{BlinkState, BlinkTarget, Blinker, BusyWait, Nop};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Busy-wait no-op that advances the simulated clock.
#[derive(Debug, Clone)]
pub struct CycleCounter {
    clock: Arc<AtomicU64>,
    nop_cycles: u64,
    iterations: u64,
}

impl CycleCounter {
    pub fn new(clock: Arc<AtomicU64>, nop_cycles: u32) -> Self {
        Self {
            clock,
            nop_cycles: nop_cycles as u64,
            iterations: 0,
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

impl Nop for CycleCounter {
    fn nop(&mut self) {
        self.iterations += 1;
        self.clock.fetch_add(self.nop_cycles, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToggleLimit,
    Fault,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub board: String,
    pub toggles: u64,
    pub delay_iterations: u64,
    pub cycles: u64,
    /// Output bit level before configuration.
    pub initial_level: bool,
    /// Output bit level after each toggle.
    pub levels: Vec<bool>,
    pub faults: Vec<SimulationError>,
    pub stop_reason: StopReason,
    /// Final LED pin configuration; absent when the output register is
    /// plain memory.
    pub led_pin: Option<PinState>,
}

impl RunSummary {
    /// The LED changed level at least once, the bus saw no faults and the
    /// pin (when modelled) ended up as an output.
    pub fn passed(&self) -> bool {
        self.faults.is_empty()
            && self.levels.iter().any(|&l| l != self.initial_level)
            && self.led_pin.map_or(true, |pin| pin.output)
    }
}

pub struct Session {
    blinker: Blinker<SystemBus, CycleCounter>,
    config: SimulationConfig,
    initial_level: bool,
    levels: Vec<bool>,
}

impl Session {
    pub fn new(profile: &BoardProfile, config: SimulationConfig) -> anyhow::Result<Self> {
        let bus = SystemBus::from_profile(profile)?;
        Ok(Self::with_bus(bus, profile.blink_target(), config))
    }

    pub fn with_bus(mut bus: SystemBus, target: BlinkTarget, config: SimulationConfig) -> Self {
        bus.set_clock_gating(config.clock_gating);
        let mut target = target;
        target.delay_count = config.delay_for(target.delay_count);

        let counter = CycleCounter::new(bus.clock(), config.nop_cycles);
        let blinker = Blinker::with_wait(bus, target, BusyWait::with_nop(counter));
        let mut session = Self {
            blinker,
            config,
            initial_level: false,
            levels: Vec::new(),
        };
        session.initial_level = session.led_level();
        session
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BusObserver>) {
        self.blinker.bus_mut().add_observer(observer);
    }

    pub fn bus(&self) -> &SystemBus {
        self.blinker.bus()
    }

    pub fn state(&self) -> BlinkState {
        self.blinker.state()
    }

    pub fn target(&self) -> &BlinkTarget {
        self.blinker.target()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current level of the LED output bit, without a bus access.
    pub fn led_level(&self) -> bool {
        let output = self.blinker.target().output;
        self.bus()
            .peek(output.register.addr())
            .is_some_and(|v| v & output.mask() != 0)
    }

    pub fn led_pin(&self) -> Option<PinState> {
        let output = self.blinker.target().output;
        self.bus().pin_state(output.register.addr(), output.pin)
    }

    pub fn configure(&mut self) {
        if self.state() == BlinkState::Uninitialized {
            tracing::info!(board = %self.bus().board(), "Configuring LED pin");
        }
        self.blinker.configure();
    }

    /// One loop iteration: toggle, busy-wait. Returns the new LED level.
    pub fn step(&mut self) -> bool {
        let before = self.blinker.wait().nop().iterations();
        self.blinker.step();
        let iterations = self.blinker.wait().nop().iterations() - before;
        self.blinker.bus().notify_delay(iterations);

        let level = self.led_level();
        self.levels.push(level);
        tracing::info!(
            toggle = self.levels.len(),
            cycle = self.bus().cycle(),
            "LED output {}",
            if level { "high" } else { "low" }
        );
        level
    }

    /// Configure, then toggle up to `toggles` times.
    pub fn run(&mut self, toggles: u64) -> RunSummary {
        self.configure();
        let mut stop_reason = StopReason::ToggleLimit;
        if self.config.stop_on_fault && self.bus().fault_count() > 0 {
            return self.summary(StopReason::Fault);
        }
        for _ in 0..toggles {
            self.step();
            if self.config.stop_on_fault && self.bus().fault_count() > 0 {
                stop_reason = StopReason::Fault;
                break;
            }
        }
        self.summary(stop_reason)
    }

    pub fn summary(&self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            board: self.bus().board().to_string(),
            toggles: self.levels.len() as u64,
            delay_iterations: self.blinker.wait().nop().iterations(),
            cycles: self.bus().cycle(),
            initial_level: self.initial_level,
            levels: self.levels.clone(),
            faults: self.bus().faults(),
            stop_reason,
            led_pin: self.led_pin(),
        }
    }
}
