// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The heartbeat control loop.
//!
//! `Uninitialized -> Configuring -> Blinking`. Configuration enables the
//! GPIO bank clock before touching the pin configuration register, because
//! writes to an unclocked peripheral are undefined on the hardware.

use crate::board::BlinkTarget;
use crate::delay::{BusyWait, CpuNop, Nop};
use crate::register::RegisterBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkState {
    Uninitialized,
    Configuring,
    Blinking,
}

pub struct Blinker<B, N = CpuNop> {
    bus: B,
    target: BlinkTarget,
    wait: BusyWait<N>,
    state: BlinkState,
}

impl<B: RegisterBus> Blinker<B> {
    pub fn new(bus: B, target: BlinkTarget) -> Self {
        Self::with_wait(bus, target, BusyWait::new())
    }
}

impl<B: RegisterBus, N: Nop> Blinker<B, N> {
    pub fn with_wait(bus: B, target: BlinkTarget, wait: BusyWait<N>) -> Self {
        Self {
            bus,
            target,
            wait,
            state: BlinkState::Uninitialized,
        }
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn target(&self) -> &BlinkTarget {
        &self.target
    }

    /// One-time configuration. Does nothing once the board is configured.
    pub fn configure(&mut self) {
        if self.state != BlinkState::Uninitialized {
            return;
        }
        self.state = BlinkState::Configuring;

        let BlinkTarget { clock, mode, .. } = self.target;

        #[cfg(feature = "tracing")]
        tracing::debug!(register = %clock.register, mask = clock.mask, "Enabling GPIO bank clock");
        self.bus.set_bits(clock.register, clock.mask);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            register = %mode.register,
            offset = mode.offset,
            width = mode.width,
            mode = mode.mode,
            "Configuring pin mode field"
        );
        self.bus.clear_bits(mode.register, mode.mask());
        self.bus.set_bits(mode.register, mode.bits());

        self.state = BlinkState::Blinking;
    }

    /// Flip the LED output bit, configuring first if that has not happened.
    pub fn toggle(&mut self) {
        if self.state != BlinkState::Blinking {
            self.configure();
        }
        let output = self.target.output;
        self.bus.toggle_bits(output.register, output.mask());

        #[cfg(feature = "tracing")]
        tracing::trace!(register = %output.register, pin = output.pin, "Toggled LED");
    }

    /// One Blinking iteration: toggle, then busy-wait.
    pub fn step(&mut self) {
        self.toggle();
        self.wait.delay(self.target.delay_count);
    }

    pub fn run(mut self) -> ! {
        self.configure();
        loop {
            self.step();
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn wait(&self) -> &BusyWait<N> {
        &self.wait
    }

    pub fn into_parts(self) -> (B, BusyWait<N>) {
        (self.bus, self.wait)
    }
}

/// Configure `target` and blink it forever.
pub fn run<B: RegisterBus>(bus: B, target: BlinkTarget) -> ! {
    Blinker::new(bus, target).run()
}
