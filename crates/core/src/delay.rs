// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Software busy-wait timed by iteration count.
//!
//! Duration per iteration depends on the core clock and is not calibrated;
//! only "`count` iterations, each executing one no-op" is guaranteed.

/// The per-iteration work of a busy-wait. Must not be optimized away.
pub trait Nop {
    fn nop(&mut self);
}

/// Emits a real no-op instruction.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuNop;

impl Nop for CpuNop {
    #[inline(always)]
    fn nop(&mut self) {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::nop();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}

/// Counts a delay down to zero, one [`Nop`] per iteration.
#[derive(Debug, Default)]
pub struct BusyWait<N = CpuNop> {
    nop: N,
}

impl BusyWait {
    pub const fn new() -> Self {
        Self { nop: CpuNop }
    }
}

impl<N: Nop> BusyWait<N> {
    pub fn with_nop(nop: N) -> Self {
        Self { nop }
    }

    pub fn delay(&mut self, count: u32) {
        let mut remaining = count;
        while remaining > 0 {
            self.nop.nop();
            remaining -= 1;
        }
    }

    pub fn nop(&self) -> &N {
        &self.nop
    }

    pub fn into_inner(self) -> N {
        self.nop
    }
}

/// Spin for `count` no-op iterations. `delay(0)` returns immediately.
#[inline]
pub fn delay(count: u32) {
    BusyWait::new().delay(count)
}
