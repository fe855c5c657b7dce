// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt;

/// A 32-bit memory-mapped peripheral register at a fixed physical address.
///
/// The value is deliberately not stored here: a register's contents belong to
/// the hardware and are only observed through a [`RegisterBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register {
    addr: u32,
}

impl Register {
    pub const fn at(addr: u32) -> Self {
        Self { addr }
    }

    /// Register at `offset` bytes from a peripheral base address.
    pub const fn offset(base: u32, offset: u32) -> Self {
        Self { addr: base + offset }
    }

    pub const fn addr(self) -> u32 {
        self.addr
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.addr)
    }
}

/// Addressable access to 32-bit peripheral registers.
///
/// Every call is one observable hardware access: implementations must not
/// cache, merge, drop or reorder accesses. The read-modify-write helpers are
/// exactly one `read` followed by one `write` and are not atomic; callers own
/// the registers exclusively.
pub trait RegisterBus {
    fn read(&self, reg: Register) -> u32;
    fn write(&mut self, reg: Register, value: u32);

    /// `write(reg, read(reg) | mask)`
    fn set_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value | mask);
    }

    /// `write(reg, read(reg) & !mask)`
    fn clear_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value & !mask);
    }

    /// `write(reg, read(reg) ^ mask)`
    fn toggle_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value ^ mask);
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }
}

/// Volatile access to the physical address space of the running part.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every [`Register`] passed to the returned bus must be a mapped, 32-bit
    /// aligned peripheral register of the running chip, and nothing else
    /// (another `Mmio`, an interrupt handler) may access those registers while
    /// this bus is alive.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline(always)]
    fn read(&self, reg: Register) -> u32 {
        // Sound by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(reg.addr() as usize as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, reg: Register, value: u32) {
        unsafe { core::ptr::write_volatile(reg.addr() as usize as *mut u32, value) }
    }
}
