// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationError;
use bitflags::bitflags;
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

bitflags! {
    /// Which access kinds an [`AccessTrace`] keeps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessKinds: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}

impl AccessKinds {
    pub fn admits(self, kind: AccessKind) -> bool {
        match kind {
            AccessKind::Read => self.contains(Self::READ),
            AccessKind::Write => self.contains(Self::WRITE),
        }
    }
}

/// One 32-bit access as it reached the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Access {
    pub kind: AccessKind,
    pub address: u32,
    pub value: u32,
    /// Simulated cycle at which the access happened.
    pub cycle: u64,
}

impl Access {
    pub fn read(address: u32, value: u32) -> Self {
        Self {
            kind: AccessKind::Read,
            address,
            value,
            cycle: 0,
        }
    }

    pub fn write(address: u32, value: u32) -> Self {
        Self {
            kind: AccessKind::Write,
            address,
            value,
            cycle: 0,
        }
    }

    pub fn at_cycle(mut self, cycle: u64) -> Self {
        self.cycle = cycle;
        self
    }
}

/// Hooks called by [`crate::SystemBus`] on every access it serves.
///
/// `peripheral` is the id of the mapped window, or `None` for unmapped
/// addresses. Implementations use interior mutability; the bus only holds
/// shared references.
pub trait BusObserver: std::fmt::Debug + Send + Sync {
    fn on_access(&self, _peripheral: Option<&str>, _access: &Access) {}
    fn on_fault(&self, _fault: &SimulationError) {}
    fn on_delay(&self, _iterations: u64, _cycle: u64) {}
}

/// Ordered record of bus accesses.
#[derive(Debug)]
pub struct AccessTrace {
    filter: AccessKinds,
    accesses: Mutex<Vec<Access>>,
}

impl Default for AccessTrace {
    fn default() -> Self {
        Self::new(AccessKinds::all())
    }
}

impl AccessTrace {
    pub fn new(filter: AccessKinds) -> Self {
        Self {
            filter,
            accesses: Mutex::new(Vec::new()),
        }
    }

    pub fn writes_only() -> Self {
        Self::new(AccessKinds::WRITE)
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.accesses
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// `(address, value)` of every recorded write, in order.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.accesses()
            .into_iter()
            .filter(|a| a.kind == AccessKind::Write)
            .map(|a| (a.address, a.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accesses.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut a) = self.accesses.lock() {
            a.clear();
        }
    }
}

impl BusObserver for AccessTrace {
    fn on_access(&self, _peripheral: Option<&str>, access: &Access) {
        if !self.filter.admits(access.kind) {
            return;
        }
        if let Ok(mut a) = self.accesses.lock() {
            a.push(*access);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_filters_by_kind() {
        let trace = AccessTrace::writes_only();
        trace.on_access(Some("rcc"), &Access::read(0x4002_1018, 0));
        trace.on_access(Some("rcc"), &Access::write(0x4002_1018, 0x10).at_cycle(2));
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.writes(), vec![(0x4002_1018, 0x10)]);
        assert_eq!(trace.accesses()[0].cycle, 2);

        let all = AccessTrace::default();
        all.on_access(None, &Access::read(0x0, 0));
        all.on_access(None, &Access::write(0x0, 1));
        assert_eq!(all.len(), 2);
        all.clear();
        assert!(all.is_empty());
    }

    #[test]
    fn test_access_kinds() {
        assert!(AccessKinds::all().admits(AccessKind::Read));
        assert!(!AccessKinds::WRITE.admits(AccessKind::Read));
        assert!(!AccessKinds::empty().admits(AccessKind::Write));
    }

    #[test]
    fn test_access_serializes_flat() {
        let json = serde_json::to_value(Access::write(0x4001_100C, 0x2000)).unwrap();
        assert_eq!(json["kind"], "write");
        assert_eq!(json["address"], 0x4001_100C);
    }
}
