// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::observer::{Access, AccessKind, BusObserver};
use crate::SimulationError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessCounts {
    pub reads: u64,
    pub writes: u64,
}

#[derive(Debug, Default)]
pub struct BusMetrics {
    read_count: AtomicU64,
    write_count: AtomicU64,
    fault_count: AtomicU64,
    delay_iterations: AtomicU64,
    by_peripheral: Mutex<BTreeMap<String, AccessCounts>>,
}

impl BusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.read_count.store(0, Ordering::SeqCst);
        self.write_count.store(0, Ordering::SeqCst);
        self.fault_count.store(0, Ordering::SeqCst);
        self.delay_iterations.store(0, Ordering::SeqCst);
        if let Ok(mut m) = self.by_peripheral.lock() {
            m.clear();
        }
    }

    pub fn get_reads(&self) -> u64 {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn get_writes(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn get_faults(&self) -> u64 {
        self.fault_count.load(Ordering::SeqCst)
    }

    pub fn get_delay_iterations(&self) -> u64 {
        self.delay_iterations.load(Ordering::SeqCst)
    }

    pub fn get_peripheral_counts(&self, name: &str) -> AccessCounts {
        self.by_peripheral
            .lock()
            .ok()
            .and_then(|m| m.get(name).copied())
            .unwrap_or_default()
    }

    /// Per-peripheral counts keyed by window id.
    pub fn peripheral_counts(&self) -> BTreeMap<String, AccessCounts> {
        self.by_peripheral
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl BusObserver for BusMetrics {
    fn on_access(&self, peripheral: Option<&str>, access: &Access) {
        match access.kind {
            AccessKind::Read => self.read_count.fetch_add(1, Ordering::SeqCst),
            AccessKind::Write => self.write_count.fetch_add(1, Ordering::SeqCst),
        };
        let Some(name) = peripheral else {
            return;
        };
        if let Ok(mut m) = self.by_peripheral.lock() {
            let counts = m.entry(name.to_string()).or_default();
            match access.kind {
                AccessKind::Read => counts.reads += 1,
                AccessKind::Write => counts.writes += 1,
            }
        }
    }

    fn on_fault(&self, _fault: &SimulationError) {
        self.fault_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_delay(&self, iterations: u64, _cycle: u64) {
        self.delay_iterations.fetch_add(iterations, Ordering::SeqCst);
    }
}
