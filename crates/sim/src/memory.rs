// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};

/// A flat block of 32-bit words with no side effects, for peripherals the
/// simulator does not model and for tests that want plain storage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RegisterFile {
    words: Vec<u32>,
}

impl RegisterFile {
    /// `size` is in bytes and rounded down to whole words.
    pub fn new(size: u64) -> Self {
        Self {
            words: vec![0; (size / 4) as usize],
        }
    }

    pub fn size(&self) -> u64 {
        self.words.len() as u64 * 4
    }

    pub fn read_word(&self, offset: u32) -> Option<u32> {
        self.words.get((offset / 4) as usize).copied()
    }

    pub fn write_word(&mut self, offset: u32, value: u32) -> bool {
        match self.words.get_mut((offset / 4) as usize) {
            Some(word) => {
                *word = value;
                true
            }
            None => false,
        }
    }
}

impl crate::Peripheral for RegisterFile {
    fn read(&self, offset: u32) -> SimResult<u32> {
        self.read_word(offset)
            .ok_or(SimulationError::MemoryViolation { addr: offset })
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        if self.write_word(offset, value) {
            Ok(())
        } else {
            Err(SimulationError::MemoryViolation { addr: offset })
        }
    }

    fn reset(&mut self) {
        self.words.fill(0);
    }

    fn snapshot(&self) -> serde_json::Value {
        // Only the words that hold something; a 1 KiB window is mostly zeros.
        let used: serde_json::Map<String, serde_json::Value> = self
            .words
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != 0)
            .map(|(i, w)| (format!("{:#05x}", i * 4), serde_json::Value::from(*w)))
            .collect();
        serde_json::Value::Object(used)
    }
}
