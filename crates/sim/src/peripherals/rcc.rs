// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RccRegisterLayout {
    #[default]
    Stm32F1,
    Stm32F4,
    Stm32L4,
    Stm32H5,
}

impl FromStr for RccRegisterLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "stm32f1" | "f1" | "legacy" => Ok(Self::Stm32F1),
            "stm32f4" | "f4" => Ok(Self::Stm32F4),
            "stm32l4" | "l4" => Ok(Self::Stm32L4),
            "stm32h5" | "h5" => Ok(Self::Stm32H5),
            _ => Err(format!(
                "unsupported RCC register layout '{}'; supported: stm32f1, stm32f4, stm32l4, stm32h5",
                value
            )),
        }
    }
}

impl RccRegisterLayout {
    /// Offsets of the peripheral clock-enable registers this layout models.
    pub fn enable_offsets(self) -> &'static [u32] {
        match self {
            // APB2ENR, APB1ENR
            Self::Stm32F1 => &[0x18, 0x1C],
            // AHB1ENR, AHB2ENR, APB1ENR, APB2ENR
            Self::Stm32F4 => &[0x30, 0x34, 0x40, 0x44],
            // AHB1ENR, AHB2ENR, APB1ENR1, APB2ENR
            Self::Stm32L4 => &[0x48, 0x4C, 0x58, 0x60],
            // AHB1ENR, AHB2ENR, APB1LENR, APB2ENR
            Self::Stm32H5 => &[0x88, 0x8C, 0x9C, 0xA4],
        }
    }
}

/// Minimal RCC (Reset and Clock Control) peripheral: only the clock-enable
/// registers are backed, everything else reads as zero.
#[derive(Debug, Default, serde::Serialize)]
pub struct Rcc {
    layout: RccRegisterLayout,
    enable: Vec<(u32, u32)>,
}

impl Rcc {
    pub fn new() -> Self {
        Self::new_with_layout(RccRegisterLayout::Stm32F1)
    }

    pub fn new_with_layout(layout: RccRegisterLayout) -> Self {
        Self {
            layout,
            enable: layout.enable_offsets().iter().map(|&off| (off, 0)).collect(),
        }
    }

    pub fn layout(&self) -> RccRegisterLayout {
        self.layout
    }

    fn slot(&self, offset: u32) -> Option<usize> {
        self.enable.iter().position(|(off, _)| *off == offset)
    }

    fn read_reg(&self, offset: u32) -> u32 {
        self.slot(offset).map(|i| self.enable[i].1).unwrap_or(0)
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        if let Some(i) = self.slot(offset) {
            self.enable[i].1 = value;
        }
    }
}

impl crate::Peripheral for Rcc {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        self.write_reg(offset, value);
        Ok(())
    }

    fn reset(&mut self) {
        for (_, value) in &mut self.enable {
            *value = 0;
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::{Rcc, RccRegisterLayout};
    use crate::Peripheral;

    #[test]
    fn test_rcc_f1_offsets() {
        let mut rcc = Rcc::new_with_layout(RccRegisterLayout::Stm32F1);
        rcc.write(0x18, 0x14).unwrap();
        rcc.write(0x1C, 0x55).unwrap();
        assert_eq!(rcc.read(0x18).unwrap(), 0x14);
        assert_eq!(rcc.read(0x1C).unwrap(), 0x55);
    }

    #[test]
    fn test_rcc_per_family_enable_register() {
        for (layout, offset) in [
            (RccRegisterLayout::Stm32F4, 0x30),
            (RccRegisterLayout::Stm32L4, 0x4C),
            (RccRegisterLayout::Stm32H5, 0x8C),
        ] {
            let mut rcc = Rcc::new_with_layout(layout);
            assert_eq!(rcc.read(offset).unwrap(), 0);
            rcc.write(offset, 0x1).unwrap();
            assert_eq!(rcc.read(offset).unwrap(), 0x1, "{:?}", layout);
            // F1's APB2ENR offset is not a register on the newer parts.
            rcc.write(0x18, 0xFF).unwrap();
            assert_eq!(rcc.read(0x18).unwrap(), 0);
        }
    }

    #[test]
    fn test_rcc_reset_clears_enables() {
        let mut rcc = Rcc::new();
        rcc.write(0x18, 0x10).unwrap();
        rcc.reset();
        assert_eq!(rcc.read(0x18).unwrap(), 0);
        assert_eq!(rcc.layout(), RccRegisterLayout::Stm32F1);
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!(
            "STM32L4".parse::<RccRegisterLayout>(),
            Ok(RccRegisterLayout::Stm32L4)
        );
        assert!("stm32v2".parse::<RccRegisterLayout>().is_err());
    }
}
