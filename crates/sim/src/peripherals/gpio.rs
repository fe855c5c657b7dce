// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{PinState, SimResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GpioRegisterLayout {
    #[default]
    Stm32F1,
    Stm32V2,
}

impl FromStr for GpioRegisterLayout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "stm32f1" | "f1" | "legacy" => Ok(Self::Stm32F1),
            "stm32v2" | "v2" | "modern" | "stm32f4" | "stm32l4" | "stm32h5" => Ok(Self::Stm32V2),
            _ => Err(format!(
                "unsupported GPIO register layout '{}'; supported: stm32f1, stm32v2",
                value
            )),
        }
    }
}

/// STM32 GPIO port with selectable register layout (STM32F1 CRL/CRH or
/// STM32v2 MODER-style).
#[derive(Debug, Default, serde::Serialize)]
pub struct GpioPort {
    layout: GpioRegisterLayout,
    crl: u32,     // 0x00: configuration register low
    crh: u32,     // 0x04: configuration register high
    moder: u32,   // 0x00: mode register (STM32v2)
    otyper: u32,  // 0x04: output type register (STM32v2)
    ospeedr: u32, // 0x08: output speed register (STM32v2)
    pupdr: u32,   // 0x0C: pull-up/pull-down register (STM32v2)
    idr: u32,     // input data register
    odr: u32,     // output data register
    lckr: u32,    // configuration lock register
    afrl: u32,    // 0x20: alternate function low register (STM32v2)
    afrh: u32,    // 0x24: alternate function high register (STM32v2)
}

impl GpioPort {
    pub fn new() -> Self {
        Self::new_with_layout(GpioRegisterLayout::Stm32F1)
    }

    pub fn new_with_layout(layout: GpioRegisterLayout) -> Self {
        let mut port = Self {
            layout,
            ..Default::default()
        };
        port.apply_reset_values();
        port
    }

    fn apply_reset_values(&mut self) {
        let layout = self.layout;
        *self = Self {
            layout,
            ..Default::default()
        };
        if matches!(layout, GpioRegisterLayout::Stm32F1) {
            // Reset value: floating input
            self.crl = 0x4444_4444;
            self.crh = 0x4444_4444;
        }
    }

    pub fn layout(&self) -> GpioRegisterLayout {
        self.layout
    }

    pub fn odr(&self) -> u32 {
        self.odr
    }

    /// Output level of `pin` as driven by ODR.
    pub fn pin_level(&self, pin: u8) -> bool {
        pin < 16 && (self.odr >> pin) & 1 == 1
    }

    /// Whether the mode bits configure `pin` as a general purpose output.
    pub fn is_output(&self, pin: u8) -> bool {
        match self.layout {
            GpioRegisterLayout::Stm32F1 => {
                let cfg = if pin < 8 { self.crl } else { self.crh };
                let nibble = (cfg >> ((pin as u32 % 8) * 4)) & 0xF;
                // MODE != 00 is an output; CNF bit 3 selects alternate function.
                nibble & 0b0011 != 0 && nibble & 0b1000 == 0
            }
            GpioRegisterLayout::Stm32V2 => (self.moder >> (pin as u32 * 2)) & 0b11 == 0b01,
        }
    }

    fn read_reg(&self, offset: u32) -> u32 {
        match self.layout {
            GpioRegisterLayout::Stm32F1 => match offset {
                0x00 => self.crl,
                0x04 => self.crh,
                0x08 => self.idr,
                0x0C => self.odr,
                0x18 => self.lckr,
                _ => 0, // BSRR/BRR are write-only
            },
            GpioRegisterLayout::Stm32V2 => match offset {
                0x00 => self.moder,
                0x04 => self.otyper,
                0x08 => self.ospeedr,
                0x0C => self.pupdr,
                0x10 => self.idr,
                0x14 => self.odr,
                0x1C => self.lckr,
                0x20 => self.afrl,
                0x24 => self.afrh,
                _ => 0,
            },
        }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        match self.layout {
            GpioRegisterLayout::Stm32F1 => match offset {
                0x00 => self.crl = value,
                0x04 => self.crh = value,
                0x0C => self.odr = value & 0xFFFF,
                0x10 => self.bit_set_reset(value),
                0x14 => self.odr &= !(value & 0xFFFF),
                0x18 => self.lckr = value,
                _ => {}
            },
            GpioRegisterLayout::Stm32V2 => match offset {
                0x00 => self.moder = value,
                0x04 => self.otyper = value & 0xFFFF,
                0x08 => self.ospeedr = value,
                0x0C => self.pupdr = value,
                0x14 => self.odr = value & 0xFFFF,
                0x18 => self.bit_set_reset(value),
                0x1C => self.lckr = value,
                0x20 => self.afrl = value,
                0x24 => self.afrh = value,
                0x28 => self.odr &= !(value & 0xFFFF),
                _ => {}
            },
        }
    }

    /// BSRR: lower 16 bits set, upper 16 bits reset; set wins.
    fn bit_set_reset(&mut self, value: u32) {
        let set = value & 0xFFFF;
        let reset = (value >> 16) & 0xFFFF;
        self.odr &= !reset;
        self.odr |= set;
    }
}

impl crate::Peripheral for GpioPort {
    fn read(&self, offset: u32) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u32, value: u32) -> SimResult<()> {
        self.write_reg(offset, value);
        Ok(())
    }

    fn reset(&mut self) {
        self.apply_reset_values();
    }

    fn preset(&mut self, offset: u32, value: u32) -> SimResult<()> {
        // IDR is read-only to software but presettable for input scenarios.
        match (self.layout, offset) {
            (GpioRegisterLayout::Stm32F1, 0x08) | (GpioRegisterLayout::Stm32V2, 0x10) => {
                self.idr = value & 0xFFFF
            }
            _ => self.write_reg(offset, value),
        }
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn pin_state(&self, pin: u8) -> Option<PinState> {
        (pin < 16).then(|| PinState {
            output: self.is_output(pin),
            level: self.pin_level(pin),
        })
    }
}
