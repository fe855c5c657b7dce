// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Per-board register map for the heartbeat LED.
//!
//! Addresses and bit positions are data: the control loop in [`crate::blink`]
//! only knows "enable this clock bit, program this field, flip this bit".

use crate::register::Register;

/// Clock-enable bit(s) gating a peripheral bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockGate {
    pub register: Register,
    pub mask: u32,
}

impl ClockGate {
    pub const fn bit(register: Register, bit: u8) -> Self {
        Self {
            register,
            mask: 1 << bit,
        }
    }
}

/// One pin's mode field inside a configuration register shared with its
/// sibling pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinModeField {
    pub register: Register,
    pub offset: u8,
    pub width: u8,
    pub mode: u32,
}

impl PinModeField {
    /// Field for `pin` in a register packing `32 / width` pins, lowest pin in
    /// the lowest bits (STM32 CRL/CRH and MODER style).
    pub const fn packed(register: Register, pin: u8, width: u8, mode: u32) -> Self {
        let per_register = 32 / width;
        Self {
            register,
            offset: (pin % per_register) * width,
            width,
            mode,
        }
    }

    /// Bits owned by this pin.
    pub const fn mask(&self) -> u32 {
        let field = if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        };
        field << self.offset
    }

    /// Mode value shifted into place, truncated to the field.
    pub const fn bits(&self) -> u32 {
        (self.mode << self.offset) & self.mask()
    }
}

/// The data register bit driving the LED pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBit {
    pub register: Register,
    pub pin: u8,
}

impl OutputBit {
    pub const fn mask(&self) -> u32 {
        1 << self.pin
    }
}

/// Everything the control loop needs to blink one LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkTarget {
    pub clock: ClockGate,
    pub mode: PinModeField,
    pub output: OutputBit,
    /// Busy-wait iterations between toggles.
    pub delay_count: u32,
}

pub const DEFAULT_DELAY_COUNT: u32 = 500_000;

pub mod stm32f1 {
    use crate::register::Register;

    pub const RCC_BASE: u32 = 0x4002_1000;
    pub const RCC_APB2ENR: Register = Register::offset(RCC_BASE, 0x18);

    pub const GPIOA_BASE: u32 = 0x4001_0800;
    pub const GPIO_STRIDE: u32 = 0x400;

    pub const CRL: u32 = 0x00;
    pub const CRH: u32 = 0x04;
    pub const ODR: u32 = 0x0C;

    /// CNF = 00 (general purpose push-pull), MODE = 10 (output, 2 MHz).
    pub const MODE_OUTPUT_2MHZ: u32 = 0b0010;

    /// Port index: A = 0, B = 1, ...
    pub const fn gpio_base(port: u8) -> u32 {
        GPIOA_BASE + GPIO_STRIDE * port as u32
    }

    /// IOPxEN sits at bit 2 + port in APB2ENR.
    pub const fn iop_enable_bit(port: u8) -> u8 {
        2 + port
    }

    /// CRL for pins 0..=7, CRH for pins 8..=15.
    pub const fn config_register(port: u8, pin: u8) -> Register {
        let offset = if pin < 8 { CRL } else { CRH };
        Register::offset(gpio_base(port), offset)
    }
}

/// STM32 ports with the MODER/OTYPER/.../ODR layout (F4, L4, H5).
pub mod stm32v2 {
    use crate::register::Register;

    pub const MODER: u32 = 0x00;
    pub const ODR: u32 = 0x14;
    pub const GPIO_STRIDE: u32 = 0x400;

    pub const MODE_OUTPUT: u32 = 0b01;

    pub const STM32F4_RCC_AHB1ENR: Register = Register::at(0x4002_3830);
    pub const STM32F4_GPIOA_BASE: u32 = 0x4002_0000;

    pub const STM32L4_RCC_AHB2ENR: Register = Register::at(0x4002_104C);
    pub const STM32L4_GPIOA_BASE: u32 = 0x4800_0000;

    pub const STM32H5_RCC_AHB2ENR: Register = Register::at(0x4402_0C8C);
    pub const STM32H5_GPIOA_BASE: u32 = 0x4202_0000;
}

const fn f1_target(port: u8, pin: u8) -> BlinkTarget {
    let base = stm32f1::gpio_base(port);
    BlinkTarget {
        clock: ClockGate::bit(stm32f1::RCC_APB2ENR, stm32f1::iop_enable_bit(port)),
        mode: PinModeField::packed(
            stm32f1::config_register(port, pin),
            pin,
            4,
            stm32f1::MODE_OUTPUT_2MHZ,
        ),
        output: OutputBit {
            register: Register::offset(base, stm32f1::ODR),
            pin,
        },
        delay_count: DEFAULT_DELAY_COUNT,
    }
}

const fn v2_target(enable: Register, gpioa_base: u32, port: u8, pin: u8) -> BlinkTarget {
    let base = gpioa_base + stm32v2::GPIO_STRIDE * port as u32;
    BlinkTarget {
        // GPIOxEN sits at bit `port` on all three families.
        clock: ClockGate::bit(enable, port),
        mode: PinModeField::packed(
            Register::offset(base, stm32v2::MODER),
            pin,
            2,
            stm32v2::MODE_OUTPUT,
        ),
        output: OutputBit {
            register: Register::offset(base, stm32v2::ODR),
            pin,
        },
        delay_count: DEFAULT_DELAY_COUNT,
    }
}

/// Blue Pill (STM32F103C8), LED on PC13.
pub const BLUEPILL: BlinkTarget = f1_target(2, 13);

/// NUCLEO-F103RB, LD2 on PA5.
pub const NUCLEO_F103RB: BlinkTarget = f1_target(0, 5);

/// NUCLEO-F401RE, LD2 on PA5.
pub const NUCLEO_F401RE: BlinkTarget = v2_target(
    stm32v2::STM32F4_RCC_AHB1ENR,
    stm32v2::STM32F4_GPIOA_BASE,
    0,
    5,
);

/// NUCLEO-L476RG, LD2 on PA5.
pub const NUCLEO_L476RG: BlinkTarget = v2_target(
    stm32v2::STM32L4_RCC_AHB2ENR,
    stm32v2::STM32L4_GPIOA_BASE,
    0,
    5,
);

/// NUCLEO-H563ZI, LD1 on PB0.
pub const NUCLEO_H563ZI: BlinkTarget = v2_target(
    stm32v2::STM32H5_RCC_AHB2ENR,
    stm32v2::STM32H5_GPIOA_BASE,
    1,
    0,
);

pub const BUILTIN: &[(&str, BlinkTarget)] = &[
    ("bluepill", BLUEPILL),
    ("nucleo-f103rb", NUCLEO_F103RB),
    ("nucleo-f401re", NUCLEO_F401RE),
    ("nucleo-l476rg", NUCLEO_L476RG),
    ("nucleo-h563zi", NUCLEO_H563ZI),
];

pub fn by_name(name: &str) -> Option<BlinkTarget> {
    BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, target)| *target)
}
