// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use heartbeat_core::{BlinkTarget, ClockGate, OutputBit, PinModeField, Register};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

mod builtin;

pub use builtin::{builtin, builtin_names};

pub const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

/// Peripheral types the simulator knows how to model.
pub const PERIPHERAL_TYPES: &[&str] = &["rcc", "gpio", "memory"];

/// Window size used when a peripheral does not declare one (one STM32 slot).
pub const DEFAULT_WINDOW_SIZE: u64 = 0x400;

/// Default schema version for YAML profiles
fn default_schema_version() -> String {
    SUPPORTED_SCHEMA_VERSION.to_string()
}

fn default_delay_count() -> u32 {
    heartbeat_core::board::DEFAULT_DELAY_COUNT
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BitRef {
    pub register: u32,
    pub bit: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ModeFieldConfig {
    pub register: u32,
    pub offset: u8,
    pub width: u8,
    pub value: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub register: u32,
    pub pin: u8,
}

/// The three registers that make up the heartbeat.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LedConfig {
    pub clock: BitRef,
    pub mode: ModeFieldConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "rcc", "gpio", "memory"
    #[serde(default)]
    pub layout: Option<String>,
    pub base_address: u32,
    #[serde(default)]
    pub size: Option<String>,
    /// Register offset -> value applied after reset.
    #[serde(default)]
    pub reset_values: BTreeMap<u32, u32>,
    /// Writes are dropped while this clock-enable bit is clear.
    #[serde(default)]
    pub clock_gate: Option<BitRef>,
}

impl PeripheralConfig {
    pub fn window_size(&self) -> Result<u64> {
        match &self.size {
            Some(size) => parse_size(size)
                .with_context(|| format!("Invalid size for peripheral '{}'", self.id)),
            None => Ok(DEFAULT_WINDOW_SIZE),
        }
    }

    pub fn contains(&self, addr: u32, size: u64) -> bool {
        let base = self.base_address as u64;
        (addr as u64) >= base && (addr as u64) < base + size
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub chip: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub peripherals: Vec<PeripheralConfig>,
    pub led: LedConfig,
    #[serde(default = "default_delay_count")]
    pub delay_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("unsupported schema_version '{0}'; supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("board name cannot be empty")]
    EmptyName,
    #[error("clock enable bit {0} is outside a 32-bit register")]
    ClockBitOutOfRange(u8),
    #[error("mode field at offset {offset} with width {width} does not fit a 32-bit register")]
    ModeFieldOutOfRange { offset: u8, width: u8 },
    #[error("mode value {value:#x} does not fit a {width}-bit field")]
    ModeValueTooWide { value: u32, width: u8 },
    #[error("output pin {0} is outside a 32-bit register")]
    PinOutOfRange(u8),
    #[error("register {0:#010x} is not 32-bit aligned")]
    Unaligned(u32),
    #[error("register {0:#010x} is not inside any declared peripheral")]
    Unmapped(u32),
    #[error("duplicate peripheral id '{0}'")]
    DuplicateId(String),
    #[error("peripheral '{id}' has unsupported type '{kind}'; supported: rcc, gpio, memory")]
    UnsupportedPeripheral { id: String, kind: String },
    #[error("peripheral '{0}' has an empty address window")]
    EmptyWindow(String),
    #[error("peripheral '{0}' extends past the 32-bit address space")]
    WindowOutOfRange(String),
    #[error("peripheral '{id}' clock gate bit {bit} is outside a 32-bit register")]
    GateBitOutOfRange { id: String, bit: u8 },
    #[error("peripherals '{0}' and '{1}' overlap")]
    Overlap(String, String),
}

impl BoardProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board profile at {:?}", path))?;

        let profile: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse board profile JSON from {:?}", path))?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse board profile YAML")?
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profile: Self =
            serde_yaml::from_str(yaml).context("Failed to parse board profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    /// A built-in board name, otherwise a path to a profile file.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if let Some(profile) = builtin(name_or_path)? {
            tracing::debug!("Using built-in board profile '{}'", name_or_path);
            return Ok(profile);
        }
        Self::from_file(name_or_path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(ProfileError::UnsupportedSchema(self.schema_version.clone()).into());
        }
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyName.into());
        }

        let led = &self.led;
        if led.clock.bit >= 32 {
            return Err(ProfileError::ClockBitOutOfRange(led.clock.bit).into());
        }
        let mode = &led.mode;
        if mode.width == 0 || mode.width as u32 + mode.offset as u32 > 32 {
            return Err(ProfileError::ModeFieldOutOfRange {
                offset: mode.offset,
                width: mode.width,
            }
            .into());
        }
        if mode.width < 32 && mode.value >> mode.width != 0 {
            return Err(ProfileError::ModeValueTooWide {
                value: mode.value,
                width: mode.width,
            }
            .into());
        }
        if led.output.pin >= 32 {
            return Err(ProfileError::PinOutOfRange(led.output.pin).into());
        }

        let registers = [led.clock.register, mode.register, led.output.register];
        for reg in registers {
            if reg % 4 != 0 {
                return Err(ProfileError::Unaligned(reg).into());
            }
        }

        self.validate_peripherals()?;

        if !self.peripherals.is_empty() {
            for reg in registers {
                if self.peripheral_at(reg)?.is_none() {
                    return Err(ProfileError::Unmapped(reg).into());
                }
            }
        }

        Ok(())
    }

    fn validate_peripherals(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut windows = Vec::with_capacity(self.peripherals.len());

        for p in &self.peripherals {
            if !ids.insert(p.id.as_str()) {
                return Err(ProfileError::DuplicateId(p.id.clone()).into());
            }
            if !PERIPHERAL_TYPES.contains(&p.r#type.as_str()) {
                return Err(ProfileError::UnsupportedPeripheral {
                    id: p.id.clone(),
                    kind: p.r#type.clone(),
                }
                .into());
            }
            if let Some(gate) = &p.clock_gate {
                if gate.bit >= 32 {
                    return Err(ProfileError::GateBitOutOfRange {
                        id: p.id.clone(),
                        bit: gate.bit,
                    }
                    .into());
                }
                if gate.register % 4 != 0 {
                    return Err(ProfileError::Unaligned(gate.register).into());
                }
            }
            let size = p.window_size()?;
            if size == 0 {
                return Err(ProfileError::EmptyWindow(p.id.clone()).into());
            }
            let start = p.base_address as u64;
            if start + size > 1 << 32 {
                return Err(ProfileError::WindowOutOfRange(p.id.clone()).into());
            }
            windows.push((start, start + size, p.id.as_str()));
        }

        windows.sort();
        for pair in windows.windows(2) {
            let (_, end, a) = pair[0];
            let (start, _, b) = pair[1];
            if start < end {
                return Err(ProfileError::Overlap(a.to_string(), b.to_string()).into());
            }
        }

        Ok(())
    }

    /// The peripheral whose window contains `addr`.
    pub fn peripheral_at(&self, addr: u32) -> Result<Option<&PeripheralConfig>> {
        for p in &self.peripherals {
            if p.contains(addr, p.window_size()?) {
                return Ok(Some(p));
            }
        }
        Ok(None)
    }

    /// The register map the control loop runs against.
    pub fn blink_target(&self) -> BlinkTarget {
        let led = &self.led;
        BlinkTarget {
            clock: ClockGate::bit(Register::at(led.clock.register), led.clock.bit),
            mode: PinModeField {
                register: Register::at(led.mode.register),
                offset: led.mode.offset,
                width: led.mode.width,
                mode: led.mode.value,
            },
            output: OutputBit {
                register: Register::at(led.output.register),
                pin: led.output.pin,
            },
            delay_count: self.delay_count,
        }
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: "minimal"
chip: "stm32f103c8"
led:
  clock: { register: 0x40021018, bit: 4 }
  mode: { register: 0x40011004, offset: 20, width: 4, value: 0x2 }
  output: { register: 0x4001100C, pin: 13 }
"#;

    fn minimal() -> BoardProfile {
        serde_yaml::from_str(MINIMAL).unwrap()
    }

    fn expect_error(profile: &BoardProfile, expected: ProfileError) {
        let err = profile.validate().unwrap_err();
        assert_eq!(err.downcast_ref::<ProfileError>(), Some(&expected), "{err:#}");
    }

    #[test]
    fn test_minimal_profile_defaults() {
        let profile = BoardProfile::from_yaml(MINIMAL).unwrap();
        assert_eq!(profile.schema_version, "1.0");
        assert_eq!(profile.delay_count, 500_000);
        assert!(profile.peripherals.is_empty());
        assert_eq!(profile.blink_target(), heartbeat_core::board::BLUEPILL);
    }

    #[test]
    fn test_invalid_version() {
        let mut profile = minimal();
        profile.schema_version = "2.0".to_string();
        expect_error(&profile, ProfileError::UnsupportedSchema("2.0".to_string()));
    }

    #[test]
    fn test_empty_name() {
        let mut profile = minimal();
        profile.name = "  ".to_string();
        expect_error(&profile, ProfileError::EmptyName);
    }

    #[test]
    fn test_clock_bit_range() {
        let mut profile = minimal();
        profile.led.clock.bit = 32;
        expect_error(&profile, ProfileError::ClockBitOutOfRange(32));
    }

    fn gated_gpioc(bit: u8, register: u32) -> PeripheralConfig {
        PeripheralConfig {
            id: "gpioc".to_string(),
            r#type: "gpio".to_string(),
            layout: Some("stm32f1".to_string()),
            base_address: 0x4001_1000,
            size: None,
            reset_values: BTreeMap::new(),
            clock_gate: Some(BitRef { register, bit }),
        }
    }

    #[test]
    fn test_clock_gate_bit_range() {
        let mut profile = minimal();
        profile.peripherals = vec![gated_gpioc(40, 0x4002_1018)];
        expect_error(
            &profile,
            ProfileError::GateBitOutOfRange {
                id: "gpioc".to_string(),
                bit: 40,
            },
        );

        let yaml = MINIMAL.replace(
            "led:",
            "peripherals:\n  - { id: gpioc, type: gpio, base_address: 0x40011000, clock_gate: { register: 0x40021018, bit: 32 } }\nled:",
        );
        assert!(BoardProfile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_clock_gate_register_alignment() {
        let mut profile = minimal();
        profile.peripherals = vec![gated_gpioc(4, 0x4002_1019)];
        expect_error(&profile, ProfileError::Unaligned(0x4002_1019));
    }

    #[test]
    fn test_mode_field_must_fit() {
        let mut profile = minimal();
        profile.led.mode.offset = 30;
        expect_error(
            &profile,
            ProfileError::ModeFieldOutOfRange {
                offset: 30,
                width: 4,
            },
        );

        profile.led.mode.offset = 0;
        profile.led.mode.width = 0;
        expect_error(
            &profile,
            ProfileError::ModeFieldOutOfRange {
                offset: 0,
                width: 0,
            },
        );
    }

    #[test]
    fn test_mode_value_must_fit_width() {
        let mut profile = minimal();
        profile.led.mode.value = 0x1F;
        expect_error(
            &profile,
            ProfileError::ModeValueTooWide {
                value: 0x1F,
                width: 4,
            },
        );
    }

    #[test]
    fn test_output_pin_range() {
        let mut profile = minimal();
        profile.led.output.pin = 40;
        expect_error(&profile, ProfileError::PinOutOfRange(40));
    }

    #[test]
    fn test_unaligned_register() {
        let mut profile = minimal();
        profile.led.output.register = 0x4001_100D;
        expect_error(&profile, ProfileError::Unaligned(0x4001_100D));
    }

    #[test]
    fn test_unknown_led_field_rejected() {
        let yaml = MINIMAL.replace("pin: 13", "pin: 13, polarity: low");
        assert!(BoardProfile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_peripheral_windows() {
        let yaml = r#"
name: "windows"
chip: "stm32f103c8"
peripherals:
  - id: "rcc"
    type: "rcc"
    layout: "stm32f1"
    base_address: 0x40021000
  - id: "gpioc"
    type: "gpio"
    layout: "stm32f1"
    base_address: 0x40011000
    size: "1KiB"
    reset_values: { 0x04: 0x44444444 }
    clock_gate: { register: 0x40021018, bit: 4 }
led:
  clock: { register: 0x40021018, bit: 4 }
  mode: { register: 0x40011004, offset: 20, width: 4, value: 0x2 }
  output: { register: 0x4001100C, pin: 13 }
"#;
        let profile = BoardProfile::from_yaml(yaml).unwrap();
        let gpioc = &profile.peripherals[1];
        assert_eq!(gpioc.window_size().unwrap(), 0x400);
        assert_eq!(gpioc.reset_values.get(&0x04), Some(&0x4444_4444));
        assert_eq!(
            gpioc.clock_gate,
            Some(BitRef {
                register: 0x4002_1018,
                bit: 4
            })
        );
        assert_eq!(
            profile.peripheral_at(0x4001_100C).unwrap().map(|p| p.id.as_str()),
            Some("gpioc")
        );
        assert!(profile.peripheral_at(0x4001_1400).unwrap().is_none());
    }

    #[test]
    fn test_unmapped_led_register() {
        let mut profile = minimal();
        profile.peripherals.push(PeripheralConfig {
            id: "rcc".to_string(),
            r#type: "rcc".to_string(),
            layout: Some("stm32f1".to_string()),
            base_address: 0x4002_1000,
            size: None,
            reset_values: BTreeMap::new(),
            clock_gate: None,
        });
        expect_error(&profile, ProfileError::Unmapped(0x4001_1004));
    }

    #[test]
    fn test_overlap_and_duplicates() {
        let gpio = |id: &str, base: u32| PeripheralConfig {
            id: id.to_string(),
            r#type: "gpio".to_string(),
            layout: None,
            base_address: base,
            size: Some("2KiB".to_string()),
            reset_values: BTreeMap::new(),
            clock_gate: None,
        };

        let mut profile = minimal();
        profile.peripherals = vec![gpio("gpioc", 0x4001_1000), gpio("gpioc", 0x4002_0000)];
        expect_error(&profile, ProfileError::DuplicateId("gpioc".to_string()));

        profile.peripherals = vec![gpio("gpiob", 0x4001_0C00), gpio("gpioc", 0x4001_1000)];
        expect_error(
            &profile,
            ProfileError::Overlap("gpiob".to_string(), "gpioc".to_string()),
        );
    }

    #[test]
    fn test_window_past_address_space() {
        let memory = |size: &str| PeripheralConfig {
            id: "sram".to_string(),
            r#type: "memory".to_string(),
            layout: None,
            base_address: 0xF000_0000,
            size: Some(size.to_string()),
            reset_values: BTreeMap::new(),
            clock_gate: None,
        };

        let mut profile = minimal();
        profile.peripherals = vec![memory("16GiB")];
        expect_error(&profile, ProfileError::WindowOutOfRange("sram".to_string()));

        profile.peripherals = vec![memory("1KiB")];
        assert!(matches!(
            profile.validate().unwrap_err().downcast_ref::<ProfileError>(),
            Some(ProfileError::Unmapped(_))
        ));
    }

    #[test]
    fn test_unsupported_peripheral_type() {
        let mut profile = minimal();
        profile.peripherals.push(PeripheralConfig {
            id: "usart1".to_string(),
            r#type: "uart".to_string(),
            layout: None,
            base_address: 0x4001_3800,
            size: None,
            reset_values: BTreeMap::new(),
            clock_gate: None,
        });
        expect_error(
            &profile,
            ProfileError::UnsupportedPeripheral {
                id: "usart1".to_string(),
                kind: "uart".to_string(),
            },
        );
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1KiB").unwrap(), 1024);
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert!(parse_size("lots").is_err());
    }
}
