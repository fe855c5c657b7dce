// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod gpio;
pub mod rcc;

use crate::memory::RegisterFile;
use crate::Peripheral;
use anyhow::anyhow;

/// Instantiate the model for a profile peripheral entry.
pub fn build(kind: &str, layout: Option<&str>, size: u64) -> anyhow::Result<Box<dyn Peripheral>> {
    let dev: Box<dyn Peripheral> = match kind {
        "gpio" => {
            let layout = match layout {
                Some(l) => l.parse().map_err(|e: String| anyhow!(e))?,
                None => gpio::GpioRegisterLayout::default(),
            };
            Box::new(gpio::GpioPort::new_with_layout(layout))
        }
        "rcc" => {
            let layout = match layout {
                Some(l) => l.parse().map_err(|e: String| anyhow!(e))?,
                None => rcc::RccRegisterLayout::default(),
            };
            Box::new(rcc::Rcc::new_with_layout(layout))
        }
        "memory" => Box::new(RegisterFile::new(size)),
        other => return Err(anyhow!("Unsupported peripheral type '{}'", other)),
    };
    Ok(dev)
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::Peripheral;

    #[test]
    fn test_build_known_types() {
        let gpio = build("gpio", Some("stm32v2"), 0x400).unwrap();
        assert_eq!(gpio.read(0x00).unwrap(), 0);

        let gpio = build("gpio", None, 0x400).unwrap();
        assert_eq!(gpio.read(0x04).unwrap(), 0x4444_4444);

        let mem = build("memory", None, 8).unwrap();
        assert!(mem.read(0x08).is_err());
    }

    #[test]
    fn test_build_rejects_unknown_layout_and_type() {
        let err = build("rcc", Some("stm32g0"), 0x400).unwrap_err();
        assert!(err.to_string().contains("stm32g0"), "{err}");
        assert!(build("uart", None, 0x400).is_err());
    }
}
