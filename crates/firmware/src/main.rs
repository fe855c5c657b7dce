#![no_std]
// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]

//! Heartbeat LED. Board selection is a cargo feature, e.g.
//! `--no-default-features --features nucleo-f401re --target thumbv7em-none-eabihf`.

use cortex_m_rt::entry;
use heartbeat_core::{blink, board, BlinkTarget, Mmio};
use panic_halt as _;

const SELECTED_BOARDS: usize = cfg!(feature = "bluepill") as usize
    + cfg!(feature = "nucleo-f103rb") as usize
    + cfg!(feature = "nucleo-f401re") as usize
    + cfg!(feature = "nucleo-l476rg") as usize
    + cfg!(feature = "nucleo-h563zi") as usize;

const _: () = assert!(
    SELECTED_BOARDS == 1,
    "enable exactly one board feature: bluepill, nucleo-f103rb, nucleo-f401re, nucleo-l476rg, nucleo-h563zi"
);

#[cfg(feature = "bluepill")]
const BOARD: BlinkTarget = board::BLUEPILL;
#[cfg(feature = "nucleo-f103rb")]
const BOARD: BlinkTarget = board::NUCLEO_F103RB;
#[cfg(feature = "nucleo-f401re")]
const BOARD: BlinkTarget = board::NUCLEO_F401RE;
#[cfg(feature = "nucleo-l476rg")]
const BOARD: BlinkTarget = board::NUCLEO_L476RG;
#[cfg(feature = "nucleo-h563zi")]
const BOARD: BlinkTarget = board::NUCLEO_H563ZI;

#[entry]
fn main() -> ! {
    // SAFETY: this is the only code touching the LED bank's registers and
    // the reset handler has run; nothing else owns them.
    let mmio = unsafe { Mmio::new() };
    blink::run(mmio, BOARD)
}
