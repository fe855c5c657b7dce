// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::env;
use std::fs;
use std::path::PathBuf;

// Board feature (as seen by build scripts) -> linker memory layout.
const LAYOUTS: &[(&str, &str)] = &[
    ("BLUEPILL", "memory/stm32f103c8.x"),
    ("NUCLEO_F103RB", "memory/stm32f103rb.x"),
    ("NUCLEO_F401RE", "memory/stm32f401re.x"),
    ("NUCLEO_L476RG", "memory/stm32l476rg.x"),
    ("NUCLEO_H563ZI", "memory/stm32h563zi.x"),
];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // With no board feature the crate fails to compile anyway; pick any
    // layout so that error is the one reported.
    let layout = LAYOUTS
        .iter()
        .find(|(feature, _)| env::var_os(format!("CARGO_FEATURE_{}", feature)).is_some())
        .map(|(_, path)| *path)
        .unwrap_or(LAYOUTS[0].1);

    fs::copy(layout, out_dir.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg=-Tlink.x");
    println!("cargo:rerun-if-changed=memory");
}
