// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use heartbeat_config::{builtin, builtin_names, BoardProfile};
use heartbeat_core::{board, BlinkState, Blinker, BusyWait};
use heartbeat_sim::bus::PeripheralEntry;
use heartbeat_sim::memory::RegisterFile;
use heartbeat_sim::metrics::{AccessCounts, BusMetrics};
use heartbeat_sim::session::CycleCounter;
use heartbeat_sim::{
    AccessTrace, PinState, Session, SimulationConfig, SimulationError, StopReason, SystemBus,
};
use std::sync::Arc;

const APB2ENR: u32 = 0x4002_1018;
const GPIOC_CRH: u32 = 0x4001_1004;
const GPIOC_ODR: u32 = 0x4001_100C;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn profile(name: &str) -> BoardProfile {
    builtin(name).unwrap().unwrap()
}

/// Zero-initialised RAM behind the bluepill register addresses.
fn flat_bluepill_bus() -> SystemBus {
    let mut bus = SystemBus::new();
    bus.map(PeripheralEntry::new(
        "rcc",
        0x4002_1000,
        0x400,
        Box::new(RegisterFile::new(0x400)),
    ));
    bus.map(PeripheralEntry::new(
        "gpioc",
        0x4001_1000,
        0x400,
        Box::new(RegisterFile::new(0x400)),
    ));
    bus
}

#[test]
fn test_reference_scenario_on_zeroed_memory() {
    init_tracing();
    let target = board::BLUEPILL;
    let counter = CycleCounter::new(Default::default(), 1);
    let mut blinker = Blinker::with_wait(flat_bluepill_bus(), target, BusyWait::with_nop(counter));

    blinker.configure();
    assert_eq!(blinker.state(), BlinkState::Blinking);
    assert_eq!(blinker.bus().peek(APB2ENR), Some(0x0000_0010));
    assert_eq!(blinker.bus().peek(GPIOC_CRH), Some(0x0020_0000));

    blinker.toggle();
    assert_eq!(blinker.bus().peek(GPIOC_ODR), Some(0x0000_2000));
    blinker.toggle();
    assert_eq!(blinker.bus().peek(GPIOC_ODR), Some(0x0000_0000));
    assert!(blinker.bus().faults().is_empty());
}

#[test]
fn test_configuration_writes_clock_before_pin_mode() {
    let mut session = Session::new(&profile("bluepill"), SimulationConfig::default()).unwrap();
    let trace = Arc::new(AccessTrace::writes_only());
    session.add_observer(trace.clone());

    session.configure();
    assert_eq!(
        trace.writes(),
        vec![
            (APB2ENR, 0x0000_0010),
            (GPIOC_CRH, 0x4404_4444),
            (GPIOC_CRH, 0x4424_4444),
        ]
    );
    assert!(session.bus().faults().is_empty());
}

#[test]
fn test_every_access_is_read_then_write() {
    let mut session = Session::new(&profile("bluepill"), SimulationConfig::default().with_delay(1))
        .unwrap();
    let trace = Arc::new(AccessTrace::default());
    session.add_observer(trace.clone());
    session.run(2);

    let accesses = trace.accesses();
    // Three read-modify-writes to configure, one per toggle.
    assert_eq!(accesses.len(), 2 * (3 + 2));
    for pair in accesses.chunks(2) {
        assert_eq!(pair[0].address, pair[1].address);
        assert!(pair[0].cycle < pair[1].cycle);
    }
}

#[test]
fn test_wrong_clock_bit_leaves_led_dark() {
    let mut profile = profile("bluepill");
    // IOPB instead of IOPC.
    profile.led.clock.bit = 3;

    let mut session = Session::new(&profile, SimulationConfig::default().with_delay(2)).unwrap();
    let summary = session.run(2);

    assert!(!summary.passed());
    assert_eq!(summary.levels, vec![false, false]);
    assert_eq!(
        summary.faults[0],
        SimulationError::ClockDisabled {
            peripheral: "gpioc".to_string(),
            addr: GPIOC_CRH,
            value: 0x4404_4444,
        }
    );
    // Two dropped mode writes plus one dropped ODR write per toggle.
    assert_eq!(summary.faults.len(), 4);
    assert_eq!(session.bus().peek(GPIOC_CRH), Some(0x4444_4444));
    assert_eq!(
        summary.led_pin,
        Some(PinState {
            output: false,
            level: false
        })
    );
}

#[test]
fn test_pin_left_as_input_fails_the_run() {
    let mut profile = profile("bluepill");
    // CNF=01 MODE=00: floating input, the reset configuration.
    profile.led.mode.value = 0x4;

    let summary = Session::new(&profile, SimulationConfig::default().with_delay(2))
        .unwrap()
        .run(2);
    assert!(summary.faults.is_empty());
    assert_eq!(summary.levels, vec![true, false]);
    assert_eq!(
        summary.led_pin,
        Some(PinState {
            output: false,
            level: false
        })
    );
    assert!(!summary.passed());
}

#[test]
fn test_out_of_range_clock_gate_is_a_config_error() {
    let mut profile = profile("bluepill");
    let gpioc = profile
        .peripherals
        .iter_mut()
        .find(|p| p.id == "gpioc")
        .unwrap();
    gpioc.clock_gate.as_mut().unwrap().bit = 40;

    let err = SystemBus::from_profile(&profile).err().unwrap();
    assert!(format!("{:#}", err).contains("bit 40"), "{:#}", err);
}

#[test]
fn test_wrong_clock_bit_without_gating_still_blinks() {
    let mut profile = profile("bluepill");
    profile.led.clock.bit = 3;

    let config = SimulationConfig::default()
        .with_delay(2)
        .without_clock_gating();
    let summary = Session::new(&profile, config).unwrap().run(2);
    assert!(summary.passed(), "{:?}", summary);
    assert_eq!(summary.levels, vec![true, false]);
}

#[test]
fn test_stop_on_fault() {
    let mut profile = profile("bluepill");
    profile.led.clock.bit = 3;

    let config = SimulationConfig::default().with_delay(2).stopping_on_fault();
    let summary = Session::new(&profile, config).unwrap().run(10);
    assert_eq!(summary.stop_reason, StopReason::Fault);
    assert_eq!(summary.toggles, 0);
    assert_eq!(summary.delay_iterations, 0);
}

#[test]
fn test_every_builtin_board_blinks() {
    for name in builtin_names() {
        let profile = profile(name);
        let mut session = Session::new(&profile, SimulationConfig::default().with_delay(5)).unwrap();
        let summary = session.run(4);

        assert!(summary.passed(), "{}: {:?}", name, summary);
        assert_eq!(summary.levels, vec![true, false, true, false], "{}", name);
        assert_eq!(summary.delay_iterations, 20, "{}", name);
        assert_eq!(summary.stop_reason, StopReason::ToggleLimit);

        let target = profile.blink_target();
        let bus = session.bus();
        assert_eq!(
            bus.peek(target.clock.register.addr()).unwrap() & target.clock.mask,
            target.clock.mask,
            "{}",
            name
        );
        assert_eq!(
            bus.peek(target.mode.register.addr()).unwrap() & target.mode.mask(),
            target.mode.bits(),
            "{}",
            name
        );
    }
}

#[test]
fn test_sibling_pins_keep_reset_configuration() {
    let cases = [
        ("nucleo-f401re", 0x4002_0000, 0xA800_0400),
        ("nucleo-l476rg", 0x4800_0000, 0xABFF_F7FF),
        ("nucleo-h563zi", 0x4202_0400, 0xFFFF_FEBD),
    ];
    for (name, moder, expected) in cases {
        let mut session = Session::new(&profile(name), SimulationConfig::default()).unwrap();
        session.configure();
        assert_eq!(session.bus().peek(moder), Some(expected), "{}", name);
    }
}

#[test]
fn test_metrics_and_cycles() {
    let config = SimulationConfig {
        nop_cycles: 2,
        ..SimulationConfig::default().with_delay(10)
    };
    let mut session = Session::new(&profile("bluepill"), config).unwrap();
    let metrics = Arc::new(BusMetrics::new());
    session.add_observer(metrics.clone());

    let summary = session.run(3);
    // Six accesses to configure, two per toggle, two cycles per delay iteration.
    assert_eq!(summary.cycles, 6 + 3 * 2 + 3 * 10 * 2);
    assert_eq!(metrics.get_reads(), 6);
    assert_eq!(metrics.get_writes(), 6);
    assert_eq!(metrics.get_delay_iterations(), 30);
    assert_eq!(
        metrics.get_peripheral_counts("rcc"),
        AccessCounts {
            reads: 1,
            writes: 1
        }
    );
    assert_eq!(
        metrics.get_peripheral_counts("gpioc"),
        AccessCounts {
            reads: 5,
            writes: 5
        }
    );
}

#[test]
fn test_profile_without_peripherals_uses_plain_memory() {
    let yaml = r#"
name: "bare"
chip: "stm32f103c8"
led:
  clock: { register: 0x40021018, bit: 4 }
  mode: { register: 0x40011004, offset: 20, width: 4, value: 0x2 }
  output: { register: 0x4001100C, pin: 13 }
delay_count: 3
"#;
    let profile = BoardProfile::from_yaml(yaml).unwrap();
    let mut session = Session::new(&profile, SimulationConfig::default()).unwrap();
    let summary = session.run(2);
    assert!(summary.passed(), "{:?}", summary);
    assert_eq!(session.bus().peek(GPIOC_CRH), Some(0x0020_0000));
    assert_eq!(summary.delay_iterations, 6);
}

#[test]
fn test_unknown_layout_is_a_config_error() {
    let mut profile = profile("bluepill");
    profile.peripherals[0].layout = Some("stm32g0".to_string());
    let err = SystemBus::from_profile(&profile).err().unwrap();
    assert!(format!("{:#}", err).contains("stm32g0"), "{:#}", err);
}

#[test]
fn test_bus_snapshot_serializes() {
    let mut session = Session::new(&profile("bluepill"), SimulationConfig::default()).unwrap();
    session.configure();
    let json = serde_json::to_value(session.bus().snapshot()).unwrap();
    assert_eq!(json["board"], "bluepill");
    assert_eq!(json["peripherals"]["gpioc"]["clock_enabled"], true);
    assert_eq!(json["peripherals"]["gpioc"]["registers"]["crh"], 0x4424_4444u32);
    assert_eq!(json["faults"], serde_json::json!([]));
}
