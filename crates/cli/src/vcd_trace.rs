// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use heartbeat_core::BlinkTarget;
use heartbeat_sim::observer::{Access, AccessKind, BusObserver};
use heartbeat_sim::SimulationError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use vcd::{IdCode, TimescaleUnit, Value, Writer};

/// Dumps the LED pin, the GPIO clock enable and the bus write port as a VCD
/// waveform, one time unit per simulated cycle.
pub struct VcdObserver<W: Write = BufWriter<File>> {
    state: Mutex<VcdState<W>>,
    ids: VcdIds,
    target: BlinkTarget,
}

struct VcdIds {
    led: IdCode,
    clock_en: IdCode,
    addr: IdCode,
    data: IdCode,
    we: IdCode,
}

struct VcdState<W: Write> {
    writer: Writer<W>,
    current_time: u64,
    led: bool,
    clock_en: bool,
    /// LED level before the most recent write to the output register.
    led_before_write: bool,
    /// First write error; later changes are dropped.
    error: Option<String>,
}

impl VcdObserver {
    pub fn new(
        path: &Path,
        target: BlinkTarget,
        led: bool,
        clock_en: bool,
    ) -> anyhow::Result<Self> {
        let file = File::create(path)?;
        Self::with_writer(BufWriter::new(file), target, led, clock_en)
    }
}

impl<W: Write> VcdObserver<W> {
    pub fn with_writer(
        out: W,
        target: BlinkTarget,
        led: bool,
        clock_en: bool,
    ) -> anyhow::Result<Self> {
        let mut writer = Writer::new(out);

        writer.timescale(1, TimescaleUnit::NS)?;
        writer.add_module("heartbeat")?;

        let led_id = writer.add_wire(1, "led")?;
        let clock_en_id = writer.add_wire(1, "clock_en")?;

        writer.add_module("bus")?;
        let addr = writer.add_wire(32, "addr")?;
        let data = writer.add_wire(32, "data")?;
        let we = writer.add_wire(1, "we")?;
        writer.upscope()?; // bus

        writer.upscope()?; // heartbeat
        writer.enddefinitions()?;

        writer.timestamp(0)?;
        writer.change_scalar(led_id, scalar(led))?;
        writer.change_scalar(clock_en_id, scalar(clock_en))?;
        writer.change_vector(addr, u32_to_vec(0))?;
        writer.change_vector(data, u32_to_vec(0))?;
        writer.change_scalar(we, Value::V0)?;

        Ok(Self {
            state: Mutex::new(VcdState {
                writer,
                current_time: 0,
                led,
                clock_en,
                led_before_write: led,
                error: None,
            }),
            ids: VcdIds {
                led: led_id,
                clock_en: clock_en_id,
                addr,
                data,
                we,
            },
            target,
        })
    }
}

fn scalar(level: bool) -> Value {
    if level {
        Value::V1
    } else {
        Value::V0
    }
}

// MSB first
fn u32_to_vec(val: u32) -> Vec<Value> {
    (0..32).rev().map(|i| scalar((val >> i) & 1 == 1)).collect()
}

impl<W: Write> VcdObserver<W> {
    /// The first error hit while writing the waveform, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.error.clone())
    }
}

impl<W: Write> VcdState<W> {
    fn record(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if self.error.is_none() {
                warn!("VCD trace write failed, waveform will be truncated: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn advance(&mut self, time: u64) {
        if time > self.current_time {
            self.current_time = time;
            let result = self.writer.timestamp(time);
            self.record(result);
        }
    }

    fn scalar(&mut self, id: IdCode, value: Value) {
        let result = self.writer.change_scalar(id, value);
        self.record(result);
    }

    fn vector(&mut self, id: IdCode, value: u32) {
        let result = self.writer.change_vector(id, u32_to_vec(value));
        self.record(result);
    }
}

impl<W: Write> core::fmt::Debug for VcdObserver<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "VcdObserver")
    }
}

impl<W: Write + Send> BusObserver for VcdObserver<W> {
    fn on_access(&self, _peripheral: Option<&str>, access: &Access) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.advance(access.cycle);

        if access.kind == AccessKind::Read {
            state.scalar(self.ids.we, Value::V0);
            return;
        }

        state.vector(self.ids.addr, access.address);
        state.vector(self.ids.data, access.value);
        state.scalar(self.ids.we, Value::V1);

        let output = self.target.output;
        if access.address == output.register.addr() {
            state.led_before_write = state.led;
            let led = access.value & output.mask() != 0;
            if led != state.led {
                state.led = led;
                state.scalar(self.ids.led, scalar(led));
            }
        }
        let clock = self.target.clock;
        if access.address == clock.register.addr() {
            let clock_en = access.value & clock.mask == clock.mask;
            if clock_en != state.clock_en {
                state.clock_en = clock_en;
                state.scalar(self.ids.clock_en, scalar(clock_en));
            }
        }
    }

    fn on_fault(&self, fault: &SimulationError) {
        // A dropped write to the output register never reached the pin.
        let SimulationError::ClockDisabled { addr, .. } = fault else {
            return;
        };
        if *addr != self.target.output.register.addr() {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.led != state.led_before_write {
            let led = state.led_before_write;
            state.led = led;
            state.scalar(self.ids.led, scalar(led));
        }
    }

    fn on_delay(&self, _iterations: u64, cycle: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.advance(cycle);
            state.scalar(self.ids.we, Value::V0);
        }
    }
}
