// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand, ValueEnum};
use heartbeat_config::BoardProfile;
use heartbeat_sim::{RunSummary, Session, SimulationConfig, SystemBus};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

mod vcd_trace;

const EXIT_PASS: u8 = 0;
const EXIT_CHECK_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Heartbeat LED firmware: board profiles and register-level simulation",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (peripheral mapping, configuration steps)
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate configuration and a bounded number of LED toggles.
    Run(RunArgs),

    /// Configure (and optionally toggle), then print the LED registers.
    Registers(RegistersArgs),

    /// List the built-in boards.
    Boards,

    /// Load and validate a board profile.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Built-in board name or path to a board profile (YAML/JSON)
    #[arg(short, long)]
    board: String,

    /// Number of LED toggles to simulate
    #[arg(long, default_value = "4")]
    toggles: u64,

    /// Busy-wait iterations between toggles (default: the board's delay)
    #[arg(long)]
    delay: Option<u32>,

    /// Simulated cycles per busy-wait iteration
    #[arg(long, default_value = "1")]
    nop_cycles: u32,

    /// Allow writes to peripherals whose clock is disabled
    #[arg(long)]
    no_clock_gating: bool,

    /// Stop at the first bus fault
    #[arg(long)]
    stop_on_fault: bool,

    /// Print the run summary as a JSON line
    #[arg(long)]
    json: bool,

    /// Write the LED waveform to a VCD file
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// Write a register snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RegistersArgs {
    /// Built-in board name or path to a board profile (YAML/JSON)
    #[arg(short, long)]
    board: String,

    /// LED toggles to perform after configuration
    #[arg(long, default_value = "0")]
    toggles: u64,

    /// Value format
    #[arg(long, value_enum, default_value_t = ValueFormat::Hex)]
    format: ValueFormat,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Built-in board name or path to a board profile (YAML/JSON)
    #[arg(short, long)]
    board: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ValueFormat {
    Hex,
    Dec,
    Bin,
}

impl ValueFormat {
    fn format(self, value: u32) -> String {
        match self {
            ValueFormat::Hex => format!("{:#010x}", value),
            ValueFormat::Dec => format!("{}", value),
            ValueFormat::Bin => format!("{:#034b}", value),
        }
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    schema_version: &'a str,
    status: &'a str,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_sim(args),
        Commands::Registers(args) => run_registers(args),
        Commands::Boards => run_boards(),
        Commands::Check(args) => run_check(args),
    }
}

fn load_board(board: &str) -> Result<BoardProfile, ExitCode> {
    BoardProfile::resolve(board).map_err(|e| {
        error!("{:#}", e);
        ExitCode::from(EXIT_CONFIG_ERROR)
    })
}

fn run_sim(args: RunArgs) -> ExitCode {
    let profile = match load_board(&args.board) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let config = SimulationConfig {
        nop_cycles: args.nop_cycles,
        delay_override: args.delay,
        clock_gating: !args.no_clock_gating,
        stop_on_fault: args.stop_on_fault,
    };

    let mut session = match Session::new(&profile, config) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut vcd = None;
    if let Some(path) = &args.vcd {
        let target = *session.target();
        let clock_en = session
            .bus()
            .peek(target.clock.register.addr())
            .is_some_and(|v| v & target.clock.mask == target.clock.mask);
        match vcd_trace::VcdObserver::new(path, target, session.led_level(), clock_en) {
            Ok(observer) => {
                info!("Writing VCD trace to {:?}", path);
                let observer = Arc::new(observer);
                session.add_observer(observer.clone());
                vcd = Some(observer);
            }
            Err(e) => {
                error!("Failed to create VCD file {:?}: {:#}", path, e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    info!(
        "Running board '{}' ({}) for {} toggles",
        profile.name, profile.chip, args.toggles
    );
    let summary = session.run(args.toggles);

    if let Some(err) = vcd.as_ref().and_then(|v| v.error()) {
        error!("VCD trace {:?} is incomplete: {}", args.vcd, err);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }

    if let Some(path) = &args.snapshot {
        let written = std::fs::File::create(path)
            .map_err(anyhow::Error::from)
            .and_then(|f| {
                serde_json::to_writer_pretty(f, &session.bus().snapshot()).map_err(Into::into)
            });
        if let Err(e) = written {
            error!("Failed to write snapshot {:?}: {:#}", path, e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    let passed = summary.passed();
    for fault in &summary.faults {
        error!("Bus fault: {}", fault);
    }
    info!(
        "Finished: {} toggles, {} delay iterations, {} cycles ({:?})",
        summary.toggles, summary.delay_iterations, summary.cycles, summary.stop_reason
    );

    if args.json {
        let report = RunReport {
            schema_version: RESULT_SCHEMA_VERSION,
            status: if passed { "pass" } else { "fail" },
            summary: &summary,
        };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => {
                error!("Failed to serialize run summary: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    if passed {
        ExitCode::from(EXIT_PASS)
    } else {
        if summary.led_pin.is_some_and(|pin| !pin.output) {
            error!("LED pin {} is not configured as an output", session.target().output.pin);
        }
        if summary.faults.is_empty() && !summary.levels.iter().any(|&l| l != summary.initial_level) {
            error!("LED output never changed level");
        }
        ExitCode::from(EXIT_CHECK_FAIL)
    }
}

fn run_registers(args: RegistersArgs) -> ExitCode {
    let profile = match load_board(&args.board) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let config = SimulationConfig::default().with_delay(0);
    let mut session = match Session::new(&profile, config) {
        Ok(s) => s,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    session.run(args.toggles);

    let target = *session.target();
    let rows = [
        ("clock", target.clock.register),
        ("mode", target.mode.register),
        ("output", target.output.register),
    ];
    for (label, register) in rows {
        match session.bus().peek(register.addr()) {
            Some(value) => println!("{:<8} {}  {}", label, register, args.format.format(value)),
            None => println!("{:<8} {}  <unmapped>", label, register),
        }
    }
    if let Some(pin) = session.led_pin() {
        println!(
            "{:<8} {:<10}  {} {}",
            "pin",
            target.output.pin,
            if pin.output { "output" } else { "input" },
            if pin.level { "high" } else { "low" }
        );
    }
    ExitCode::from(EXIT_PASS)
}

fn run_boards() -> ExitCode {
    for name in heartbeat_config::builtin_names() {
        match heartbeat_config::builtin(name) {
            Ok(Some(profile)) => {
                let output = profile.blink_target().output;
                println!(
                    "{:<14} {:<12} pin {:<2} @ {}",
                    profile.name, profile.chip, output.pin, output.register
                );
            }
            Ok(None) => {}
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }
    ExitCode::from(EXIT_PASS)
}

fn run_check(args: CheckArgs) -> ExitCode {
    let profile = match load_board(&args.board) {
        Ok(p) => p,
        Err(code) => return code,
    };
    // Layouts are only known to the simulator, so build the bus as well.
    let bus = match SystemBus::from_profile(&profile) {
        Ok(bus) => bus,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let target = profile.blink_target();
    info!(
        "Board profile '{}' is valid: {} peripherals, LED pin {} at {}",
        profile.name,
        bus.peripherals.len(),
        target.output.pin,
        target.output.register
    );
    ExitCode::from(EXIT_PASS)
}
