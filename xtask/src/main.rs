// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod decode;
mod doc;
mod flash;
mod sample;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Fault capture development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash the demo firmware to STM32H7 hardware via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
        /// Do not read the record left on the board before flashing
        #[arg(long)]
        no_dump: bool,
    },
    /// Check the fault crate for every architecture variant and the firmware build
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build host documentation plus the fault crate for every capture variant
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
    /// Decode a saved fault record (144-byte binary or hex words)
    Decode {
        /// Record file
        path: PathBuf,
    },
    /// Write a record produced by the host capture model, for trying out `decode`
    Sample {
        /// Processor state to capture
        #[arg(value_enum, default_value_t = sample::Preset::DivideByZero)]
        preset: sample::Preset,
        /// Output file for the 144-byte image
        #[arg(long, default_value = "fault-record.bin")]
        out: PathBuf,
    },
    /// Read FAULT_RECORD from the attached target and decode it
    Dump {
        /// Look the symbol up in the release ELF
        #[arg(short, long)]
        release: bool,
        /// Also save the raw 144 bytes to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release, no_dump } => flash::run(release, !no_dump),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open } => doc::run(open),
        Commands::Decode { path } => decode::run_file(&path),
        Commands::Sample { preset, out } => sample::run(preset, &out),
        Commands::Dump { release, out } => decode::run_dump(release, out.as_deref()),
    }
}
