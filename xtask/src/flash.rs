//! xtask flash: build the demo, keep whatever fault record the board holds,
//! then download and run the new image.
//!
//! The demo clears `FAULT_RECORD` on every boot, so a record left by the
//! image being replaced is lost once the new one starts. Unless `--no-dump`
//! is given, the record is read over the probe first, decoded and, when
//! valid, saved next to the build output.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::decode;

const TARGET: &str = "thumbv7em-none-eabihf";

/// Where a record found on the board before flashing is kept.
pub(crate) const PRESERVED_RECORD: &str = "target/fault-record-before-flash.bin";

pub fn run(release: bool, dump: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };
    println!();
    println!("{}", format!("🔨 Building fault demo firmware ({mode} mode)...").cyan().bold());

    let start = Instant::now();
    let build = Command::new("cargo")
        .args(build_args(release))
        .output()
        .context("Failed to run cargo build")?;
    if !build.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    println!();

    if dump {
        preserve_record(release);
    }

    println!("{}", "📡 Flashing to STM32H7...".cyan().bold());
    println!("   {}", "RTT output follows; the boot report shows the record state".dimmed());
    let elf = decode::elf_path(release);
    let status = Command::new("probe-rs")
        .args(["run", "--chip", decode::CHIP, "--probe-index", "0"])
        .arg(&elf)
        .status()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;
    if !status.success() {
        anyhow::bail!("Flash failed - check that the probe is connected and the device is powered");
    }
    Ok(())
}

fn build_args(release: bool) -> Vec<&'static str> {
    let mut args = vec!["build", "-p", "firmware", "--target", TARGET, "--features", "hardware"];
    if release {
        args.push("--release");
    }
    args
}

/// Read and decode the record currently on the board. Failures only warn:
/// a blank board or a foreign image has nothing to keep.
fn preserve_record(release: bool) {
    match decode::read_target(release) {
        Ok(record) if record.is_valid() => {
            decode::print(&record);
            if let Err(e) = decode::save(&record, Path::new(PRESERVED_RECORD)) {
                eprintln!("{}", format!("  ⚠ {e:#}").yellow());
            }
        }
        Ok(_) => println!("   {}", "no fault record on the board".dimmed()),
        Err(e) => eprintln!("{}", format!("  ⚠ record not read: {e:#}").yellow()),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_build_targets_the_h7_with_hardware() {
        let args = build_args(true);
        assert_eq!(args.last(), Some(&"--release"));
        assert!(args.windows(2).any(|w| w == ["--target", TARGET]));
        assert!(args.windows(2).any(|w| w == ["--features", "hardware"]));
        assert!(!build_args(false).contains(&"--release"));
    }

    #[test]
    fn flashed_elf_is_the_one_dump_reads() {
        assert_eq!(decode::elf_path(false), format!("target/{TARGET}/debug/firmware"));
        assert!(PRESERVED_RECORD.starts_with("target/"));
    }
}
