//! xtask decode / dump: turn a fault record from a file or a live target into text.
//!
//! `decode` accepts either the raw 144-byte image or 36 little-endian words in
//! hex, as printed by `probe-rs read b32`. `dump` looks `FAULT_RECORD` up in
//! the firmware ELF, reads it over the debug probe and decodes it in place.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fault::layout::{MAGIC_NUMBER, RECORD_SIZE, RECORD_WORDS};
use fault::report::Report;
use fault::FaultRecord;

pub(crate) const CHIP: &str = "STM32H743ZITx";
const SYMBOL: &str = "FAULT_RECORD";

/// Entry point for `xtask decode`.
pub fn run_file(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let record = load(&bytes)?;
    print(&record);
    Ok(())
}

/// Entry point for `xtask dump`.
pub fn run_dump(release: bool, out: Option<&Path>) -> Result<()> {
    let record = read_target(release)?;
    if let Some(path) = out {
        save(&record, path)?;
    }
    print(&record);
    Ok(())
}

/// Firmware ELF produced by `cargo build -p firmware --features hardware`.
pub(crate) fn elf_path(release: bool) -> String {
    let mode = if release { "release" } else { "debug" };
    format!("target/thumbv7em-none-eabihf/{mode}/firmware")
}

/// Locate `FAULT_RECORD` in the ELF and read it from the attached target.
pub(crate) fn read_target(release: bool) -> Result<FaultRecord> {
    let elf = elf_path(release);
    let nm = Command::new("arm-none-eabi-nm")
        .arg(&elf)
        .output()
        .context("Failed to run arm-none-eabi-nm. Is the Arm GNU toolchain installed?")?;
    if !nm.status.success() {
        bail!("arm-none-eabi-nm failed: {}", String::from_utf8_lossy(&nm.stderr));
    }
    let address = symbol_address(&String::from_utf8_lossy(&nm.stdout), SYMBOL)
        .with_context(|| format!("{SYMBOL} not found in {elf}"))?;
    println!("{}", format!("📡 Reading {SYMBOL} at 0x{address:08X}...").cyan().bold());

    let read = Command::new("probe-rs")
        .args(["read", "--chip", CHIP, "b32"])
        .arg(format!("0x{address:08X}"))
        .arg(RECORD_WORDS.to_string())
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;
    if !read.status.success() {
        bail!("probe-rs read failed: {}", String::from_utf8_lossy(&read.stderr));
    }

    record_from_words(&parse_words(&String::from_utf8_lossy(&read.stdout))?)
}

pub(crate) fn save(record: &FaultRecord, path: &Path) -> Result<()> {
    std::fs::write(path, record.to_bytes()).with_context(|| format!("writing {}", path.display()))?;
    println!("   {}", format!("saved to {}", path.display()).dimmed());
    Ok(())
}

/// Parse a record file: raw image if exactly [`RECORD_SIZE`] bytes, hex words otherwise.
pub(crate) fn load(bytes: &[u8]) -> Result<FaultRecord> {
    if bytes.len() == RECORD_SIZE {
        return FaultRecord::from_bytes(bytes).map_err(|e| anyhow::anyhow!("{e}"));
    }
    let text = std::str::from_utf8(bytes).context("record file is neither a 144-byte image nor text")?;
    record_from_words(&parse_words(text)?)
}

/// Hex words separated by whitespace or commas. `0x` prefixes and `_`
/// separators are accepted; tokens ending in `:` (address columns) are skipped.
pub(crate) fn parse_words(text: &str) -> Result<Vec<u32>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty() && !t.ends_with(':'))
        .map(|t| {
            let digits = t.trim_start_matches("0x").trim_start_matches("0X").replace('_', "");
            u32::from_str_radix(&digits, 16).with_context(|| format!("not a hex word: `{t}`"))
        })
        .collect()
}

pub(crate) fn record_from_words(words: &[u32]) -> Result<FaultRecord> {
    let words: [u32; RECORD_WORDS] = words
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected {RECORD_WORDS} words, got {}", words.len()))?;
    Ok(FaultRecord::from_words(words))
}

/// Address of `symbol` in `nm` output (`<addr> <type> <name>` lines).
pub(crate) fn symbol_address(nm_output: &str, symbol: &str) -> Option<u32> {
    nm_output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let addr = parts.next()?;
        let name = parts.nth(1)?;
        (name == symbol).then(|| u32::from_str_radix(addr, 16).ok()).flatten()
    })
}

pub(crate) fn print(record: &FaultRecord) {
    println!();
    if record.is_valid() {
        println!("{}", "✓ Valid fault record".green().bold());
    } else {
        println!("{}", "✗ No valid fault record".yellow().bold());
        let magic = if record.magic_number == MAGIC_NUMBER { "ok" } else { "missing" };
        println!(
            "   {}",
            format!(
                "magic {magic}, crc stored 0x{:08X} computed 0x{:08X}",
                record.crc32,
                record.checksum()
            )
            .dimmed()
        );
        println!();
        return;
    }
    println!();
    print!("{}", Report(record));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use fault::{Content, Info};
    use std::io::Write;

    fn sample() -> FaultRecord {
        let mut record = FaultRecord::ZERO;
        record.count = 2;
        record.info = Info::new(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
        record.exc_xpsr = 5;
        record.cfsr = (1 << 9) | (1 << 15);
        record.bfar = 0x0010_0000;
        record.seal();
        record
    }

    #[test]
    fn loads_binary_image() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample().to_bytes()).unwrap();
        let bytes = std::fs::read(file.path()).unwrap();
        let record = load(&bytes).unwrap();
        assert_eq!(record, sample());
        assert!(record.is_valid());
    }

    #[test]
    fn loads_probe_rs_word_listing() {
        let words: Vec<String> = sample().to_words().iter().map(|w| format!("{w:08x}")).collect();
        let (first, rest) = words.split_at(4);
        let text = format!("0x20000400: {}\n0x20000410: {}\n", first.join(" "), rest.join(" "));
        let record = load(text.as_bytes()).unwrap();
        assert_eq!(record, sample());
    }

    #[test]
    fn rejects_wrong_word_count() {
        let err = load(b"0x1 0x2 0x3").unwrap_err();
        assert!(err.to_string().contains("expected 36 words, got 3"));
    }

    #[test]
    fn rejects_non_hex_token() {
        assert!(parse_words("5274_6c46 zz").is_err());
        assert_eq!(parse_words("0x5274_6C46,1").unwrap(), [0x5274_6C46, 1]);
    }

    #[test]
    fn finds_symbol_in_nm_listing() {
        let nm = "08000400 T FaultCapture\n20000000 B FAULT_RECORD\n20000090 b other\n";
        assert_eq!(symbol_address(nm, "FAULT_RECORD"), Some(0x2000_0000));
        assert_eq!(symbol_address(nm, "FaultExit"), None);
    }

    #[test]
    fn report_names_the_bus_fault() {
        let text = Report(&sample()).to_string();
        assert!(text.contains("BusFault (exception 5)"));
        assert!(text.contains("CFSR.PRECISERR = 1: precise data bus error @ 0x00100000"));
    }
}
