//! xtask sample: synthetic fault records from the host capture model.
//!
//! Each preset feeds a processor snapshot through `fault::emulate`, the same
//! sequence the firmware capture routine runs, and writes the resulting
//! 144-byte image. Useful for trying `decode` without a board attached.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use fault::emulate::{self, Bank, Processor, Stage};
use fault::layout::INTEGRITY_SIGNATURE;
use fault::{Arch, FaultRecord, TrustZone, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Armv7-M thread on PSP, integer division by zero
    DivideByZero,
    /// Armv7-M bus fault while stacking, state context lost
    StackingError,
    /// Armv8-M Mainline Secure image, Non-secure code hits the SAU
    SecureFault,
    /// Armv8-M Mainline, additional state context with integrity signature
    AdditionalContext,
    /// Capture reset before the magic number store
    Interrupted,
}

impl Preset {
    fn name(self) -> &'static str {
        match self {
            Self::DivideByZero => "divide-by-zero",
            Self::StackingError => "stacking-error",
            Self::SecureFault => "secure-fault",
            Self::AdditionalContext => "additional-context",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Basic frame at the faulting stack pointer: R0-R3, R12, LR, PC, xPSR.
const FRAME: [u32; 8] = [
    0x0000_0001,
    0x0000_0000,
    0x2000_1F40,
    0x0000_0010,
    0x0000_000C,
    0x0800_0A1B,
    0x0800_0B40,
    0x6100_0000,
];

const THREAD_PSP: u32 = 0x2000_1F00;

/// Entry point for `xtask sample`.
pub fn run(preset: Preset, out: &Path) -> Result<()> {
    let record = build(preset);
    std::fs::write(out, record.to_bytes()).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "{}",
        format!(
            "✓ Wrote {} record ({}) to {}",
            preset.name(),
            variant(preset).arch.name(),
            out.display()
        )
        .green()
    );
    println!(
        "   {}",
        format!("Decode with 'cargo xtask decode {}'", out.display()).dimmed()
    );
    Ok(())
}

/// Architecture and TrustZone configuration the preset is captured on.
pub(crate) fn variant(preset: Preset) -> Variant {
    match preset {
        Preset::DivideByZero | Preset::StackingError | Preset::Interrupted => Variant::new(Arch::V7M),
        Preset::SecureFault => Variant::new(Arch::V8MMain).with_trustzone(TrustZone::Secure),
        Preset::AdditionalContext => Variant::new(Arch::V8MMain),
    }
}

pub(crate) fn build(preset: Preset) -> FaultRecord {
    let [r0, r1, r2, r3, r12, lr, pc, xpsr] = FRAME;
    let extended = [
        INTEGRITY_SIGNATURE,
        0,
        0x4000,
        0x4001,
        0x4002,
        0x4003,
        0x4004,
        0x4005,
        0x4006,
        0x4007,
        r0,
        r1,
        r2,
        r3,
        r12,
        lr,
        pc,
        xpsr,
    ];

    let thread = Bank { psp: THREAD_PSP, msp: 0x2001_FFC0, ..Bank::default() };
    let mut cpu = Processor {
        exc_return: 0xFFFF_FFFD,
        xpsr: 6,
        callee_saved: [0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0, 0xB0],
        current: thread,
        non_secure: Bank::default(),
        sfsr: 0,
        sfar: 0,
        stack: &FRAME,
    };
    let mut last = Stage::Sealed;

    match preset {
        Preset::DivideByZero => cpu.current.cfsr = 1 << 25,
        Preset::StackingError => {
            cpu.xpsr = 5;
            // STKERR, BFARVALID clear: imprecise stacking fault
            cpu.current.cfsr = 1 << 12;
            cpu.current.psp = 0x2000_0004;
        }
        Preset::SecureFault => {
            cpu.xpsr = 7;
            // Non-secure stack, Thread, PSP, taken to Secure
            cpu.exc_return = 0xFFFF_FFBD;
            cpu.non_secure = thread;
            cpu.current = Bank { msp: 0x3000_7F00, ..Bank::default() };
            // AUVIOL, SFARVALID
            cpu.sfsr = 0x48;
            cpu.sfar = 0x1000_0000;
        }
        Preset::AdditionalContext => {
            cpu.xpsr = 4;
            // DCRS clear, Secure stack, PSP
            cpu.exc_return = 0xFFFF_FFDD;
            cpu.stack = &extended;
            // DACCVIOL, MMARVALID
            cpu.current.cfsr = (1 << 1) | (1 << 7);
            cpu.current.mmfar = 0x0000_0004;
            cpu.current.psplim = 0x2000_1000;
        }
        Preset::Interrupted => {
            cpu.current.cfsr = 1 << 25;
            last = Stage::Checksum;
        }
    }

    let mut record = FaultRecord::ZERO;
    emulate::capture_until(&mut record, &cpu, variant(preset), last);
    record
}
