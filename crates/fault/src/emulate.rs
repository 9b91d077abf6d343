//! Reference model of the capture sequence.
//!
//! Runs the same steps as the `FaultCapture` routine against an explicit
//! processor snapshot instead of live hardware, so the sequence can be
//! exercised on the host. [`Stage`] lets a caller stop the sequence early to
//! model a capture that was cut short by a reset.

#![deny(missing_docs)]

use crate::exc_return::{ExcReturn, StackPointer};
use crate::info::Content;
use crate::layout::INTEGRITY_SIGNATURE;
use crate::record::FaultRecord;
use crate::variant::Variant;

/// Stack pointers, limits and SCB fault registers of one security state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bank {
    /// Main stack pointer.
    pub msp: u32,
    /// Process stack pointer.
    pub psp: u32,
    /// MSP limit (Armv8-M).
    pub msplim: u32,
    /// PSP limit (Armv8-M).
    pub psplim: u32,
    /// Configurable Fault Status Register.
    pub cfsr: u32,
    /// HardFault Status Register.
    pub hfsr: u32,
    /// Debug Fault Status Register.
    pub dfsr: u32,
    /// MemManage Fault Address Register.
    pub mmfar: u32,
    /// BusFault Address Register.
    pub bfar: u32,
    /// Auxiliary Fault Status Register.
    pub afsr: u32,
    /// RAS Fault Status Register (Armv8.1-M).
    pub rfsr: u32,
}

/// Processor state on entry to the capture routine.
#[derive(Debug, Clone, Copy)]
pub struct Processor<'a> {
    /// LR on entry.
    pub exc_return: u32,
    /// Current xPSR; the low 9 bits hold the active exception number.
    pub xpsr: u32,
    /// Live R4..R11.
    pub callee_saved: [u32; 8],
    /// Registers of the state the capture code runs in.
    pub current: Bank,
    /// Non-secure aliases, reachable from a Secure build only.
    pub non_secure: Bank,
    /// SecureFault Status Register (Secure SCB).
    pub sfsr: u32,
    /// SecureFault Address Register (Secure SCB).
    pub sfar: u32,
    /// Memory starting at the stack pointer selected by EXC_RETURN. Words past
    /// the end read as zero.
    pub stack: &'a [u32],
}

/// Capture steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Count saved, record zeroed, count and info written back.
    Cleared,
    /// Live R4..R11 stored.
    LiveRegisters,
    /// Stack selected, validated and the state context copied.
    StateContext,
    /// EXC_xPSR, EXC_RETURN, stack pointers and limits stored.
    ExceptionContext,
    /// Fault status registers stored.
    FaultRegisters,
    /// Checksum stored.
    Checksum,
    /// Magic number stored: the record is complete.
    Sealed,
}

impl Processor<'_> {
    fn stacked(&self, index: usize) -> u32 {
        self.stack.get(index).copied().unwrap_or(0)
    }
}

/// Run the full capture sequence.
pub fn capture(record: &mut FaultRecord, cpu: &Processor<'_>, variant: Variant) {
    capture_until(record, cpu, variant, Stage::Sealed);
}

/// Run the capture sequence up to and including `last`.
pub fn capture_until(record: &mut FaultRecord, cpu: &Processor<'_>, variant: Variant, last: Stage) {
    let count = record.count;
    *record = FaultRecord::ZERO;
    record.count = count.wrapping_add(1);
    record.info = variant.initial_info();
    if last == Stage::Cleared {
        return;
    }

    let [r4, r5, r6, r7, r8, r9, r10, r11] = cpu.callee_saved;
    record.r[4..12].copy_from_slice(&[r4, r5, r6, r7, r8, r9, r10, r11]);
    if last == Stage::LiveRegisters {
        return;
    }

    let lr = ExcReturn(cpu.exc_return);
    let use_ns_alias = variant.is_secure() && !lr.secure_stack();
    let bank = if use_ns_alias { &cpu.non_secure } else { &cpu.current };
    if variant.is_secure() && !use_ns_alias {
        record.info = record.info.with(Content::TZ_FAULT_MODE);
    }

    let sp = match lr.stack() {
        StackPointer::Main => bank.msp,
        StackPointer::Process => bank.psp,
    };
    let stacking_fault =
        variant.arch.has_fault_regs() && bank.cfsr & variant.stacking_error_mask() != 0;
    if sp != 0 && !stacking_fault {
        copy_state_context(record, cpu, variant, lr);
    }
    if last == Stage::StateContext {
        return;
    }

    record.exc_xpsr = cpu.xpsr;
    record.exc_return = cpu.exc_return;
    record.msp = bank.msp;
    record.psp = bank.psp;
    // Non-secure Baseline has no limit registers.
    let limits_exist = !(use_ns_alias && !variant.arch.is_armv8_main());
    if variant.arch.is_armv8() && limits_exist {
        record.msplim = bank.msplim;
        record.psplim = bank.psplim;
        record.info = record.info.with(Content::LIMIT_REGS);
    }
    if last == Stage::ExceptionContext {
        return;
    }

    if variant.arch.has_fault_regs() {
        record.cfsr = bank.cfsr;
        record.hfsr = bank.hfsr;
        record.dfsr = bank.dfsr;
        record.mmfar = bank.mmfar;
        record.bfar = bank.bfar;
        record.afsr = bank.afsr;
        record.info = record.info.with(Content::FAULT_REGS);
        if variant.arch.has_ras() {
            record.rfsr = bank.rfsr;
            record.info = record.info.with(Content::RAS_FAULT_REG);
        }
        if variant.arch.is_armv8_main() && variant.is_secure() {
            record.sfsr = cpu.sfsr;
            record.sfar = cpu.sfar;
            record.info = record.info.with(Content::SECURE_FAULT_REGS);
        }
    }
    if last == Stage::FaultRegisters {
        return;
    }

    record.crc32 = record.checksum();
    if last == Stage::Checksum {
        return;
    }

    record.magic_number = crate::layout::MAGIC_NUMBER;
}

fn copy_state_context(record: &mut FaultRecord, cpu: &Processor<'_>, variant: Variant, lr: ExcReturn) {
    let mut frame = 0;
    if variant.arch.is_armv8() && lr.additional_context_stacked() {
        // Integrity signature, reserved word, R4..R11.
        if cpu.stacked(0) == INTEGRITY_SIGNATURE {
            record.integrity_signature = INTEGRITY_SIGNATURE;
            for (i, reg) in record.r[4..12].iter_mut().enumerate() {
                *reg = cpu.stacked(2 + i);
            }
        }
        frame = 10;
    }

    for (i, reg) in record.r[0..4].iter_mut().enumerate() {
        *reg = cpu.stacked(frame + i);
    }
    record.r[12] = cpu.stacked(frame + 4);
    record.lr = cpu.stacked(frame + 5);
    record.return_address = cpu.stacked(frame + 6);
    record.xpsr = cpu.stacked(frame + 7);
    record.info = record.info.with(Content::STATE_CONTEXT);
}
