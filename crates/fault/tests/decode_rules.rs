//! Decoder behaviour against hand-built records.
// Test file: unwrap/panic are the assertion mechanism; fixed-size frames are indexed directly.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
)]

use fault::decode::{self, rules::Register, Category, RegisterValue, Security};
use fault::emulate::{self, Bank, Processor};
use fault::{Arch, Content, FaultRecord, Info, TrustZone, Variant};

fn with_fault_regs(cfsr: u32) -> FaultRecord {
    let mut record = FaultRecord::ZERO;
    record.count = 1;
    record.info = Info::new(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
    record.cfsr = cfsr;
    record.seal();
    record
}

fn names(record: &FaultRecord) -> Vec<(Category, &'static str)> {
    decode::decode(record).map(|e| (e.category, e.name)).collect()
}

#[test]
fn divbyzero_and_unaligned_are_usage_faults_only() {
    let record = with_fault_regs(0x0300_0000);
    assert_eq!(
        names(&record),
        [(Category::UsageFault, "UNALIGNED"), (Category::UsageFault, "DIVBYZERO")]
    );
}

#[test]
fn cfsr_0x00020100_is_invstate_and_ibuserr() {
    let record = with_fault_regs(0x0002_0100);
    assert_eq!(
        names(&record),
        [(Category::BusFault, "IBUSERR"), (Category::UsageFault, "INVSTATE")]
    );
}

#[test]
fn fault_registers_absent_yields_no_entries() {
    let mut record = FaultRecord::ZERO;
    record.info = Info::new(Content::FAULT_REGS);
    record.cfsr = u32::MAX;
    record.hfsr = u32::MAX;
    record.dfsr = u32::MAX;
    record.afsr = u32::MAX;
    record.seal();
    assert!(record.is_valid());
    assert_eq!(decode::decode(&record).count(), 0);

    // Registers exist but were not captured.
    record.info = Info::new(Content::FAULT_REGS_EXIST);
    record.seal();
    assert_eq!(decode::decode(&record).count(), 0);
}

#[test]
fn secure_and_ras_registers_follow_their_flags() {
    let mut record = with_fault_regs(0);
    record.sfsr = (1 << 3) | (1 << 6);
    record.sfar = 0x3000_0040;
    record.rfsr = 0x8005_0002;
    assert_eq!(decode::decode(&record).count(), 0);

    record.info = record.info.with(Content::SECURE_FAULT_REGS | Content::RAS_FAULT_REG);
    let entries: Vec<_> = decode::decode(&record).collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].register, Register::Sfsr);
    assert_eq!(entries[0].name, "AUVIOL");
    assert_eq!(entries[0].address, Some(0x3000_0040));
    assert_eq!((entries[1].name, entries[1].value), ("UET", 2));
    assert_eq!((entries[2].name, entries[2].value), ("IS", 5));
}

#[test]
fn hfsr_dfsr_and_afsr_entries() {
    let mut record = with_fault_regs(0);
    record.hfsr = (1 << 30) | (1 << 1);
    record.dfsr = 1 << 1;
    record.afsr = 0x55;
    let entries: Vec<_> = decode::decode(&record).map(|e| (e.name, e.value)).collect();
    assert_eq!(entries, [("VECTTBL", 1), ("FORCED", 1), ("BKPT", 1), ("AFSR", 0x55)]);
}

#[test]
fn null_stack_pointer_leaves_registers_unknown() {
    let cpu = Processor {
        exc_return: 0xFFFF_FFFD,
        xpsr: 3,
        callee_saved: [0xAA; 8],
        current: Bank {
            msp: 0x2000_1000,
            psp: 0,
            cfsr: 1 << 25,
            ..Bank::default()
        },
        non_secure: Bank::default(),
        sfsr: 0,
        sfar: 0,
        stack: &[0x1234; 8],
    };
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu, Variant::new(Arch::V7M));
    assert!(record.is_valid());

    let regs = decode::registers(&record);
    assert!(regs.general.iter().all(|r| *r == RegisterValue::Unknown));
    assert_eq!(regs.context.psp, 0);

    // The PC-attributed entry carries no address either.
    let entry = decode::decode(&record).next();
    assert_eq!(entry.map(|e| (e.name, e.address)), Some(("DIVBYZERO", None)));
    assert_eq!(decode::summary(&record).pc, None);
}

#[test]
fn captured_context_is_known() {
    let frame = [0, 1, 2, 3, 12, 0x0800_0101, 0x0800_0200, 0x2100_0000];
    let cpu = Processor {
        exc_return: 0xFFFF_FFF9,
        xpsr: 6,
        callee_saved: [4, 5, 6, 7, 8, 9, 10, 11],
        current: Bank {
            msp: 0x2000_1000,
            cfsr: 1 << 16,
            ..Bank::default()
        },
        non_secure: Bank::default(),
        sfsr: 0,
        sfar: 0,
        stack: &frame,
    };
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu, Variant::new(Arch::V7M));

    let regs = decode::registers(&record);
    let pc = regs.named().find(|(name, _)| *name == "PC").map(|(_, v)| v);
    assert_eq!(pc, Some(RegisterValue::Known(0x0800_0200)));
    assert_eq!(regs.general[7], RegisterValue::Known(7));

    let entry = decode::decode(&record).next();
    assert_eq!(entry.map(|e| (e.name, e.address)), Some(("UNDEFINSTR", Some(0x0800_0200))));

    let summary = decode::summary(&record);
    assert_eq!(summary.exception_name, "UsageFault");
    assert_eq!(summary.security, None);
    assert_eq!(summary.pc, Some(0x0800_0200));
}

#[test]
fn non_secure_fault_reported_from_secure_image() {
    let cpu = Processor {
        exc_return: 0xFFFF_FFBC,
        xpsr: 7,
        callee_saved: [0; 8],
        current: Bank::default(),
        non_secure: Bank {
            psp: 0x2800_0400,
            ..Bank::default()
        },
        sfsr: (1 << 3) | (1 << 6),
        sfar: 0x1000_0000,
        stack: &[0; 8],
    };
    let variant = Variant::new(Arch::V8MMain).with_trustzone(TrustZone::Secure);
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu, variant);

    let summary = decode::summary(&record);
    assert_eq!(summary.exception_name, "SecureFault");
    assert_eq!(summary.security, Some(Security::NonSecure));
    let entry = decode::decode(&record).next();
    assert_eq!(entry.map(|e| (e.category, e.address)), Some((Category::SecureFault, Some(0x1000_0000))));
}
