//! Capture sequence behaviour across repeated faults and clears.
// Test file: unwrap/panic are the assertion mechanism; fixed-size frames are indexed directly.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
)]

use fault::emulate::{self, Bank, Processor, Stage};
use fault::layout::{INTEGRITY_SIGNATURE, RECORD_SIZE};
use fault::report::Report;
use fault::{Arch, Content, FaultRecord, Variant};

const FRAME: [u32; 8] = [0x10, 0x11, 0x12, 0x13, 0x1C, 0x0800_0401, 0x0800_0500, 0x0100_0000];

fn cpu() -> Processor<'static> {
    Processor {
        exc_return: 0xFFFF_FFF9,
        xpsr: 4,
        callee_saved: [4, 5, 6, 7, 8, 9, 10, 11],
        current: Bank {
            msp: 0x2000_2000,
            cfsr: (1 << 1) | (1 << 7),
            mmfar: 0x0000_0004,
            ..Bank::default()
        },
        non_secure: Bank::default(),
        sfsr: 0,
        sfar: 0,
        stack: &FRAME,
    }
}

#[test]
fn successive_captures_increment_count_by_one() {
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    let first = record.occurrence_count();
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    assert_eq!(record.occurrence_count(), first + 1);
    assert!(record.is_valid());
}

#[test]
fn clear_restarts_count_at_one() {
    let mut record = FaultRecord::ZERO;
    for _ in 0..3 {
        emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    }
    assert_eq!(record.occurrence_count(), 3);
    record.clear();
    assert!(!record.is_valid());
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    assert_eq!(record.occurrence_count(), 1);
}

#[test]
fn interrupted_capture_still_counts() {
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    emulate::capture_until(&mut record, &cpu(), Variant::new(Arch::V7M), Stage::StateContext);
    assert!(!record.is_valid());
    assert_eq!(record.occurrence_count(), 2);
    // Fields past the interruption point stay zero rather than stale.
    assert_eq!(record.cfsr, 0);
    assert_eq!(record.msp, 0);
}

#[test]
fn stale_sections_are_cleared_by_the_next_capture() {
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    assert!(record.content().contains(Content::STATE_CONTEXT));

    let mut broken = cpu();
    broken.current.msp = 0;
    emulate::capture(&mut record, &broken, Variant::new(Arch::V7M));
    assert!(!record.content().contains(Content::STATE_CONTEXT));
    assert_eq!(record.r[0], 0);
    assert_eq!(record.return_address, 0);
    // Live callee-saved registers are still stored.
    assert_eq!(record.r[4], 4);
}

#[test]
fn static_info_matches_variant() {
    for variant in [
        Variant::new(Arch::V6M),
        Variant::new(Arch::V7M),
        Variant::new(Arch::V8MBase),
        Variant::new(Arch::V8MMain),
        Variant::new(Arch::V81MMain),
    ] {
        let mut record = FaultRecord::ZERO;
        emulate::capture(&mut record, &cpu(), variant);
        let content = record.content();
        assert_eq!(content.contains(Content::FAULT_REGS), variant.arch.has_fault_regs());
        assert_eq!(content.contains(Content::LIMIT_REGS), variant.arch.is_armv8());
        assert_eq!(content.contains(Content::RAS_FAULT_REG), variant.arch.has_ras());
        assert!(!content.contains(Content::SECURE_FAULT_REGS));
        assert!(record.info.has(variant.static_content()));
    }
}

#[test]
fn armv8_signature_region_is_skipped_when_absent() {
    let mut stack = [0u32; 18];
    stack[0] = INTEGRITY_SIGNATURE ^ 1;
    stack[10..].copy_from_slice(&FRAME);
    let mut state = cpu();
    state.exc_return = 0xFFFF_FFD9;
    state.stack = &stack;
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &state, Variant::new(Arch::V8MMain));
    assert_eq!(record.integrity_signature, 0);
    assert_eq!(record.return_address, 0x0800_0500);
}

#[test]
fn dump_round_trips_through_bytes_and_report() {
    let mut record = FaultRecord::ZERO;
    emulate::capture(&mut record, &cpu(), Variant::new(Arch::V7M));
    let bytes = record.to_bytes();
    assert_eq!(bytes.len(), RECORD_SIZE);
    let parsed = FaultRecord::from_bytes(&bytes).unwrap();
    assert!(parsed.is_valid());

    let text = Report(&parsed).to_string();
    assert!(text.contains("MemManage (exception 4)"));
    assert!(text.contains("CFSR.DACCVIOL = 1: data access violation @ 0x00000004"));
    assert!(text.contains("  PC 0x08000500"));
}
