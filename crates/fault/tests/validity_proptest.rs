//! Property-based tests for record validity.
//! Any capture seals a valid record; any corruption or interruption does not.
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
use fault::layout::{CHECKSUM_START, OFS_MAGIC_NUMBER, RECORD_SIZE};
use fault::{Arch, FaultRecord, TrustZone, Variant};
use proptest::prelude::*;

fn variant_strategy() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::new(Arch::V6M)),
        Just(Variant::new(Arch::V7M)),
        Just(Variant::new(Arch::V8MBase)),
        Just(Variant::new(Arch::V8MMain)),
        Just(Variant::new(Arch::V81MMain)),
        Just(Variant::new(Arch::V8MBase).with_trustzone(TrustZone::Secure)),
        Just(Variant::new(Arch::V8MMain).with_trustzone(TrustZone::NonSecure)),
        Just(Variant::new(Arch::V81MMain).with_trustzone(TrustZone::Secure)),
    ]
}

fn bank_strategy() -> impl Strategy<Value = Bank> {
    (any::<[u32; 6]>(), any::<[u32; 5]>()).prop_map(|(a, b)| Bank {
        msp: a[0],
        psp: a[1],
        msplim: a[2],
        psplim: a[3],
        cfsr: a[4],
        hfsr: a[5],
        dfsr: b[0],
        mmfar: b[1],
        bfar: b[2],
        afsr: b[3],
        rfsr: b[4],
    })
}

/// Run one capture into `record` from arbitrary processor state.
fn captured(
    record: &mut FaultRecord,
    variant: Variant,
    exc_return: u32,
    current: Bank,
    non_secure: Bank,
    stack: &[u32],
    last: Stage,
) {
    let cpu = Processor {
        exc_return,
        xpsr: 3,
        callee_saved: [4, 5, 6, 7, 8, 9, 10, 11],
        current,
        non_secure,
        sfsr: 0x0000_0048,
        sfar: 0x1000_0000,
        stack,
    };
    emulate::capture_until(record, &cpu, variant, last);
}

proptest! {
    /// Every completed capture yields a valid record.
    #[test]
    fn capture_always_seals_valid_record(
        variant in variant_strategy(),
        exc_return in any::<u32>(),
        current in bank_strategy(),
        non_secure in bank_strategy(),
        stack in proptest::collection::vec(any::<u32>(), 0..20),
        prior_count in any::<u32>(),
    ) {
        let mut record = FaultRecord::ZERO;
        record.count = prior_count;
        captured(&mut record, variant, exc_return, current, non_secure, &stack, Stage::Sealed);
        prop_assert!(record.is_valid());
        prop_assert_eq!(record.count, prior_count.wrapping_add(1));
        prop_assert!(record.info.is_current_version());
    }

    /// Flipping any bit in the checksummed range invalidates the record.
    #[test]
    fn single_byte_flip_invalidates(
        variant in variant_strategy(),
        current in bank_strategy(),
        offset in CHECKSUM_START..RECORD_SIZE,
        mask in 1u8..=255u8,
    ) {
        let mut record = FaultRecord::ZERO;
        captured(&mut record, variant, 0xFFFF_FFF9, current, Bank::default(), &[1; 18], Stage::Sealed);
        let mut bytes = record.to_bytes();
        bytes[offset] ^= mask;
        let corrupted = FaultRecord::from_bytes(&bytes).unwrap();
        prop_assert!(!corrupted.is_valid(), "flip {:#04x} at {} went unnoticed", mask, offset);
    }

    /// A magic number that differs in any bit invalidates the record.
    #[test]
    fn magic_flip_invalidates(bit in 0usize..32) {
        let mut record = FaultRecord::ZERO;
        captured(&mut record, Variant::new(Arch::V7M), 0xFFFF_FFFD, Bank::default(), Bank::default(), &[], Stage::Sealed);
        let mut bytes = record.to_bytes();
        bytes[OFS_MAGIC_NUMBER + bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!FaultRecord::from_bytes(&bytes).unwrap().is_valid());
    }

    /// A capture cut short at any stage before the magic-number store is invalid,
    /// even on top of a previously valid record.
    #[test]
    fn interrupted_capture_is_invalid(
        variant in variant_strategy(),
        current in bank_strategy(),
        stage in prop_oneof![
            Just(Stage::Cleared),
            Just(Stage::LiveRegisters),
            Just(Stage::StateContext),
            Just(Stage::ExceptionContext),
            Just(Stage::FaultRegisters),
            Just(Stage::Checksum),
        ],
    ) {
        let mut record = FaultRecord::ZERO;
        captured(&mut record, variant, 0xFFFF_FFFD, current, Bank::default(), &[7; 18], Stage::Sealed);
        prop_assert!(record.is_valid());
        captured(&mut record, variant, 0xFFFF_FFFD, current, Bank::default(), &[7; 18], stage);
        prop_assert!(!record.is_valid());
        prop_assert_eq!(record.count, 2);
    }
}
