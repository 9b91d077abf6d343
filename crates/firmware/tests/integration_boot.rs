//! Boot-time handling of the persistent record, from the firmware's side.
//!
//! Run with: cargo test -p firmware --test integration_boot
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
use fault::sink::{EventId, EventSink, Level};
use fault::{storage, Arch, FaultRecord, Variant};
use firmware::boot::{check_previous_fault, PreviousFault};
use firmware::FaultKind;

#[derive(Default)]
struct Events(Vec<(EventId, Level)>);

impl EventSink for Events {
    fn record(&mut self, id: EventId, level: Level, _params: [u32; 4]) {
        self.0.push((id, level));
    }
}

fn undefined_instruction() -> Processor<'static> {
    static FRAME: [u32; 8] = [1, 2, 3, 4, 12, 0x0800_0411, 0x0800_0520, 0x0100_0000];
    Processor {
        exc_return: 0xFFFF_FFF9,
        xpsr: 6,
        callee_saved: [0; 8],
        current: Bank {
            msp: 0x2001_FE00,
            cfsr: 1 << 16,
            ..Bank::default()
        },
        non_secure: Bank::default(),
        sfsr: 0,
        sfar: 0,
        stack: &FRAME,
    }
}

/// One test drives the shared static end to end so runs cannot interleave.
#[test]
fn boot_reports_then_clears_the_stored_record() {
    // Cold boot: arbitrary contents are rejected and cleared.
    let mut garbage = FaultRecord::from_words([0xA5A5_A5A5; fault::layout::RECORD_WORDS]);
    garbage.count = 7;
    storage::store(&garbage);
    let mut events = Events::default();
    assert_eq!(check_previous_fault(&storage::snapshot(), &mut events), PreviousFault::None);
    storage::clear();
    assert!(events.0.is_empty());

    // A fault: captured on top of the cleared record, found at the next boot.
    let mut record = storage::snapshot();
    emulate::capture(&mut record, &undefined_instruction(), Variant::new(Arch::V7M));
    storage::store(&record);
    assert!(storage::is_valid());

    let previous = check_previous_fault(&storage::snapshot(), &mut events);
    assert_eq!(
        previous,
        PreviousFault::Recorded {
            count: 1,
            exception: 6,
            kind: Some(FaultKind::Undefined),
        }
    );
    assert!(events.0.iter().any(|(id, level)| id.is_entry() && *level == Level::Error));
    storage::clear();
    assert!(!storage::is_valid());
    assert_eq!(storage::occurrence_count(), 0);

    // A capture interrupted before the magic store is ignored at boot.
    let mut partial = storage::snapshot();
    emulate::capture_until(&mut partial, &undefined_instruction(), Variant::new(Arch::V7M), Stage::Checksum);
    storage::store(&partial);
    assert_eq!(check_previous_fault(&storage::snapshot(), &mut Events::default()), PreviousFault::None);
    storage::clear();
}
