//! Boot sequence for the fault demo.
//!
//! Initialization order (MUST be respected):
//!   1. Read the fault record left by the previous run, forward it, clear it
//!   2. Enable the configurable faults and the divide-by-zero trap
//!   3. Initialise the HAL and arm the watchdog
//!   4. Start the executor and wait for fault requests
//!
//! Step 1 must run before anything that could fault again: a second capture
//! would overwrite the record before it was reported.

use fault::sink::{self, EventSink};
use fault::FaultRecord;

use crate::inject::FaultKind;

/// Ordered list of boot sequence steps, asserted by tests.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. Fault record: validate, forward to the event sink, clear",
    "2. Fault enables: SHCSR MemManage/BusFault/UsageFault, CCR.DIV_0_TRP",
    "3. HAL init + IWDG watchdog",
    "4. Executor: wait for fault requests",
];

/// IWDG timeout. The main loop wakes at least once per second to pet it.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

/// IWDG timeout in the unit `IndependentWatchdog::new` takes.
pub const fn watchdog_timeout_us() -> u32 {
    WATCHDOG_TIMEOUT_MS.saturating_mul(1_000)
}

/// What the previous run left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreviousFault {
    /// No valid record: cold boot, clean reset, or an interrupted capture.
    None,
    /// A complete record was found and forwarded.
    Recorded {
        /// Faults captured since the record was last cleared.
        count: u32,
        /// Exception number the fault was taken as.
        exception: u16,
        /// Injected fault the record matches, if any.
        kind: Option<FaultKind>,
    },
}

impl PreviousFault {
    /// Kind of the injected fault that caused the last reset.
    pub const fn kind(self) -> Option<FaultKind> {
        match self {
            Self::None => None,
            Self::Recorded { kind, .. } => kind,
        }
    }
}

/// Forward `record` to `out` when it is valid.
///
/// Does not clear anything; the caller owns the storage.
pub fn check_previous_fault(record: &FaultRecord, out: &mut impl EventSink) -> PreviousFault {
    if !record.is_valid() {
        return PreviousFault::None;
    }
    sink::emit(record, out);
    PreviousFault::Recorded {
        count: record.occurrence_count(),
        exception: fault::decode::summary(record).exception,
        kind: FaultKind::identify(record),
    }
}

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Boot steps that touch the persistent record.

    use super::{check_previous_fault, PreviousFault};
    use fault::sink::DefmtSink;
    use fault::storage;
    use fault::Variant;

    /// Step 1: report the stored record through defmt, then clear it.
    ///
    /// An invalid record (power-on garbage or a capture cut short) is cleared
    /// as well, so the next capture starts from a zero count.
    pub fn take_previous_fault() -> PreviousFault {
        defmt::info!("fault capture for {=str}", Variant::TARGET.arch.name());
        let record = storage::snapshot();
        let previous = check_previous_fault(&record, &mut DefmtSink);
        match previous {
            PreviousFault::None => defmt::info!("no fault record"),
            PreviousFault::Recorded { count, exception, .. } => defmt::error!(
                "fault record: count={=u32} exception={=u16} ({=str})",
                count,
                exception,
                fault::decode::exception_name(exception)
            ),
        }
        storage::clear();
        previous
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use fault::emulate::{self, Bank, Processor};
    use fault::sink::{EventId, Level};
    use fault::{Arch, Variant};

    #[derive(Default)]
    struct Collect(Vec<EventId>);

    impl EventSink for Collect {
        fn record(&mut self, id: EventId, _level: Level, _params: [u32; 4]) {
            self.0.push(id);
        }
    }

    #[test]
    fn invalid_record_is_not_forwarded() {
        let mut events = Collect::default();
        let previous = check_previous_fault(&FaultRecord::ZERO, &mut events);
        assert_eq!(previous, PreviousFault::None);
        assert!(events.0.is_empty());
    }

    #[test]
    fn captured_divide_by_zero_is_identified() {
        let frame = [0, 0, 0, 0, 0, 0x0800_0201, 0x0800_0300, 0x0100_0000];
        let cpu = Processor {
            exc_return: 0xFFFF_FFF9,
            xpsr: 6,
            callee_saved: [0; 8],
            current: Bank {
                msp: 0x2001_FF00,
                cfsr: 1 << 25,
                ..Bank::default()
            },
            non_secure: Bank::default(),
            sfsr: 0,
            sfar: 0,
            stack: &frame,
        };
        let mut record = FaultRecord::ZERO;
        emulate::capture(&mut record, &cpu, Variant::new(Arch::V7M));

        let mut events = Collect::default();
        let previous = check_previous_fault(&record, &mut events);
        assert_eq!(
            previous,
            PreviousFault::Recorded {
                count: 1,
                exception: 6,
                kind: Some(FaultKind::DivideByZero),
            }
        );
        assert_eq!(events.0[0], EventId::SUMMARY);
        assert!(events.0.last().is_some_and(|id| id.is_entry()));
        assert_eq!(FaultKind::after(previous.kind()), FaultKind::Undefined);
    }

    #[test]
    fn record_check_comes_before_fault_enables() {
        let steps = BOOT_SEQUENCE_STEPS;
        let record = steps.iter().position(|s| s.contains("Fault record"));
        let enables = steps.iter().position(|s| s.contains("Fault enables"));
        assert_eq!(record, Some(0));
        assert!(record < enables);
    }

    #[test]
    fn watchdog_timeout_in_microseconds() {
        assert_eq!(watchdog_timeout_us(), 8_000_000);
    }
}
