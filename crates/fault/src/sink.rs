//! Forwarding a decoded record to a structured event logger.
//!
//! The logger only has to accept `(id, level, [u32; 4])`. Event ids carry the
//! event kind in the high byte; fault entries encode the register and field
//! bit so a host tool can map them back to [`decode::rules`](crate::decode::rules).

use crate::decode::{self, FaultEntry, RegisterValue};
use crate::record::FaultRecord;

/// Numeric event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventId(pub u16);

impl EventId {
    /// Count, version, exception number, fault mode.
    pub const SUMMARY: Self = Self(0x0100);
    /// EXC_xPSR, EXC_RETURN, MSP, PSP.
    pub const EXCEPTION_CONTEXT: Self = Self(0x0101);
    /// MSPLIM, PSPLIM.
    pub const STACK_LIMITS: Self = Self(0x0102);
    /// R0..R3, R4..R7, R8..R11, then R12, LR, PC, xPSR.
    pub const REGISTERS: [Self; 4] = [Self(0x0200), Self(0x0201), Self(0x0202), Self(0x0203)];
    const ENTRY_BASE: u16 = 0x1000;

    /// Event id of a decoded status field.
    pub const fn entry(entry: &FaultEntry) -> Self {
        Self(Self::ENTRY_BASE | (entry.register as u16) << 5 | entry.bit as u16)
    }

    /// Whether this id belongs to a decoded status field.
    pub const fn is_entry(self) -> bool {
        self.0 & 0xF000 == Self::ENTRY_BASE
    }
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Fault cause.
    Error,
    /// Record-level facts.
    Info,
    /// Register contents.
    Detail,
}

/// Consumer of fault events.
pub trait EventSink {
    /// Accept one event.
    fn record(&mut self, id: EventId, level: Level, params: [u32; 4]);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, id: EventId, level: Level, params: [u32; 4]) {
        (**self).record(id, level, params);
    }
}

/// Forward a record to `sink`.
///
/// Emits the summary, the exception context, stack limits when present, the
/// general registers in groups of four when the state context was captured,
/// then one event per decoded entry with params
/// `[value, address, address present, category]`.
pub fn emit(record: &FaultRecord, sink: &mut impl EventSink) {
    let summary = decode::summary(record);
    let (major, minor) = summary.version;
    sink.record(
        EventId::SUMMARY,
        Level::Info,
        [
            summary.count,
            u32::from(major) << 8 | u32::from(minor),
            u32::from(summary.exception),
            summary.security.map_or(0, |s| 1 + s as u32),
        ],
    );

    let regs = decode::registers(record);
    let ctx = regs.context;
    sink.record(
        EventId::EXCEPTION_CONTEXT,
        Level::Info,
        [ctx.exc_xpsr, ctx.exc_return, ctx.msp, ctx.psp],
    );
    if let Some(limits) = regs.limits {
        sink.record(EventId::STACK_LIMITS, Level::Detail, [limits.msplim, limits.psplim, 0, 0]);
    }

    let known = regs.general.map(RegisterValue::known);
    if known.iter().all(Option::is_some) {
        let values = known.map(|v| v.unwrap_or_default());
        for (id, group) in EventId::REGISTERS.into_iter().zip(values.chunks_exact(4)) {
            let mut params = [0u32; 4];
            params.copy_from_slice(group);
            sink.record(id, Level::Detail, params);
        }
    }

    for entry in decode::decode(record) {
        sink.record(
            EventId::entry(&entry),
            Level::Error,
            [
                entry.value,
                entry.address.unwrap_or(0),
                u32::from(entry.address.is_some()),
                entry.category as u32,
            ],
        );
    }
}

/// Logs every event through defmt at the matching level.
#[cfg(feature = "defmt")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefmtSink;

#[cfg(feature = "defmt")]
impl EventSink for DefmtSink {
    fn record(&mut self, id: EventId, level: Level, params: [u32; 4]) {
        match level {
            Level::Error => defmt::error!("fault event {=u16:#06x}: {=[u32]:#010x}", id.0, params.as_slice()),
            Level::Info => defmt::info!("fault event {=u16:#06x}: {=[u32]:#010x}", id.0, params.as_slice()),
            Level::Detail => defmt::debug!("fault event {=u16:#06x}: {=[u32]:#010x}", id.0, params.as_slice()),
        }
    }
}
