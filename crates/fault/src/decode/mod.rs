//! Decoder: turns a valid record into named diagnostic entries.
//!
//! Everything here is a pure function of the record. Callers gate on
//! [`FaultRecord::is_valid`] first; an invalid record decodes to whatever its
//! bytes say, which is meaningless but never panics.
//!
//! # Example
//!
//! ```
//! use fault::decode::{decode, Category};
//! use fault::info::{Content, Info};
//! use fault::FaultRecord;
//!
//! let mut record = FaultRecord::ZERO;
//! record.info = Info::new(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
//! record.cfsr = 1 << 25;
//! record.seal();
//!
//! let entry = decode(&record).next();
//! assert_eq!(entry.map(|e| (e.category, e.name)), Some((Category::UsageFault, "DIVBYZERO")));
//! ```

pub mod rules;

use crate::exc_return::{ExcReturn, Mode, StackPointer};
use crate::info::Content;
use crate::record::{ExceptionContext, FaultRecord, StackLimits};

use rules::{AddressSource, Register, Rule, BFARVALID, MMARVALID, SFARVALID};

/// Upper bound on the entries a single record can decode to.
pub const MAX_ENTRIES: usize = rules::HFSR.len()
    + rules::CFSR.len()
    + rules::DFSR.len()
    + rules::AFSR.len()
    + rules::SFSR.len()
    + rules::RFSR.len();

/// Exception class a status bit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)] // exception names
pub enum Category {
    HardFault,
    MemManage,
    BusFault,
    UsageFault,
    Debug,
    Auxiliary,
    SecureFault,
    Ras,
}

impl Category {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HardFault => "HardFault",
            Self::MemManage => "MemManage",
            Self::BusFault => "BusFault",
            Self::UsageFault => "UsageFault",
            Self::Debug => "Debug",
            Self::Auxiliary => "Auxiliary",
            Self::SecureFault => "SecureFault",
            Self::Ras => "RAS",
        }
    }
}

/// One decoded status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultEntry {
    /// Exception class.
    pub category: Category,
    /// Register the field was read from.
    pub register: Register,
    /// Architectural field name.
    pub name: &'static str,
    /// Lowest bit of the field.
    pub bit: u8,
    /// Field value; 1 for single-bit flags.
    pub value: u32,
    /// Faulting address or program counter, when the hardware recorded one.
    pub address: Option<u32>,
    /// Short meaning of the field.
    pub description: &'static str,
}

impl FaultEntry {
    /// Symbolic meaning of a multi-bit field value, where the architecture
    /// names the codes.
    pub const fn detail(&self) -> Option<&'static str> {
        match (self.register, self.bit) {
            (Register::Rfsr, 0) => Some(rules::ras_error_type(self.value)),
            _ => None,
        }
    }
}

/// Order in which registers are decoded.
const TABLES: [Register; 6] = [
    Register::Hfsr,
    Register::Cfsr,
    Register::Dfsr,
    Register::Afsr,
    Register::Sfsr,
    Register::Rfsr,
];

/// Lazy iterator over the entries of one record. See [`decode`].
#[derive(Debug, Clone)]
pub struct FaultEntries<'a> {
    record: &'a FaultRecord,
    table: usize,
    rule: usize,
}

/// Decode every status field whose presence flag is set.
pub fn decode(record: &FaultRecord) -> FaultEntries<'_> {
    FaultEntries {
        record,
        table: 0,
        rule: 0,
    }
}

/// Decode into a fixed-capacity vector, keeping the first `N` entries.
pub fn collect<const N: usize>(record: &FaultRecord) -> heapless::Vec<FaultEntry, N> {
    decode(record).take(N).collect()
}

impl FaultEntries<'_> {
    fn source(&self, register: Register) -> Option<(&'static [Rule], u32)> {
        let r = self.record;
        let has = |flags: Content| r.info.has(flags);
        let fault_regs = has(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
        match register {
            Register::Hfsr if fault_regs => Some((rules::HFSR.as_slice(), r.hfsr)),
            Register::Cfsr if fault_regs => Some((rules::CFSR.as_slice(), r.cfsr)),
            Register::Dfsr if fault_regs => Some((rules::DFSR.as_slice(), r.dfsr)),
            Register::Afsr if fault_regs => Some((rules::AFSR.as_slice(), r.afsr)),
            Register::Sfsr if has(Content::SECURE_FAULT_REGS) => Some((rules::SFSR.as_slice(), r.sfsr)),
            Register::Rfsr if has(Content::RAS_FAULT_REG) => Some((rules::RFSR.as_slice(), r.rfsr)),
            _ => None,
        }
    }

    fn entry(&self, rule: &Rule, raw: u32) -> Option<FaultEntry> {
        if rule.armv8_main && !self.record.info.has(Content::ARMV8X_M_MAIN) {
            return None;
        }
        let value = rule.value(raw)?;
        Some(FaultEntry {
            category: rule.category,
            register: rule.register,
            name: rule.name,
            bit: rule.mask.trailing_zeros() as u8,
            value,
            address: self.address(rule.address),
            description: rule.description,
        })
    }

    fn address(&self, source: AddressSource) -> Option<u32> {
        let r = self.record;
        match source {
            AddressSource::None => None,
            AddressSource::Pc => r.stacked_frame().map(|frame| frame.return_address),
            AddressSource::Mmfar => (r.cfsr & MMARVALID != 0).then_some(r.mmfar),
            AddressSource::Bfar => (r.cfsr & BFARVALID != 0).then_some(r.bfar),
            AddressSource::Sfar => (r.sfsr & SFARVALID != 0).then_some(r.sfar),
        }
    }
}

impl Iterator for FaultEntries<'_> {
    type Item = FaultEntry;

    fn next(&mut self) -> Option<FaultEntry> {
        while let Some(&register) = TABLES.get(self.table) {
            if let Some((table, raw)) = self.source(register) {
                while let Some(rule) = table.get(self.rule) {
                    self.rule += 1;
                    if let Some(entry) = self.entry(rule, raw) {
                        return Some(entry);
                    }
                }
            }
            self.table += 1;
            self.rule = 0;
        }
        None
    }
}

impl core::iter::FusedIterator for FaultEntries<'_> {}

/// A general register as stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterValue {
    /// Captured value.
    Known(u32),
    /// The stacked context could not be read; the stored zero means nothing.
    Unknown,
}

impl RegisterValue {
    /// The value, if known.
    pub const fn known(self) -> Option<u32> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }
}

/// Names of [`Registers::general`], in order.
pub const GENERAL_REGISTER_NAMES: [&str; 16] = [
    "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "LR", "PC",
    "xPSR",
];

/// Register view of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registers {
    /// R0..R12, LR, PC (stacked return address), xPSR.
    pub general: [RegisterValue; 16],
    /// Always captured.
    pub context: ExceptionContext,
    /// Present on Armv8-M.
    pub limits: Option<StackLimits>,
}

impl Registers {
    /// `(name, value)` pairs of the general registers.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, RegisterValue)> + '_ {
        GENERAL_REGISTER_NAMES.into_iter().zip(self.general)
    }
}

/// General registers, exception context and stack limits.
pub fn registers(record: &FaultRecord) -> Registers {
    let general = if record.info.has(Content::STATE_CONTEXT) {
        let [r0, r1, r2, r3, r4, r5, r6, r7, r8, r9, r10, r11, r12] = record.r;
        [
            r0,
            r1,
            r2,
            r3,
            r4,
            r5,
            r6,
            r7,
            r8,
            r9,
            r10,
            r11,
            r12,
            record.lr,
            record.return_address,
            record.xpsr,
        ]
        .map(RegisterValue::Known)
    } else {
        [RegisterValue::Unknown; 16]
    };
    Registers {
        general,
        context: record.exception_context(),
        limits: record.stack_limits(),
    }
}

/// Security state the fault was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Security {
    Secure,
    NonSecure,
}

impl Security {
    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Secure => "Secure",
            Self::NonSecure => "Non-secure",
        }
    }
}

/// Headline facts about a captured fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Summary {
    /// Faults since the record was last cleared.
    pub count: u32,
    /// Layout version (major, minor).
    pub version: (u8, u8),
    /// Active exception number from EXC_xPSR.
    pub exception: u16,
    /// Symbolic name of `exception`.
    pub exception_name: &'static str,
    /// Present on TrustZone builds.
    pub security: Option<Security>,
    /// Stack the frame was pushed to.
    pub stack: StackPointer,
    /// Mode the fault was taken from.
    pub mode: Mode,
    /// Security state the exception was handled in (EXC_RETURN.ES), on
    /// TrustZone builds.
    pub handled_in: Option<Security>,
    /// The frame includes floating-point state (EXC_RETURN.FType clear).
    pub fp_context: bool,
    /// Faulting program counter, when the state context was captured.
    pub pc: Option<u32>,
}

/// Headline facts about the fault in `record`.
pub fn summary(record: &FaultRecord) -> Summary {
    let info = record.info;
    let exc_return = ExcReturn(record.exc_return);
    let exception = (record.exc_xpsr & 0x1FF) as u16;
    let security = info.has(Content::TZ_ENABLED).then(|| {
        if info.has(Content::TZ_FAULT_MODE) {
            Security::Secure
        } else {
            Security::NonSecure
        }
    });
    Summary {
        count: record.count,
        version: (info.version_major(), info.version_minor()),
        exception,
        exception_name: exception_name(exception),
        security,
        stack: exc_return.stack(),
        mode: exc_return.mode(),
        handled_in: security.map(|_| {
            if exc_return.secure_exception() {
                Security::Secure
            } else {
                Security::NonSecure
            }
        }),
        fp_context: exc_return.is_exc_return() && exc_return.fp_context_stacked(),
        pc: record.stacked_frame().map(|frame| frame.return_address),
    }
}

/// Name of an exception number as found in IPSR.
pub const fn exception_name(number: u16) -> &'static str {
    match number {
        0 => "Thread",
        1 => "Reset",
        2 => "NMI",
        3 => "HardFault",
        4 => "MemManage",
        5 => "BusFault",
        6 => "UsageFault",
        7 => "SecureFault",
        11 => "SVCall",
        12 => "DebugMonitor",
        14 => "PendSV",
        15 => "SysTick",
        8..=10 | 13 => "Reserved",
        _ => "IRQ",
    }
}
