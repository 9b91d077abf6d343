//! Bit-field tables of the fault status registers.
//!
//! One table per register, in the order the decoder walks them. Address and
//! validity qualifiers (MMARVALID, BFARVALID, SFARVALID, RFSR.V) never appear
//! as entries of their own.

// Field and variant names are the architectural register names.
#![allow(missing_docs)]

use super::Category;

/// Register a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Hfsr,
    Cfsr,
    Dfsr,
    Afsr,
    Sfsr,
    Rfsr,
}

impl Register {
    /// Register name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hfsr => "HFSR",
            Self::Cfsr => "CFSR",
            Self::Dfsr => "DFSR",
            Self::Afsr => "AFSR",
            Self::Sfsr => "SFSR",
            Self::Rfsr => "RFSR",
        }
    }
}

/// Where the address attached to an entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    None,
    /// Stacked return address; needs the state context.
    Pc,
    /// MMFAR when CFSR.MMARVALID.
    Mmfar,
    /// BFAR when CFSR.BFARVALID.
    Bfar,
    /// SFAR when SFSR.SFARVALID.
    Sfar,
}

/// One named field of a status register.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: Category,
    pub register: Register,
    pub name: &'static str,
    pub description: &'static str,
    /// Field bits within the register.
    pub mask: u32,
    /// Bits that must also be set for the field to mean anything.
    pub qualifier: u32,
    /// Emit the field even when its value is zero (multi-bit codes).
    pub emit_zero: bool,
    pub address: AddressSource,
    /// Field only exists on Armv8-M Mainline and later.
    pub armv8_main: bool,
}

impl Rule {
    const fn bit(
        category: Category,
        register: Register,
        bit: u32,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            category,
            register,
            name,
            description,
            mask: 1 << bit,
            qualifier: 0,
            emit_zero: false,
            address: AddressSource::None,
            armv8_main: false,
        }
    }

    const fn at(self, address: AddressSource) -> Self {
        Self { address, ..self }
    }

    /// Field value, shifted down to bit 0, if the rule fires for `raw`.
    pub const fn value(&self, raw: u32) -> Option<u32> {
        if raw & self.qualifier != self.qualifier {
            return None;
        }
        let value = (raw & self.mask) >> self.mask.trailing_zeros();
        if value == 0 && !self.emit_zero {
            None
        } else {
            Some(value)
        }
    }
}

/// CFSR.MMARVALID
pub const MMARVALID: u32 = 1 << 7;
/// CFSR.BFARVALID
pub const BFARVALID: u32 = 1 << 15;
/// SFSR.SFARVALID
pub const SFARVALID: u32 = 1 << 6;
/// RFSR.V
pub const RFSR_VALID: u32 = 1 << 31;

use AddressSource::{Bfar, Mmfar, Pc, Sfar};
use Category::{Auxiliary, BusFault, Debug, HardFault, MemManage, Ras, SecureFault, UsageFault};
use Register::{Afsr, Cfsr, Dfsr, Hfsr, Rfsr, Sfsr};

/// HardFault Status Register fields.
pub static HFSR: [Rule; 3] = [
    Rule::bit(HardFault, Hfsr, 1, "VECTTBL", "bus fault on vector table read"),
    Rule::bit(HardFault, Hfsr, 30, "FORCED", "escalated configurable fault"),
    Rule::bit(HardFault, Hfsr, 31, "DEBUGEVT", "debug event while debug disabled"),
];

/// Configurable Fault Status Register fields (MMFSR, BFSR, UFSR).
pub static CFSR: [Rule; 18] = [
    Rule::bit(MemManage, Cfsr, 0, "IACCVIOL", "instruction access violation").at(Pc),
    Rule::bit(MemManage, Cfsr, 1, "DACCVIOL", "data access violation").at(Mmfar),
    Rule::bit(MemManage, Cfsr, 3, "MUNSTKERR", "MemManage fault on unstacking"),
    Rule::bit(MemManage, Cfsr, 4, "MSTKERR", "MemManage fault on stacking"),
    Rule::bit(MemManage, Cfsr, 5, "MLSPERR", "MemManage fault on lazy FP state preservation"),
    Rule::bit(BusFault, Cfsr, 8, "IBUSERR", "instruction bus error").at(Pc),
    Rule::bit(BusFault, Cfsr, 9, "PRECISERR", "precise data bus error").at(Bfar),
    Rule::bit(BusFault, Cfsr, 10, "IMPRECISERR", "imprecise data bus error"),
    Rule::bit(BusFault, Cfsr, 11, "UNSTKERR", "bus fault on unstacking"),
    Rule::bit(BusFault, Cfsr, 12, "STKERR", "bus fault on stacking"),
    Rule::bit(BusFault, Cfsr, 13, "LSPERR", "bus fault on lazy FP state preservation"),
    Rule::bit(UsageFault, Cfsr, 16, "UNDEFINSTR", "undefined instruction").at(Pc),
    Rule::bit(UsageFault, Cfsr, 17, "INVSTATE", "invalid EPSR state").at(Pc),
    Rule::bit(UsageFault, Cfsr, 18, "INVPC", "invalid exception return").at(Pc),
    Rule::bit(UsageFault, Cfsr, 19, "NOCP", "coprocessor access").at(Pc),
    Rule {
        armv8_main: true,
        ..Rule::bit(UsageFault, Cfsr, 20, "STKOF", "stack limit overflow")
    },
    Rule::bit(UsageFault, Cfsr, 24, "UNALIGNED", "unaligned access").at(Pc),
    Rule::bit(UsageFault, Cfsr, 25, "DIVBYZERO", "divide by zero").at(Pc),
];

/// Debug Fault Status Register fields.
pub static DFSR: [Rule; 5] = [
    Rule::bit(Debug, Dfsr, 0, "HALTED", "halt request"),
    Rule::bit(Debug, Dfsr, 1, "BKPT", "breakpoint"),
    Rule::bit(Debug, Dfsr, 2, "DWTTRAP", "watchpoint or DWT event"),
    Rule::bit(Debug, Dfsr, 3, "VCATCH", "vector catch"),
    Rule::bit(Debug, Dfsr, 4, "EXTERNAL", "external debug request"),
];

/// Auxiliary Fault Status Register: any set bit.
pub static AFSR: [Rule; 1] = [Rule {
    mask: u32::MAX,
    ..Rule::bit(Auxiliary, Afsr, 0, "AFSR", "implementation defined fault")
}];

/// SecureFault Status Register fields.
pub static SFSR: [Rule; 7] = [
    Rule::bit(SecureFault, Sfsr, 0, "INVEP", "invalid Secure state entry point"),
    Rule::bit(SecureFault, Sfsr, 1, "INVIS", "invalid integrity signature on return"),
    Rule::bit(SecureFault, Sfsr, 2, "INVER", "invalid exception return"),
    Rule::bit(SecureFault, Sfsr, 3, "AUVIOL", "attribution unit violation").at(Sfar),
    Rule::bit(SecureFault, Sfsr, 4, "INVTRAN", "invalid transition from Secure to Non-secure"),
    Rule::bit(SecureFault, Sfsr, 5, "LSPERR", "lazy FP state preservation error"),
    Rule::bit(SecureFault, Sfsr, 7, "LSERR", "lazy FP state activation error"),
];

/// RAS Fault Status Register fields, qualified by RFSR.V.
pub static RFSR: [Rule; 2] = [
    Rule {
        mask: 0x3,
        qualifier: RFSR_VALID,
        emit_zero: true,
        ..Rule::bit(Ras, Rfsr, 0, "UET", "RAS error type")
    },
    Rule {
        mask: 0x7FFF << 16,
        qualifier: RFSR_VALID,
        ..Rule::bit(Ras, Rfsr, 16, "IS", "implementation defined syndrome")
    },
];

/// Name of a RAS error type code (RFSR.UET).
pub const fn ras_error_type(uet: u32) -> &'static str {
    match uet & 0x3 {
        0 => "uncontainable",
        1 => "unrecoverable",
        2 => "restartable",
        _ => "recoverable",
    }
}
