//! Deliberate faults for exercising the capture path on hardware.
//!
//! Each [`FaultKind`] names the status field the decoder should report after
//! the reset, so a run of the demo doubles as an end-to-end check: inject,
//! reset, decode, compare.

use fault::decode::{self, rules::Register};
use fault::FaultRecord;
use thiserror_no_std::Error;

/// A fault the demo can raise on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// `udiv` by zero with CCR.DIV_0_TRP set.
    DivideByZero,
    /// Permanently undefined instruction (`udf`).
    Undefined,
    /// Branch to an even address, clearing EPSR.T.
    InvalidState,
    /// Load from an unmapped address.
    BusError,
    /// Instruction fetch from the execute-never system region.
    ExecuteNever,
}

/// Unknown fault name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown fault kind")]
pub struct UnknownFaultKind;

/// Reserved on the STM32H743 memory map: between ITCM and flash.
pub const UNMAPPED_ADDRESS: u32 = 0x0010_0000;

/// Start of the Cortex-M system region, execute-never by architecture.
pub const XN_ADDRESS: u32 = 0xE000_0000;

impl FaultKind {
    /// Every kind, in injection order.
    pub const ALL: [Self; 5] = [
        Self::DivideByZero,
        Self::Undefined,
        Self::InvalidState,
        Self::BusError,
        Self::ExecuteNever,
    ];

    /// Short name, also accepted by [`FaultKind::parse`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::DivideByZero => "div0",
            Self::Undefined => "undef",
            Self::InvalidState => "invstate",
            Self::BusError => "buserr",
            Self::ExecuteNever => "xn",
        }
    }

    /// Look a kind up by [`FaultKind::name`].
    pub fn parse(name: &str) -> Result<Self, UnknownFaultKind> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or(UnknownFaultKind)
    }

    /// CFSR field the decoder reports for this kind.
    pub const fn expected_entry(self) -> &'static str {
        match self {
            Self::DivideByZero => "DIVBYZERO",
            Self::Undefined => "UNDEFINSTR",
            Self::InvalidState => "INVSTATE",
            Self::BusError => "PRECISERR",
            Self::ExecuteNever => "IACCVIOL",
        }
    }

    /// Identify which kind produced `record`, from its first CFSR entry.
    pub fn identify(record: &FaultRecord) -> Option<Self> {
        let entry = decode::decode(record).find(|e| e.register == Register::Cfsr)?;
        Self::ALL.into_iter().find(|k| k.expected_entry() == entry.name)
    }

    /// The kind to inject after `previous`, wrapping around.
    pub fn after(previous: Option<Self>) -> Self {
        let next = previous
            .and_then(|p| Self::ALL.iter().position(|k| *k == p))
            .map_or(0, |i| i.wrapping_add(1) % Self::ALL.len());
        Self::ALL.get(next).copied().unwrap_or(Self::DivideByZero)
    }
}

/// Raise `kind`. Returns only if the fault is not enabled.
#[cfg(feature = "hardware")]
#[allow(unsafe_code)]
pub fn trigger(kind: FaultKind) {
    use core::arch::asm;

    match kind {
        FaultKind::DivideByZero => {
            let mut n: u32 = 1;
            // SAFETY: faults with DIVBYZERO when CCR.DIV_0_TRP is set, else yields 0.
            unsafe { asm!("udiv {0}, {0}, {1}", inout(reg) n, in(reg) 0u32, options(nomem, nostack)) };
            defmt::warn!("division by zero returned {=u32}", n);
        }
        // SAFETY: each of these raises a synchronous fault; the capture routine
        // resets the device and control never returns here.
        FaultKind::Undefined => unsafe { asm!("udf #0", options(nomem, nostack)) },
        FaultKind::InvalidState => unsafe {
            asm!("bx {0}", in(reg) 0x0800_0000u32, options(nomem, nostack));
        },
        FaultKind::BusError => {
            // SAFETY: see above.
            let v = unsafe { core::ptr::read_volatile(UNMAPPED_ADDRESS as *const u32) };
            defmt::warn!("unmapped read returned {=u32:#010x}", v);
        }
        FaultKind::ExecuteNever => unsafe {
            asm!("bx {0}", in(reg) XN_ADDRESS | 1, options(nomem, nostack));
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fault::{Content, Info};

    fn record_with_cfsr(cfsr: u32) -> FaultRecord {
        let mut record = FaultRecord::ZERO;
        record.count = 1;
        record.info = Info::new(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
        record.cfsr = cfsr;
        record.seal();
        record
    }

    #[test]
    fn names_round_trip() {
        for kind in FaultKind::ALL {
            assert_eq!(FaultKind::parse(kind.name()), Ok(kind));
        }
        assert_eq!(FaultKind::parse("reset"), Err(UnknownFaultKind));
    }

    #[test]
    fn identify_matches_decoder_names() {
        let cases = [
            (1 << 25, FaultKind::DivideByZero),
            (1 << 16, FaultKind::Undefined),
            (1 << 17, FaultKind::InvalidState),
            ((1 << 9) | (1 << 15), FaultKind::BusError),
            (1 << 0, FaultKind::ExecuteNever),
        ];
        for (cfsr, kind) in cases {
            assert_eq!(FaultKind::identify(&record_with_cfsr(cfsr)), Some(kind));
        }
    }

    #[test]
    fn identify_ignores_unrelated_faults() {
        assert_eq!(FaultKind::identify(&record_with_cfsr(1 << 19)), None);
        assert_eq!(FaultKind::identify(&record_with_cfsr(0)), None);
    }

    #[test]
    fn after_cycles_through_all_kinds() {
        assert_eq!(FaultKind::after(None), FaultKind::DivideByZero);
        assert_eq!(FaultKind::after(Some(FaultKind::DivideByZero)), FaultKind::Undefined);
        assert_eq!(FaultKind::after(Some(FaultKind::ExecuteNever)), FaultKind::DivideByZero);
    }
}
