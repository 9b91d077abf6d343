//! Build-time target configuration.
//!
//! The set of architectures is closed; the build script picks one from the
//! compilation target and cargo features add TrustZone and Armv8.1-M. The
//! capture engine assembles only the steps the variant needs, and the
//! variant's static flags are written into every record it produces.

use crate::info::{Content, Info};

/// M-profile architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Arch {
    /// Armv6-M (Cortex-M0/M0+/M1).
    V6M,
    /// Armv7-M (Cortex-M3/M4/M7).
    V7M,
    /// Armv8-M Baseline (Cortex-M23).
    V8MBase,
    /// Armv8-M Mainline (Cortex-M33/M35P).
    V8MMain,
    /// Armv8.1-M Mainline (Cortex-M55/M85).
    V81MMain,
}

impl Arch {
    /// CFSR, HFSR, DFSR, MMFAR, BFAR and AFSR are implemented.
    pub const fn has_fault_regs(self) -> bool {
        matches!(self, Self::V7M | Self::V8MMain | Self::V81MMain)
    }

    /// Armv8-M or later: stack limit registers, additional state context.
    pub const fn is_armv8(self) -> bool {
        matches!(self, Self::V8MBase | Self::V8MMain | Self::V81MMain)
    }

    /// Armv8-M or Armv8.1-M Mainline.
    pub const fn is_armv8_main(self) -> bool {
        matches!(self, Self::V8MMain | Self::V81MMain)
    }

    /// RAS Fault Status Register is implemented.
    pub const fn has_ras(self) -> bool {
        matches!(self, Self::V81MMain)
    }

    /// Architecture name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::V6M => "Armv6-M",
            Self::V7M => "Armv7-M",
            Self::V8MBase => "Armv8-M Baseline",
            Self::V8MMain => "Armv8-M Mainline",
            Self::V81MMain => "Armv8.1-M Mainline",
        }
    }
}

/// TrustZone configuration of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrustZone {
    /// No Security Extension.
    Disabled,
    /// Security Extension present, image runs Non-secure.
    NonSecure,
    /// Security Extension present, image runs Secure.
    Secure,
}

/// Architecture plus security configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Variant {
    /// Architecture.
    pub arch: Arch,
    /// TrustZone configuration.
    pub trustzone: TrustZone,
}

impl Variant {
    /// Variant without TrustZone.
    pub const fn new(arch: Arch) -> Self {
        Self {
            arch,
            trustzone: TrustZone::Disabled,
        }
    }

    /// Same architecture with the given TrustZone configuration.
    #[must_use]
    pub const fn with_trustzone(self, trustzone: TrustZone) -> Self {
        Self {
            arch: self.arch,
            trustzone,
        }
    }

    /// Capture runs Secure and may use Non-secure register aliases.
    pub const fn is_secure(self) -> bool {
        matches!(self.trustzone, TrustZone::Secure)
    }

    /// Content flags fixed by the image, independent of the fault.
    pub const fn static_content(self) -> Content {
        let mut bits = 0;
        if self.arch.has_fault_regs() {
            bits |= Content::FAULT_REGS_EXIST.bits();
        }
        if self.arch.is_armv8_main() {
            bits |= Content::ARMV8X_M_MAIN.bits();
        }
        if !matches!(self.trustzone, TrustZone::Disabled) {
            bits |= Content::TZ_ENABLED.bits();
        }
        if self.is_secure() {
            bits |= Content::TZ_SECURE.bits();
        }
        Content::from_bits_truncate(bits)
    }

    /// Info word written by capture before any section is filled.
    pub const fn initial_info(self) -> Info {
        Info::new(self.static_content())
    }

    /// CFSR bits that mean the state context could not be stacked.
    pub const fn stacking_error_mask(self) -> u32 {
        use crate::layout::scb::{CFSR_MSTKERR, CFSR_STKERR, CFSR_STKOF};
        if self.arch.is_armv8_main() {
            CFSR_STKERR | CFSR_MSTKERR | CFSR_STKOF
        } else {
            CFSR_STKERR | CFSR_MSTKERR
        }
    }
}

#[cfg(target_arch = "arm")]
impl Variant {
    /// Variant this crate was built for.
    pub const TARGET: Self = Self {
        arch: target_arch(),
        trustzone: target_trustzone(),
    };
}

#[cfg(target_arch = "arm")]
const fn target_arch() -> Arch {
    if cfg!(armv6m) {
        Arch::V6M
    } else if cfg!(armv7m) {
        Arch::V7M
    } else if cfg!(armv8m_base) {
        Arch::V8MBase
    } else if cfg!(feature = "armv8_1m") {
        Arch::V81MMain
    } else {
        Arch::V8MMain
    }
}

#[cfg(target_arch = "arm")]
const fn target_trustzone() -> TrustZone {
    if cfg!(feature = "secure") {
        TrustZone::Secure
    } else if cfg!(feature = "trustzone") {
        TrustZone::NonSecure
    } else {
        TrustZone::Disabled
    }
}
