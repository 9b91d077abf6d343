//! The record `info` word: layout version plus content flags.
//!
//! Bits 0..15 carry the layout version (minor, major). Bits 16..19 describe
//! the build that produced the record and are constant per firmware image.
//! Bits 20..25 are set by the capture engine as it fills optional sections.

use bitflags::bitflags;

use crate::layout::{VERSION_MAJOR, VERSION_MINOR};

bitflags! {
    /// Which optional sections of the record are present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Content: u32 {
        /// The architecture implements the fault-status registers.
        const FAULT_REGS_EXIST = 1 << 16;
        /// Armv8-M or Armv8.1-M Mainline.
        const ARMV8X_M_MAIN = 1 << 17;
        /// TrustZone is implemented.
        const TZ_ENABLED = 1 << 18;
        /// The capture code ran in Secure state.
        const TZ_SECURE = 1 << 19;
        /// The fault was taken while executing in Secure state.
        const TZ_FAULT_MODE = 1 << 20;
        /// The stacked state context was captured; general registers are valid.
        const STATE_CONTEXT = 1 << 21;
        /// MSPLIM and PSPLIM were captured.
        const LIMIT_REGS = 1 << 22;
        /// CFSR, HFSR, DFSR, MMFAR, BFAR and AFSR were captured.
        const FAULT_REGS = 1 << 23;
        /// SFSR and SFAR were captured.
        const SECURE_FAULT_REGS = 1 << 24;
        /// RFSR was captured.
        const RAS_FAULT_REG = 1 << 25;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Content {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Content({=u32:#010x})", self.bits());
    }
}

/// Raw `info` word as stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Info(pub u32);

impl Info {
    /// Info word with the current layout version and the given content flags.
    pub const fn new(content: Content) -> Self {
        Self(version_bits() | content.bits())
    }

    /// Layout minor version.
    pub const fn version_minor(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Layout major version.
    pub const fn version_major(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Whether the record was written with the layout this crate understands.
    pub const fn is_current_version(self) -> bool {
        self.version_major() == VERSION_MAJOR && self.version_minor() == VERSION_MINOR
    }

    /// Content flags; unknown bits are dropped.
    pub const fn content(self) -> Content {
        Content::from_bits_truncate(self.0)
    }

    /// Whether every flag in `flags` is set.
    pub const fn has(self, flags: Content) -> bool {
        self.0 & flags.bits() == flags.bits()
    }

    /// Returns the word with `flags` set in addition.
    #[must_use]
    pub const fn with(self, flags: Content) -> Self {
        Self(self.0 | flags.bits())
    }
}

const fn version_bits() -> u32 {
    VERSION_MINOR as u32 | (VERSION_MAJOR as u32) << 8
}
