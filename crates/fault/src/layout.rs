//! Byte layout of the persistent fault record (layout version 0.2).
//!
//! These offsets are the contract with debuggers and visualization tools that
//! read the record straight out of target RAM. They must not move within a
//! layout version.
//!
//! ```text
//! 0    magic_number          4    crc32               8    count
//! 12   info                  16   R0 .. 64 R12
//! 68   LR                    72   ReturnAddress       76   xPSR
//! 80   IntegritySignature
//! 84   EXC_xPSR              88   EXC_RETURN          92   MSP      96  PSP
//! 100  MSPLIM                104  PSPLIM
//! 108  CFSR   112 HFSR   116 DFSR   120 MMFAR   124 BFAR   128 AFSR
//! 132  SFSR   136 SFAR   140 RFSR
//! ```

// Offsets and register constants are named after what they locate.
#![allow(missing_docs)]

/// Layout major version stored in the info word.
pub const VERSION_MAJOR: u8 = 0;
/// Layout minor version stored in the info word.
pub const VERSION_MINOR: u8 = 2;

/// Sentinel written last by the capture engine (ASCII "FltR" little-endian).
pub const MAGIC_NUMBER: u32 = 0x5274_6C46;

/// CRC-32 initial value.
pub const CRC32_INIT: u32 = 0xFFFF_FFFF;
/// CRC-32 polynomial, processed MSB first.
pub const CRC32_POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Armv8-M additional state context integrity signature.
pub const INTEGRITY_SIGNATURE: u32 = 0xFEFA_125A;

/// Total record size in bytes.
pub const RECORD_SIZE: usize = 144;
/// Total record size in 32-bit words.
pub const RECORD_WORDS: usize = RECORD_SIZE / 4;

/// Byte offset of `magic_number`.
pub const OFS_MAGIC_NUMBER: usize = 0;
/// Byte offset of `crc32`.
pub const OFS_CRC32: usize = 4;
/// Byte offset of `count`.
pub const OFS_COUNT: usize = 8;
/// Byte offset of `info`.
pub const OFS_INFO: usize = 12;
/// Byte offset of `r[0]`.
pub const OFS_R0: usize = 16;
/// Byte offset of `r[4]`.
pub const OFS_R4: usize = 32;
/// Byte offset of `r[12]`.
pub const OFS_R12: usize = 64;
/// Byte offset of `lr`.
pub const OFS_LR: usize = 68;
/// Byte offset of `return_address`.
pub const OFS_RETURN_ADDRESS: usize = 72;
/// Byte offset of `xpsr`.
pub const OFS_XPSR: usize = 76;
/// Byte offset of `integrity_signature`.
pub const OFS_INTEGRITY_SIGNATURE: usize = 80;
/// Byte offset of `exc_xpsr`.
pub const OFS_EXC_XPSR: usize = 84;
/// Byte offset of `exc_return`.
pub const OFS_EXC_RETURN: usize = 88;
/// Byte offset of `msp`.
pub const OFS_MSP: usize = 92;
/// Byte offset of `psp`.
pub const OFS_PSP: usize = 96;
/// Byte offset of `msplim`.
pub const OFS_MSPLIM: usize = 100;
/// Byte offset of `psplim`.
pub const OFS_PSPLIM: usize = 104;
/// Byte offset of `cfsr`.
pub const OFS_CFSR: usize = 108;
/// Byte offset of `hfsr`.
pub const OFS_HFSR: usize = 112;
/// Byte offset of `dfsr`.
pub const OFS_DFSR: usize = 116;
/// Byte offset of `mmfar`.
pub const OFS_MMFAR: usize = 120;
/// Byte offset of `bfar`.
pub const OFS_BFAR: usize = 124;
/// Byte offset of `afsr`.
pub const OFS_AFSR: usize = 128;
/// Byte offset of `sfsr`.
pub const OFS_SFSR: usize = 132;
/// Byte offset of `sfar`.
pub const OFS_SFAR: usize = 136;
/// Byte offset of `rfsr`.
pub const OFS_RFSR: usize = 140;

/// First byte covered by the checksum.
pub const CHECKSUM_START: usize = OFS_COUNT;
/// Number of bytes covered by the checksum: everything but magic and crc32.
pub const CHECKSUM_LEN: usize = RECORD_SIZE - CHECKSUM_START;

/// System Control Block registers read during capture.
pub mod scb {
    /// SCB base address (current security state).
    pub const BASE: u32 = 0xE000_ED00;
    /// SCB Non-secure alias, reachable from Secure state only.
    pub const BASE_NS: u32 = 0xE002_ED00;

    /// AIRCR offset from the SCB base.
    pub const AIRCR: u32 = 0x0C;
    /// CFSR offset from the SCB base.
    pub const CFSR: u32 = 0x28;
    /// HFSR offset from the SCB base.
    pub const HFSR: u32 = 0x2C;
    /// DFSR offset from the SCB base.
    pub const DFSR: u32 = 0x30;
    /// MMFAR offset from the SCB base.
    pub const MMFAR: u32 = 0x34;
    /// BFAR offset from the SCB base.
    pub const BFAR: u32 = 0x38;
    /// AFSR offset from the SCB base.
    pub const AFSR: u32 = 0x3C;
    /// SFSR offset from the SCB base.
    pub const SFSR: u32 = 0xE4;
    /// SFAR offset from the SCB base.
    pub const SFAR: u32 = 0xE8;
    /// RFSR offset from the SCB base.
    pub const RFSR: u32 = 0x204;

    /// AIRCR write key.
    pub const AIRCR_VECTKEY: u32 = 0x05FA << 16;
    /// AIRCR system reset request.
    pub const AIRCR_SYSRESETREQ: u32 = 1 << 2;
    /// AIRCR priority grouping field, preserved across the reset request.
    pub const AIRCR_PRIGROUP_MASK: u32 = 0x7 << 8;

    /// CFSR bits reporting a fault while stacking the state context.
    pub const CFSR_MSTKERR: u32 = 1 << 4;
    pub const CFSR_STKERR: u32 = 1 << 12;
    pub const CFSR_STKOF: u32 = 1 << 20;
}
