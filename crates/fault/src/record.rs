//! The fault record: data model, integrity check and typed views.

use core::mem::{offset_of, size_of};

use thiserror_no_std::Error;

use crate::crc;
use crate::info::{Content, Info};
use crate::layout::{self, INTEGRITY_SIGNATURE, MAGIC_NUMBER, RECORD_SIZE, RECORD_WORDS};

/// Error parsing a record from a raw memory dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// The dump does not have the size of a version 0.2 record.
    #[error("record dump is {actual} bytes, expected {expected}")]
    Length {
        /// Bytes required.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// Persistent fault record, bit-compatible with layout version 0.2.
///
/// Every field is a plain `u32`, so any bit pattern is a well-formed value;
/// whether the content is meaningful is decided by [`FaultRecord::is_valid`]
/// and the content flags in `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct FaultRecord {
    /// [`MAGIC_NUMBER`] once the record is sealed.
    pub magic_number: u32,
    /// CRC-32 from `count` to the end of the record.
    pub crc32: u32,
    /// Number of faults captured since the record was last cleared.
    pub count: u32,
    /// Layout version and content flags.
    pub info: Info,
    /// R0..R12. R0-R3 and R12 come from the stacked frame; R4-R11 from the live
    /// registers or the additional state context.
    pub r: [u32; 13],
    /// Stacked LR (R14).
    pub lr: u32,
    /// Stacked return address.
    pub return_address: u32,
    /// Stacked xPSR.
    pub xpsr: u32,
    /// Armv8-M additional state context integrity signature.
    pub integrity_signature: u32,
    /// xPSR of the capture routine (holds the active exception number).
    pub exc_xpsr: u32,
    /// EXC_RETURN of the fault exception.
    pub exc_return: u32,
    /// Main stack pointer at capture.
    pub msp: u32,
    /// Process stack pointer at capture.
    pub psp: u32,
    /// Main stack limit.
    pub msplim: u32,
    /// Process stack limit.
    pub psplim: u32,
    /// Configurable Fault Status Register.
    pub cfsr: u32,
    /// HardFault Status Register.
    pub hfsr: u32,
    /// Debug Fault Status Register.
    pub dfsr: u32,
    /// MemManage Fault Address Register.
    pub mmfar: u32,
    /// BusFault Address Register.
    pub bfar: u32,
    /// Auxiliary Fault Status Register.
    pub afsr: u32,
    /// SecureFault Status Register.
    pub sfsr: u32,
    /// SecureFault Address Register.
    pub sfar: u32,
    /// RAS Fault Status Register.
    pub rfsr: u32,
}

const _: () = {
    assert!(size_of::<FaultRecord>() == RECORD_SIZE);
    assert!(offset_of!(FaultRecord, magic_number) == layout::OFS_MAGIC_NUMBER);
    assert!(offset_of!(FaultRecord, crc32) == layout::OFS_CRC32);
    assert!(offset_of!(FaultRecord, count) == layout::OFS_COUNT);
    assert!(offset_of!(FaultRecord, info) == layout::OFS_INFO);
    assert!(offset_of!(FaultRecord, r) == layout::OFS_R0);
    assert!(layout::OFS_R0 + 4 * 4 == layout::OFS_R4);
    assert!(layout::OFS_R0 + 12 * 4 == layout::OFS_R12);
    assert!(offset_of!(FaultRecord, lr) == layout::OFS_LR);
    assert!(offset_of!(FaultRecord, return_address) == layout::OFS_RETURN_ADDRESS);
    assert!(offset_of!(FaultRecord, xpsr) == layout::OFS_XPSR);
    assert!(offset_of!(FaultRecord, integrity_signature) == layout::OFS_INTEGRITY_SIGNATURE);
    assert!(offset_of!(FaultRecord, exc_xpsr) == layout::OFS_EXC_XPSR);
    assert!(offset_of!(FaultRecord, exc_return) == layout::OFS_EXC_RETURN);
    assert!(offset_of!(FaultRecord, msp) == layout::OFS_MSP);
    assert!(offset_of!(FaultRecord, psp) == layout::OFS_PSP);
    assert!(offset_of!(FaultRecord, msplim) == layout::OFS_MSPLIM);
    assert!(offset_of!(FaultRecord, psplim) == layout::OFS_PSPLIM);
    assert!(offset_of!(FaultRecord, cfsr) == layout::OFS_CFSR);
    assert!(offset_of!(FaultRecord, hfsr) == layout::OFS_HFSR);
    assert!(offset_of!(FaultRecord, dfsr) == layout::OFS_DFSR);
    assert!(offset_of!(FaultRecord, mmfar) == layout::OFS_MMFAR);
    assert!(offset_of!(FaultRecord, bfar) == layout::OFS_BFAR);
    assert!(offset_of!(FaultRecord, afsr) == layout::OFS_AFSR);
    assert!(offset_of!(FaultRecord, sfsr) == layout::OFS_SFSR);
    assert!(offset_of!(FaultRecord, sfar) == layout::OFS_SFAR);
    assert!(offset_of!(FaultRecord, rfsr) == layout::OFS_RFSR);
};

/// Basic state context pushed by hardware on exception entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackedFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub return_address: u32,
    pub xpsr: u32,
}

/// Execution state sampled by the capture routine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExceptionContext {
    pub exc_xpsr: u32,
    pub exc_return: u32,
    pub msp: u32,
    pub psp: u32,
}

/// Armv8-M stack limit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackLimits {
    pub msplim: u32,
    pub psplim: u32,
}

/// Fault status and address registers common to Armv7-M and Armv8-M Mainline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultStatus {
    pub cfsr: u32,
    pub hfsr: u32,
    pub dfsr: u32,
    pub mmfar: u32,
    pub bfar: u32,
    pub afsr: u32,
}

/// SecureFault status and address registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SecureFaultStatus {
    pub sfsr: u32,
    pub sfar: u32,
}

impl Default for FaultRecord {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FaultRecord {
    /// Cleared record: never valid.
    pub const ZERO: Self = Self::from_words([0; RECORD_WORDS]);

    /// Record from its 36 words in layout order.
    #[allow(clippy::indexing_slicing)] // constant indices below RECORD_WORDS
    pub const fn from_words(w: [u32; RECORD_WORDS]) -> Self {
        Self {
            magic_number: w[0],
            crc32: w[1],
            count: w[2],
            info: Info(w[3]),
            r: [
                w[4], w[5], w[6], w[7], w[8], w[9], w[10], w[11], w[12], w[13], w[14], w[15],
                w[16],
            ],
            lr: w[17],
            return_address: w[18],
            xpsr: w[19],
            integrity_signature: w[20],
            exc_xpsr: w[21],
            exc_return: w[22],
            msp: w[23],
            psp: w[24],
            msplim: w[25],
            psplim: w[26],
            cfsr: w[27],
            hfsr: w[28],
            dfsr: w[29],
            mmfar: w[30],
            bfar: w[31],
            afsr: w[32],
            sfsr: w[33],
            sfar: w[34],
            rfsr: w[35],
        }
    }

    /// The 36 words in layout order.
    #[allow(clippy::indexing_slicing)] // constant indices below 13
    pub const fn to_words(&self) -> [u32; RECORD_WORDS] {
        let r = &self.r;
        [
            self.magic_number,
            self.crc32,
            self.count,
            self.info.0,
            r[0],
            r[1],
            r[2],
            r[3],
            r[4],
            r[5],
            r[6],
            r[7],
            r[8],
            r[9],
            r[10],
            r[11],
            r[12],
            self.lr,
            self.return_address,
            self.xpsr,
            self.integrity_signature,
            self.exc_xpsr,
            self.exc_return,
            self.msp,
            self.psp,
            self.msplim,
            self.psplim,
            self.cfsr,
            self.hfsr,
            self.dfsr,
            self.mmfar,
            self.bfar,
            self.afsr,
            self.sfsr,
            self.sfar,
            self.rfsr,
        ]
    }

    /// Little-endian byte image, identical to target memory.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Parse a little-endian dump of target memory.
    ///
    /// # Errors
    ///
    /// [`RecordError::Length`] unless `bytes` is exactly [`RECORD_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != RECORD_SIZE {
            return Err(RecordError::Length {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut words = [0u32; RECORD_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            let mut le = [0u8; 4];
            le.copy_from_slice(chunk);
            *word = u32::from_le_bytes(le);
        }
        Ok(Self::from_words(words))
    }

    /// CRC-32 over `count` through `rfsr`.
    pub fn checksum(&self) -> u32 {
        self.to_words()
            .iter()
            .skip(layout::CHECKSUM_START / 4)
            .fold(layout::CRC32_INIT, |crc, word| crc::update(crc, &word.to_le_bytes()))
    }

    /// Magic number present and checksum matches the content.
    ///
    /// A record that was never written, was cleared, or whose capture was cut
    /// short before the final magic-number store is not valid.
    pub fn is_valid(&self) -> bool {
        self.magic_number == MAGIC_NUMBER && self.crc32 == self.checksum()
    }

    /// Store the checksum, then the magic number.
    pub fn seal(&mut self) {
        self.crc32 = self.checksum();
        self.magic_number = MAGIC_NUMBER;
    }

    /// Zero the whole record, count included.
    pub fn clear(&mut self) {
        *self = Self::ZERO;
    }

    /// Faults captured since the record was last cleared.
    pub const fn occurrence_count(&self) -> u32 {
        self.count
    }

    /// Content flags from `info`.
    pub const fn content(&self) -> Content {
        self.info.content()
    }

    fn has(&self, flags: Content) -> bool {
        self.info.has(flags)
    }

    /// Stacked basic frame, if the state context was captured.
    pub fn stacked_frame(&self) -> Option<StackedFrame> {
        self.has(Content::STATE_CONTEXT).then(|| {
            let [r0, r1, r2, r3, .., r12] = self.r;
            StackedFrame {
                r0,
                r1,
                r2,
                r3,
                r12,
                lr: self.lr,
                return_address: self.return_address,
                xpsr: self.xpsr,
            }
        })
    }

    /// R4..R11 at the time of the fault, if the state context was captured.
    pub fn callee_saved(&self) -> Option<[u32; 8]> {
        self.has(Content::STATE_CONTEXT).then(|| {
            let [_, _, _, _, r4, r5, r6, r7, r8, r9, r10, r11, _] = self.r;
            [r4, r5, r6, r7, r8, r9, r10, r11]
        })
    }

    /// Integrity signature, when an additional state context was copied.
    pub fn integrity_signature(&self) -> Option<u32> {
        (self.has(Content::STATE_CONTEXT) && self.integrity_signature == INTEGRITY_SIGNATURE)
            .then_some(self.integrity_signature)
    }

    /// EXC_xPSR, EXC_RETURN, MSP and PSP; always captured.
    pub const fn exception_context(&self) -> ExceptionContext {
        ExceptionContext {
            exc_xpsr: self.exc_xpsr,
            exc_return: self.exc_return,
            msp: self.msp,
            psp: self.psp,
        }
    }

    /// Stack limit registers, if captured.
    pub fn stack_limits(&self) -> Option<StackLimits> {
        self.has(Content::LIMIT_REGS).then_some(StackLimits {
            msplim: self.msplim,
            psplim: self.psplim,
        })
    }

    /// Fault status registers, if captured.
    pub fn fault_status(&self) -> Option<FaultStatus> {
        self.has(Content::FAULT_REGS).then_some(FaultStatus {
            cfsr: self.cfsr,
            hfsr: self.hfsr,
            dfsr: self.dfsr,
            mmfar: self.mmfar,
            bfar: self.bfar,
            afsr: self.afsr,
        })
    }

    /// SecureFault registers, if captured.
    pub fn secure_fault_status(&self) -> Option<SecureFaultStatus> {
        self.has(Content::SECURE_FAULT_REGS).then_some(SecureFaultStatus {
            sfsr: self.sfsr,
            sfar: self.sfar,
        })
    }

    /// RAS Fault Status Register, if captured.
    pub fn ras_fault_status(&self) -> Option<u32> {
        self.has(Content::RAS_FAULT_REG).then_some(self.rfsr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> FaultRecord {
        let mut record = FaultRecord::ZERO;
        record.count = 3;
        record.info = Info::new(Content::FAULT_REGS_EXIST | Content::FAULT_REGS);
        record.cfsr = 0x0200_0000;
        record.exc_return = 0xFFFF_FFFD;
        record
    }

    #[test]
    fn zero_record_is_invalid() {
        assert!(!FaultRecord::ZERO.is_valid());
    }

    #[test]
    fn sealed_record_is_valid() {
        let mut record = sample();
        record.seal();
        assert!(record.is_valid());
        assert_eq!(record.magic_number, MAGIC_NUMBER);
    }

    #[test]
    fn wrong_magic_with_matching_crc_is_invalid() {
        let mut record = sample();
        record.seal();
        record.magic_number = MAGIC_NUMBER ^ 1;
        assert!(!record.is_valid());
    }

    #[test]
    fn checksum_ignores_magic_and_crc_fields() {
        let record = sample();
        let mut other = record;
        other.magic_number = 0xDEAD_BEEF;
        other.crc32 = 0x1234_5678;
        assert_eq!(record.checksum(), other.checksum());
    }

    #[test]
    fn checksum_covers_bytes_from_count() {
        let record = sample();
        let bytes = record.to_bytes();
        assert_eq!(record.checksum(), crc::checksum(&bytes[8..]));
    }

    #[test]
    fn clear_zeroes_count_and_magic() {
        let mut record = sample();
        record.seal();
        record.clear();
        assert_eq!(record, FaultRecord::ZERO);
        assert_eq!(record.occurrence_count(), 0);
    }

    #[test]
    fn bytes_round_trip() {
        let mut record = sample();
        record.seal();
        let parsed = FaultRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn from_bytes_rejects_short_dump() {
        let err = FaultRecord::from_bytes(&[0u8; 140]).unwrap_err();
        assert_eq!(
            err,
            RecordError::Length {
                expected: 144,
                actual: 140
            }
        );
    }

    #[test]
    fn optional_sections_follow_content_flags() {
        let record = sample();
        assert!(record.fault_status().is_some());
        assert!(record.stacked_frame().is_none());
        assert!(record.callee_saved().is_none());
        assert!(record.stack_limits().is_none());
        assert!(record.secure_fault_status().is_none());
        assert!(record.ras_fault_status().is_none());
    }

    #[test]
    fn layout_word_order_matches_offsets() {
        let mut record = FaultRecord::ZERO;
        record.rfsr = 0xAABB_CCDD;
        record.r[4] = 0x1111_2222;
        let bytes = record.to_bytes();
        assert_eq!(&bytes[layout::OFS_RFSR..], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&bytes[layout::OFS_R4..layout::OFS_R4 + 4], &[0x22, 0x22, 0x11, 0x11]);
    }
}
