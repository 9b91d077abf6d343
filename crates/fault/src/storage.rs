//! The persistent record instance.
//!
//! `FAULT_RECORD` lives in the cortex-m-rt `.uninit` section, so neither the
//! reset handler nor a warm reset touches it. It is written only by the
//! capture routine, which refers to it by symbol name, and by [`clear`].
//!
//! Power-on leaves the section with arbitrary contents. Call [`clear`] at boot
//! whenever [`is_valid`] is false:
//!
//! ```no_run
//! if !fault::storage::is_valid() {
//!     fault::storage::clear();
//! }
//! ```

use core::ptr::{addr_of, addr_of_mut};

use crate::record::FaultRecord;

/// The record. Accessed from Rust only through the volatile helpers below.
#[no_mangle]
#[cfg_attr(target_os = "none", link_section = ".uninit.FAULT_RECORD")]
pub static mut FAULT_RECORD: FaultRecord = FaultRecord::ZERO;

/// Volatile copy of the stored record.
pub fn snapshot() -> FaultRecord {
    // SAFETY: the record is plain old data of `u32` fields, so every bit
    // pattern is valid. Outside fault context nothing writes it concurrently;
    // the capture routine never returns into interrupted code.
    unsafe { addr_of!(FAULT_RECORD).read_volatile() }
}

/// Whether the stored record is complete and intact.
pub fn is_valid() -> bool {
    snapshot().is_valid()
}

/// Faults captured since the last [`clear`].
pub fn occurrence_count() -> u32 {
    snapshot().occurrence_count()
}

/// Zero the stored record, magic number and count included.
pub fn clear() {
    // SAFETY: see `snapshot`; a single volatile store of a valid value.
    unsafe { addr_of_mut!(FAULT_RECORD).write_volatile(FaultRecord::ZERO) };
    #[cfg(target_arch = "arm")]
    cortex_m::asm::dsb();
}

/// Overwrite the stored record. Lets host tests and tools stage a record.
#[cfg(any(test, feature = "std"))]
pub fn store(record: &FaultRecord) {
    // SAFETY: see `snapshot`.
    unsafe { addr_of_mut!(FAULT_RECORD).write_volatile(*record) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{Content, Info};

    // The record is a process-wide static; keep every storage check in one
    // test so the harness cannot interleave them.
    #[test]
    fn store_check_clear() {
        clear();
        assert!(!is_valid());
        assert_eq!(occurrence_count(), 0);

        let mut record = FaultRecord::ZERO;
        record.count = 4;
        record.info = Info::new(Content::empty());
        record.seal();
        store(&record);
        assert!(is_valid());
        assert_eq!(occurrence_count(), 4);
        assert_eq!(snapshot(), record);

        clear();
        assert!(!is_valid());
        assert_eq!(snapshot(), FaultRecord::ZERO);
    }
}
