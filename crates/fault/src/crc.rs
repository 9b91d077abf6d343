//! CRC-32 over the fault record.
//!
//! Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, MSB first, no reflection
//! and no final XOR (the CRC-32/MPEG-2 parameter set). Must stay bit-for-bit
//! identical to the loop in the capture engine's assembly.

use crate::layout::{CRC32_INIT, CRC32_POLYNOMIAL};

/// Continue a CRC-32 computation over `data`, starting from `crc`.
#[allow(clippy::indexing_slicing)] // i < data.len(); iterators are not const
pub const fn update(mut crc: u32, data: &[u8]) -> u32 {
    let mut i = 0;
    while i < data.len() {
        crc ^= (data[i] as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        i += 1;
    }
    crc
}

/// CRC-32 of `data` with the record's initial value.
pub const fn checksum(data: &[u8]) -> u32 {
    update(CRC32_INIT, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value_matches_catalogue() {
        assert_eq!(checksum(b"123456789"), 0x0376_E6E7);
    }

    #[test]
    fn empty_input_is_initial_value() {
        assert_eq!(checksum(&[]), CRC32_INIT);
    }

    #[test]
    fn update_is_incremental() {
        let whole = checksum(b"fault record");
        let split = update(checksum(b"fault "), b"record");
        assert_eq!(whole, split);
    }
}
