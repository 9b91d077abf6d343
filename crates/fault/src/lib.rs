//! Fault capture and decode for Cortex-M.
//!
//! On a fault, the capture engine copies the processor state into a single
//! 144-byte record in non-initialized RAM, seals it with a CRC-32 and a magic
//! number, and hands over to an exit policy (system reset by default). After
//! the reset, application code checks the record, decodes it and clears it.
//!
//! ```text
//! fault exception ──► FaultCapture (asm, no stack) ──► FaultExit (reset)
//!                              │
//!                              ▼
//!                      FAULT_RECORD (.uninit)
//!                              │
//! next boot ──► storage::is_valid ──► decode / sink::emit / report ──► storage::clear
//! ```
//!
//! # Modules
//!
//! - [`record`], [`layout`], [`info`], [`crc`]: the record and its byte layout
//! - [`storage`]: the persistent instance
//! - `capture` (Arm targets): the capture routine, default exit policy and
//!   [`bind_fault_handlers!`]
//! - [`decode`], [`exc_return`]: diagnostic entries, register view, summary
//! - [`sink`], [`report`]: forwarding to an event logger, text rendering
//! - [`variant`]: the build-time architecture and TrustZone configuration
//! - [`emulate`]: host model of the capture sequence
//!
//! # Features
//!
//! - `armv8_1m` - Armv8.1-M Mainline target: capture RFSR
//! - `trustzone` - the device implements the Security Extension
//! - `secure` - image runs Secure; reads Non-secure aliases when the fault came
//!   from Non-secure state (needs `-C target-feature=+trustzone`)
//! - `defmt` - `defmt::Format` on public types and [`sink::DefmtSink`]
//! - `std` - host helpers such as [`storage::store`]
//!
//! # Boot-time usage
//!
//! ```no_run
//! use fault::{report::Report, storage};
//!
//! if storage::is_valid() {
//!     let record = storage::snapshot();
//!     println!("{}", Report(&record));
//! }
//! storage::clear();
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
// Register fields are manipulated with shifts and masks throughout.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)]

#[cfg(target_arch = "arm")]
pub mod capture;
pub mod crc;
pub mod decode;
pub mod emulate;
pub mod exc_return;
pub mod info;
pub mod layout;
pub mod record;
pub mod report;
pub mod sink;
pub mod storage;
pub mod variant;

pub use decode::{decode, FaultEntry};
pub use info::{Content, Info};
pub use record::{FaultRecord, RecordError};
pub use variant::{Arch, TrustZone, Variant};
