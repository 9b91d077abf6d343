//! Fault capture demo firmware for the STM32H743 (Cortex-M7).
//!
//! Each press of the user button raises the next kind of fault. The capture
//! routine records it and resets; on the next boot the record is forwarded
//! over defmt/RTT, identified, and cleared.
//!
//! ```text
//! boot ──► boot::hardware::take_previous_fault ──► DefmtSink ──► clear
//!   │
//!   ▼
//! exception_handlers::hardware::apply ──► wait for button ──► inject::trigger
//!                                                                 │
//!                          FaultCapture ◄── HardFault/MemManage/BusFault/UsageFault
//!                               │
//!                               ▼
//!                          FaultExit (reset)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the STM32H743 target (embassy, defmt, cortex-m-rt)
//! - `std` - Host builds and tests
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod boot;
pub mod exception_handlers;
pub mod inject;

pub use boot::PreviousFault;
pub use exception_handlers::FaultEnables;
pub use inject::FaultKind;
