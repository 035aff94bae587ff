//! Host-side programmer for Atmel SAM microcontrollers that speak the
//! SAM-BA ROM bootloader protocol: chip identification, flash
//! erase/program/verify/read, GPNVM, and reset, across the Cortex-M0+
//! (NVMCTRL), Cortex-M3/M4, and Cortex-M7 (EEFC) families.

pub mod address_range;
pub mod cli;
pub mod error;
pub mod file_format;
pub mod flash;
pub mod identifiers;
pub mod part;
pub mod rstc;
pub mod samba;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
