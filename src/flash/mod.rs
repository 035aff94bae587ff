//! The two on-chip flash controller drivers this crate speaks: NVMCTRL for
//! Cortex-M0+ parts, EEFC for Cortex-M3/M4/M7 parts. Both implement the
//! same `FlashController` trait so a [`crate::part::Part`] can hold a plane
//! list without caring which family it belongs to.

mod eefc;
mod nvmctrl;

pub use eefc::Eefc;
pub use nvmctrl::Nvmctrl;

use crate::address_range::AddressRange;
use crate::error::Result;

/// A single flash plane's erase/program/verify/read surface.
pub trait FlashController {
    fn address_range(&self) -> &AddressRange;

    fn erase_flash(&mut self, start_address: Option<u32>) -> Result<()>;

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool>;

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool>;

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>>;
}

fn resolve_address(range: &AddressRange, address: Option<u32>) -> u32 {
    address.unwrap_or(range.start)
}

fn resolve_length(range: &AddressRange, address: u32, length: Option<u32>) -> Result<u32> {
    match length {
        Some(length) => Ok(length),
        None => range.remaining_length(address),
    }
}
