//! Cortex-M0+ family (SAM D/L/C): a single NVMCTRL plane, no GPNVM, no
//! reset controller. These parts have no ROM bootloader application area
//! distinct from user flash, so "erase chip" is massaged into a range
//! erase from just past the resident bootloader to the end of flash.

use crate::error::Result;
use crate::flash::{FlashController, Nvmctrl};
use crate::part::Part;
use crate::samba::SharedSamBa;
use crate::transport::Transport;

const NVMCTRL_BASE_ADDRESS: u32 = 0x4100_4000;
const BOOTLOADER_SIZE: u32 = 2048;
const FLASH_BASE_ADDRESS: u32 = 0x0000_0000;
const FLASH_APP_ADDRESS: u32 = FLASH_BASE_ADDRESS + BOOTLOADER_SIZE;

pub struct CortexM0pPart<T: Transport> {
    name: &'static str,
    samba: SharedSamBa<T>,
    flash: Nvmctrl<T>,
}

impl<T: Transport> CortexM0pPart<T> {
    pub fn new(name: &'static str, samba: SharedSamBa<T>) -> Result<Self> {
        let flash = Nvmctrl::new(samba.clone(), NVMCTRL_BASE_ADDRESS, FLASH_BASE_ADDRESS)?;
        Ok(CortexM0pPart {
            name,
            samba,
            flash,
        })
    }
}

impl<T: Transport> Part for CortexM0pPart<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn info(&mut self) -> Result<String> {
        Ok(format!(
            "{} (Cortex-M0+, NVMCTRL @ {NVMCTRL_BASE_ADDRESS:#010x}, app @ {FLASH_APP_ADDRESS:#010x})",
            self.name
        ))
    }

    fn erase_chip(&mut self, _address: Option<u32>) -> Result<()> {
        self.flash.erase_flash(Some(FLASH_APP_ADDRESS))
    }

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.flash
            .program_flash(data, Some(address.unwrap_or(FLASH_APP_ADDRESS)))
    }

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.flash
            .verify_flash(data, Some(address.unwrap_or(FLASH_APP_ADDRESS)))
    }

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        self.flash
            .read_flash(Some(address.unwrap_or(FLASH_APP_ADDRESS)), length)
    }

    fn run_application(&mut self, address: Option<u32>) -> Result<()> {
        self.samba
            .borrow_mut()
            .run_from_address(address.unwrap_or(FLASH_APP_ADDRESS))
    }
}
