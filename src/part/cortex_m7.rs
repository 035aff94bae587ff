//! Cortex-M7 family (SAMV): a single EEFC flash plane at the chip's only
//! flash base address, no distinct bootloader reservation.

use crate::error::{Error, Result};
use crate::flash::{Eefc, FlashController};
use crate::part::Part;
use crate::rstc::Rstc;
use crate::samba::SharedSamBa;
use crate::transport::Transport;

const GPNVM_FLASH_BOOT_MASK: u32 = 0x2;

pub struct CortexM7Part<T: Transport> {
    name: &'static str,
    samba: SharedSamBa<T>,
    flash: Eefc<T>,
    reset_controller: Option<Rstc<T>>,
}

impl<T: Transport> CortexM7Part<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        samba: SharedSamBa<T>,
        flash_base: u32,
        regs_base: u32,
        reset_base: Option<u32>,
        flash_total_length: u32,
        page_size: u32,
    ) -> Result<Self> {
        let flash = Eefc::new(
            samba.clone(),
            flash_base,
            regs_base,
            flash_total_length / page_size,
            page_size,
            false,
        )?;
        Ok(CortexM7Part {
            name,
            samba: samba.clone(),
            flash,
            reset_controller: reset_base.map(|base| Rstc::new(samba, base)),
        })
    }
}

impl<T: Transport> Part for CortexM7Part<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn info(&mut self) -> Result<String> {
        let gpnvm = self.flash.read_gpnvm()?;
        Ok(format!("{} (Cortex-M7, GPNVM={gpnvm:#010x})", self.name))
    }

    fn erase_chip(&mut self, address: Option<u32>) -> Result<()> {
        self.flash.erase_flash(address)
    }

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.flash.program_flash(data, address)
    }

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.flash.verify_flash(data, address)
    }

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        self.flash.read_flash(address, length)
    }

    fn run_application(&mut self, address: Option<u32>) -> Result<()> {
        let address = address.unwrap_or(self.flash.address_range().start);
        self.samba.borrow_mut().run_from_address(address)
    }

    fn set_flash_boot(&mut self) -> Result<()> {
        self.flash.set_gpnvm(GPNVM_FLASH_BOOT_MASK)?;
        let gpnvm = self.flash.read_gpnvm()?;
        if gpnvm & GPNVM_FLASH_BOOT_MASK == 0 {
            return Err(Error::CannotSetFlashBoot { gpnvm });
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        match &mut self.reset_controller {
            Some(rstc) => rstc.reset(0xD),
            None => {
                log::warn!("no reset controller for this part");
                Ok(())
            }
        }
    }
}
