//! Cortex-M3/M4 family (SAM3A/X, SAM4S): one or two independently
//! controlled EEFC flash planes, a GPNVM boot-source bit, and a reset
//! controller. The family's top-level [`AddressRange`] uses one "page" per
//! plane, reusing the same chunking algebra that each plane's controller
//! uses at true hardware-page granularity.

use crate::address_range::AddressRange;
use crate::error::{Error, Result};
use crate::flash::{Eefc, FlashController};
use crate::part::Part;
use crate::rstc::Rstc;
use crate::samba::SharedSamBa;
use crate::transport::Transport;

/// Boot-from-flash GPNVM bit (bit 1; mask 0x2).
const GPNVM_FLASH_BOOT_MASK: u32 = 0x2;

pub struct CortexM34Part<T: Transport> {
    name: &'static str,
    samba: SharedSamBa<T>,
    flash_address_range: AddressRange,
    flash_controllers: Vec<Eefc<T>>,
    reset_controller: Option<Rstc<T>>,
}

impl<T: Transport> CortexM34Part<T> {
    /// `flash_planes` is 1 or 2; `flash_total_length` is the whole part's
    /// flash size in bytes; `page_size` is the hardware page size (256 for
    /// SAM3, 512 for SAM4S); `flash_base` / `regs_bases` are per-family.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        samba: SharedSamBa<T>,
        flash_base: u32,
        regs_bases: &[u32],
        reset_base: u32,
        flash_planes: u32,
        flash_total_length: u32,
        page_size: u32,
        dont_use_read_block: bool,
    ) -> Result<Self> {
        let plane_size = flash_total_length / flash_planes;
        let flash_address_range =
            AddressRange::new(flash_base, flash_total_length, Some(plane_size));

        let mut flash_controllers = Vec::with_capacity(flash_planes as usize);
        for plane in 0..flash_planes {
            let plane_base = flash_base + plane * plane_size;
            let regs_base = regs_bases[plane as usize % regs_bases.len()];
            let pages = plane_size / page_size;
            flash_controllers.push(Eefc::new(
                samba.clone(),
                plane_base,
                regs_base,
                pages,
                page_size,
                dont_use_read_block,
            )?);
        }

        Ok(CortexM34Part {
            name,
            samba: samba.clone(),
            flash_address_range,
            flash_controllers,
            reset_controller: Some(Rstc::new(samba, reset_base)),
        })
    }
}

impl<T: Transport> Part for CortexM34Part<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn info(&mut self) -> Result<String> {
        let gpnvm = self.flash_controllers[0].read_gpnvm()?;
        let descriptor = self.flash_controllers[0].read_descriptor()?;
        Ok(format!(
            "{} (Cortex-M3/M4, {} plane(s), GPNVM={gpnvm:#010x}, descriptor={descriptor:?})",
            self.name,
            self.flash_controllers.len()
        ))
    }

    fn erase_chip(&mut self, address: Option<u32>) -> Result<()> {
        for controller in self.flash_controllers.iter_mut() {
            let in_scope = match address {
                None => true,
                Some(address) => controller.address_range().is_in_range(address, 0),
            };
            if in_scope {
                controller.erase_flash(None)?;
            }
        }
        Ok(())
    }

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = address.unwrap_or(self.flash_address_range.start);
        self.flash_address_range
            .check_in_range(start, data.len() as u32)?;
        let planes = self.flash_address_range.get_page_chunks(data, start);
        for (plane_index, plane) in planes.into_iter().enumerate() {
            if let Some((plane_address, plane_data)) = plane {
                if !self.flash_controllers[plane_index]
                    .program_flash(plane_data, Some(plane_address))?
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = address.unwrap_or(self.flash_address_range.start);
        self.flash_address_range
            .check_in_range(start, data.len() as u32)?;
        let planes = self.flash_address_range.get_page_chunks(data, start);
        for (plane_index, plane) in planes.into_iter().enumerate() {
            if let Some((plane_address, plane_data)) = plane {
                if !self.flash_controllers[plane_index]
                    .verify_flash(plane_data, Some(plane_address))?
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        let start = address.unwrap_or(self.flash_address_range.start);
        let length = match length {
            Some(length) => length,
            None => self.flash_address_range.remaining_length(start)?,
        };
        self.flash_address_range.check_in_range(start, length)?;
        let mut out = Vec::with_capacity(length as usize);
        let planes = self.flash_address_range.get_page_addresses(start, length);
        for (plane_index, plane) in planes.into_iter().enumerate() {
            if let Some((plane_address, plane_length)) = plane {
                out.extend(self.flash_controllers[plane_index]
                    .read_flash(Some(plane_address), Some(plane_length))?);
            }
        }
        Ok(out)
    }

    fn run_application(&mut self, address: Option<u32>) -> Result<()> {
        let address = address.unwrap_or(self.flash_address_range.start);
        self.samba.borrow_mut().run_from_address(address)
    }

    fn set_flash_boot(&mut self) -> Result<()> {
        self.flash_controllers[0].set_gpnvm(GPNVM_FLASH_BOOT_MASK)?;
        let gpnvm = self.flash_controllers[0].read_gpnvm()?;
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
