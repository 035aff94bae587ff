//! Reset Controller (RSTC): keyed writes to request a system reset, and
//! plain reads of its status/mode registers.

use log::info;

use crate::error::Result;
use crate::samba::SharedSamBa;
use crate::transport::Transport;

const CR_OFFSET: u32 = 0x00;
const SR_OFFSET: u32 = 0x04;
const MR_OFFSET: u32 = 0x08;

const RSTC_KEY: u32 = 0xA500_0000;

pub struct Rstc<T: Transport> {
    samba: SharedSamBa<T>,
    base_address: u32,
}

impl<T: Transport> Rstc<T> {
    pub fn new(samba: SharedSamBa<T>, base_address: u32) -> Self {
        Rstc {
            samba,
            base_address,
        }
    }

    /// Requests a combined processor + peripheral + external reset by
    /// default (`reg = 0xD`).
    pub fn reset(&mut self, reg: u32) -> Result<()> {
        let value = reg | RSTC_KEY;
        info!("rstc_cr @ {:#010x} = {value:#010x}", self.base_address + CR_OFFSET);
        self.samba
            .borrow_mut()
            .write_word(self.base_address + CR_OFFSET, value)
    }

    pub fn status(&mut self) -> Result<u32> {
        self.samba
            .borrow_mut()
            .read_word(self.base_address + SR_OFFSET)
    }

    pub fn set_mode(&mut self, reg: u32) -> Result<()> {
        let value = reg | RSTC_KEY;
        self.samba
            .borrow_mut()
            .write_word(self.base_address + MR_OFFSET, value)
    }

    pub fn mode(&mut self) -> Result<u32> {
        self.samba
            .borrow_mut()
            .read_word(self.base_address + MR_OFFSET)
    }
}
