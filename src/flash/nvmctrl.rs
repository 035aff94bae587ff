//! NVMCTRL driver for Cortex-M0+ parts (SAM D/L/C). Flash is directly
//! addressable for reads; writes go through a page-buffer latch.

use log::{debug, info};

use crate::address_range::AddressRange;
use crate::error::Result;
use crate::flash::{resolve_address, resolve_length, FlashController};
use crate::samba::SharedSamBa;
use crate::transport::Transport;

const CMDA_OFFSET: u32 = 0x0000;
const CTRLB_OFFSET: u32 = 0x0004;
const PARAM_OFFSET: u32 = 0x0008;
const INTFLAG_OFFSET: u32 = 0x0014;
const ADDRESS_OFFSET: u32 = 0x001C;

const INTFLAG_READY: u16 = 1 << 0;
const CTRLB_MANW: u32 = 1 << 7;

const CMD_ER: u8 = 0x02;
const CMD_WP: u8 = 0x04;
const CMD_PBC: u8 = 0x44;

const PAGES_PER_ROW: u32 = 4;

pub struct Nvmctrl<T: Transport> {
    samba: SharedSamBa<T>,
    base_address: u32,
    range: AddressRange,
}

impl<T: Transport> Nvmctrl<T> {
    pub fn new(samba: SharedSamBa<T>, base_address: u32, flash_start: u32) -> Result<Self> {
        let (page_size, pages) = Self::discover_params(&samba, base_address)?;
        let range = AddressRange::new(flash_start, page_size * pages, Some(page_size));
        samba
            .borrow_mut()
            .write_word(base_address + CTRLB_OFFSET, CTRLB_MANW)?;
        Ok(Nvmctrl {
            samba,
            base_address,
            range,
        })
    }

    fn discover_params(samba: &SharedSamBa<T>, base_address: u32) -> Result<(u32, u32)> {
        let param = samba.borrow_mut().read_word(base_address + PARAM_OFFSET)?;
        let page_size = 8u32 << ((param >> 16) & 0x7);
        let pages = param & 0xFFFF;
        Ok((page_size, pages))
    }

    fn wait_while_busy(&mut self) -> Result<()> {
        loop {
            let flag = self
                .samba
                .borrow_mut()
                .read_half_word(self.base_address + INTFLAG_OFFSET)?;
            if flag & INTFLAG_READY != 0 {
                return Ok(());
            }
        }
    }

    fn command(&mut self, command: u8) -> Result<()> {
        self.wait_while_busy()?;
        let reg = (0xA5u16 << 8) | command as u16;
        self.samba
            .borrow_mut()
            .write_half_word(self.base_address + CMDA_OFFSET, reg)
    }
}

impl<T: Transport> FlashController for Nvmctrl<T> {
    fn address_range(&self) -> &AddressRange {
        &self.range
    }

    fn erase_flash(&mut self, start_address: Option<u32>) -> Result<()> {
        let page_size = self.range.page_size.expect("page size not yet discovered");
        let row_size = page_size * PAGES_PER_ROW;
        let start = resolve_address(&self.range, start_address);
        let aligned_start = start - (start - self.range.start) % row_size;
        let mut address = aligned_start;
        while address < self.range.end() {
            let row_offset = address - self.range.start;
            self.samba
                .borrow_mut()
                .write_word(self.base_address + ADDRESS_OFFSET, row_offset >> 1)?;
            self.command(CMD_ER)?;
            address += row_size;
        }
        self.wait_while_busy()
    }

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = resolve_address(&self.range, address);
        self.range.check_in_range(start, data.len() as u32)?;
        info!("nvmctrl program: {start:#010x}..+{}", data.len());

        self.command(CMD_PBC)?;

        let chunks = self.range.get_page_chunks(data, start);
        for (page_index, chunk) in chunks.into_iter().enumerate() {
            let Some((chunk_address, chunk_data)) = chunk else {
                continue;
            };
            debug!("nvmctrl write page {page_index} @ {chunk_address:#010x}");
            for (i, word) in chunk_data.chunks(4).enumerate() {
                let mut bytes = [0u8; 4];
                bytes[..word.len()].copy_from_slice(word);
                let value = u32::from_le_bytes(bytes);
                self.samba
                    .borrow_mut()
                    .write_word(chunk_address + (i as u32) * 4, value)?;
            }
            self.command(CMD_WP)?;
        }

        self.verify_flash(data, Some(start))
    }

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = resolve_address(&self.range, address);
        let actual = self.read_flash(Some(start), Some(data.len() as u32))?;
        let matches = actual == data;
        if matches {
            info!("nvmctrl verify {start:#010x}..+{}: OK", data.len());
        } else {
            log::error!("nvmctrl verify {start:#010x}..+{}: FAIL", data.len());
        }
        Ok(matches)
    }

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        let start = resolve_address(&self.range, address);
        self.range.check_in_range(start, 0)?;
        let length = resolve_length(&self.range, start, length)?;
        self.range.check_in_range(start, length)?;
        self.samba.borrow_mut().read_block(start, length as usize)
    }
}
