//! EEFC driver for Cortex-M3/M4/M7 parts (SAM3A/X, SAM4S, SAMV). Flash is
//! programmed through a page-latch buffer with keyed command registers.

use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::address_range::AddressRange;
use crate::error::{Error, Result};
use crate::flash::{resolve_address, resolve_length, FlashController};
use crate::samba::SharedSamBa;
use crate::transport::Transport;

const FMR_OFFSET: u32 = 0x00;
const FCR_OFFSET: u32 = 0x04;
const FSR_OFFSET: u32 = 0x08;
const FRR_OFFSET: u32 = 0x0C;

const FCR_FKEY: u32 = 0x5A00_0000;

const FSR_FRDY: u32 = 1;
const FSR_ERROR_MASK: u32 = 0xF & !FSR_FRDY;

const CMD_GETD: u8 = 0x00;
const CMD_WP: u8 = 0x01;
const CMD_EWP: u8 = 0x03;
const CMD_EA: u8 = 0x05;
const CMD_SGPB: u8 = 0x0B;
const CMD_CGPB: u8 = 0x0C;
const CMD_GGPB: u8 = 0x0D;
const CMD_STUI: u8 = 0x0E;
const CMD_SPUI: u8 = 0x0F;

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);
const DESCRIPTOR_TIMEOUT: Duration = Duration::from_millis(500);
const POLL_SLEEP: Duration = Duration::from_millis(1);

pub struct Eefc<T: Transport> {
    samba: SharedSamBa<T>,
    regs_base_address: u32,
    range: AddressRange,
    dont_use_read_block: bool,
}

impl<T: Transport> Eefc<T> {
    pub fn new(
        samba: SharedSamBa<T>,
        flash_base_address: u32,
        regs_base_address: u32,
        pages: u32,
        page_size: u32,
        dont_use_read_block: bool,
    ) -> Result<Self> {
        // SAM3 bugfix: configure flash wait states before any command.
        samba
            .borrow_mut()
            .write_word(regs_base_address + FMR_OFFSET, 0x6 << 8)?;
        let range = AddressRange::new(flash_base_address, pages * page_size, Some(page_size));
        Ok(Eefc {
            samba,
            regs_base_address,
            range,
            dont_use_read_block,
        })
    }

    fn wait_while_busy(&mut self) -> Result<()> {
        let start = Instant::now();
        let mut logged = false;
        loop {
            let fsr = self
                .samba
                .borrow_mut()
                .read_word(self.regs_base_address + FSR_OFFSET)?;
            if fsr & FSR_FRDY != 0 {
                return Ok(());
            }
            if !logged {
                debug!("eefc busy");
                logged = true;
            }
            if start.elapsed() >= BUSY_TIMEOUT {
                return Err(Error::CommandError {
                    fsr_address: self.regs_base_address + FSR_OFFSET,
                    fsr,
                });
            }
            std::thread::sleep(POLL_SLEEP);
        }
    }

    fn command(&mut self, command: u8, farg: u16, do_not_wait: bool) -> Result<()> {
        if !do_not_wait {
            self.wait_while_busy()?;
        }
        let reg = FCR_FKEY | ((farg as u32) << 8) | command as u32;
        self.samba
            .borrow_mut()
            .write_word(self.regs_base_address + FCR_OFFSET, reg)?;
        let fsr = self
            .samba
            .borrow_mut()
            .read_word(self.regs_base_address + FSR_OFFSET)?;
        if fsr & FSR_ERROR_MASK != 0 {
            return Err(Error::CommandError {
                fsr_address: self.regs_base_address + FSR_OFFSET,
                fsr: fsr & FSR_ERROR_MASK,
            });
        }
        Ok(())
    }

    fn read_block_raw(&mut self, address: u32, length: usize) -> Result<Vec<u8>> {
        if self.dont_use_read_block {
            self.read_by_word(address, length)
        } else {
            self.samba.borrow_mut().read_block(address, length)
        }
    }

    /// SAM3 quirk: `read_block` over SAM-BA returns all zeros on some
    /// silicon revisions mid-operation, so fall back to word reads.
    fn read_by_word(&mut self, address: u32, length: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(length);
        let mut addr = address;
        let mut remaining = length;

        if addr % 4 != 0 {
            let aligned = addr - addr % 4;
            let word = self.samba.borrow_mut().read_word(aligned)?.to_le_bytes();
            let offset = (addr % 4) as usize;
            let take = remaining.min(4 - offset);
            out.extend_from_slice(&word[offset..offset + take]);
            remaining -= take;
            addr += take as u32;
        }

        while remaining > 0 {
            let word = self.samba.borrow_mut().read_word(addr)?.to_le_bytes();
            let take = remaining.min(4);
            out.extend_from_slice(&word[..take]);
            remaining -= take;
            addr += 4;
        }

        Ok(out)
    }

    pub fn read_gpnvm(&mut self) -> Result<u32> {
        self.command(CMD_GGPB, 0, false)?;
        self.wait_while_busy()?;
        self.samba
            .borrow_mut()
            .read_word(self.regs_base_address + FRR_OFFSET)
    }

    pub fn set_gpnvm(&mut self, bits_mask: u32) -> Result<()> {
        for bit in 0..32 {
            if bits_mask & (1 << bit) != 0 {
                self.command(CMD_SGPB, bit, false)?;
            }
        }
        Ok(())
    }

    pub fn clear_gpnvm(&mut self, bits_mask: u32) -> Result<()> {
        for bit in 0..32 {
            if bits_mask & (1 << bit) != 0 {
                self.command(CMD_CGPB, bit, false)?;
            }
        }
        Ok(())
    }

    pub fn read_descriptor(&mut self) -> Result<Vec<u32>> {
        self.command(CMD_GETD, 0, false)?;
        self.wait_while_busy()?;
        let start = Instant::now();
        let mut descriptor = Vec::new();
        loop {
            if start.elapsed() >= DESCRIPTOR_TIMEOUT {
                return Err(Error::Connection {
                    reason: "get flash descriptor timed out".into(),
                });
            }
            let word = self
                .samba
                .borrow_mut()
                .read_word(self.regs_base_address + FRR_OFFSET)?;
            if word == 0 {
                return Ok(descriptor);
            }
            descriptor.push(word);
        }
    }

    pub fn read_unique_identifier_area(&mut self) -> Result<Vec<u8>> {
        self.command(CMD_STUI, 0, false)?;
        // FRDY is not set while STUI is active; no busy-wait here.
        let area = self.read_block_raw(self.range.start, 16)?;
        self.command(CMD_SPUI, 0, true)?;
        Ok(area)
    }
}

impl<T: Transport> FlashController for Eefc<T> {
    fn address_range(&self) -> &AddressRange {
        &self.range
    }

    fn erase_flash(&mut self, start_address: Option<u32>) -> Result<()> {
        if start_address.is_some() {
            return Err(Error::Unsupported {
                operation: "sector or page erase on EEFC",
            });
        }
        self.command(CMD_EA, 0, false)
    }

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = resolve_address(&self.range, address);
        self.range.check_in_range(start, data.len() as u32)?;
        info!("eefc program: {start:#010x}..+{}", data.len());

        let page_size = self.range.page_size.expect("page size not yet discovered");
        self.wait_while_busy()?;
        let chunks = self.range.get_page_chunks(data, start);
        for chunk in chunks.into_iter() {
            let Some((chunk_address, chunk_data)) = chunk else {
                continue;
            };
            let mut chunk_address = chunk_address;
            let mut chunk_data = chunk_data.to_vec();

            let current = self.read_block_raw(chunk_address, chunk_data.len())?;
            if current == chunk_data {
                info!("eefc page {chunk_address:#010x} unchanged, skipping write");
                continue;
            }

            let need_erase = current
                .iter()
                .zip(chunk_data.iter())
                .any(|(actual, wanted)| actual & wanted != *wanted);
            let align_bytes = if need_erase { page_size } else { 4 };

            if chunk_address % align_bytes != 0 {
                let new_address = chunk_address - chunk_address % align_bytes;
                let prefix_len = (chunk_address % align_bytes) as usize;
                let prefix = self.read_block_raw(new_address, prefix_len)?;
                let mut padded = prefix;
                padded.extend_from_slice(&chunk_data);
                chunk_data = padded;
                chunk_address = new_address;
            }
            if chunk_data.len() as u32 % align_bytes != 0 {
                let pad_len = align_bytes - (chunk_data.len() as u32 % align_bytes);
                let suffix = self.read_block_raw(
                    chunk_address + chunk_data.len() as u32,
                    pad_len as usize,
                )?;
                chunk_data.extend_from_slice(&suffix);
            }

            for (i, word) in chunk_data.chunks(4).enumerate() {
                let mut bytes = [0u8; 4];
                bytes[..word.len()].copy_from_slice(word);
                let value = u32::from_le_bytes(bytes);
                self.samba
                    .borrow_mut()
                    .write_word(chunk_address + (i as u32) * 4, value)?;
            }

            let command = if need_erase { CMD_EWP } else { CMD_WP };
            let farg = (chunk_address / page_size) as u16;
            self.command(command, farg, false)?;
            self.wait_while_busy()?;

            if !self.verify_flash(&chunk_data, Some(chunk_address))? {
                return Err(Error::FlashWriteError {
                    page_address: chunk_address,
                    range: self.range,
                });
            }
        }

        self.verify_flash(data, Some(start))
    }

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        let start = resolve_address(&self.range, address);
        let actual = self.read_flash(Some(start), Some(data.len() as u32))?;
        let matches = actual == data;
        if matches {
            info!("eefc verify {start:#010x}..+{}: OK", data.len());
        } else {
            error!("eefc verify {start:#010x}..+{}: FAIL", data.len());
        }
        Ok(matches)
    }

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        let start = resolve_address(&self.range, address);
        self.range.check_in_range(start, 0)?;
        let length = resolve_length(&self.range, start, length)?;
        self.range.check_in_range(start, length)?;
        self.read_block_raw(start, length as usize)
    }
}
