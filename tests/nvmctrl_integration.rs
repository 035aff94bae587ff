//! End-to-end NVMCTRL programming against a simulated device: exercises
//! the real page-chunking, page-buffer-clear/write-page command sequence,
//! and read-back verification through the actual `SamBa` wire protocol.

use std::collections::{HashMap, VecDeque};

use pretty_assertions::assert_eq;
use sam_loader::error::{Error, Result};
use sam_loader::flash::{FlashController, Nvmctrl};
use sam_loader::samba::SamBa;
use sam_loader::transport::Transport;

const NVM_BASE: u32 = 0x4100_4000;
const FLASH_BASE: u32 = 0x0000_0000;
const PARAM_OFFSET: u32 = 0x0008;
const CTRLB_OFFSET: u32 = 0x0004;
const INTFLAG_OFFSET: u32 = 0x0014;
const CMDA_OFFSET: u32 = 0x0000;
const ADDRESS_OFFSET: u32 = 0x001C;
const CTRLB_MANW: u32 = 1 << 7;
const PAGE_SIZE: u32 = 64;
const PAGES: u32 = 1024;

/// A toy NVMCTRL-equipped device: a flat byte-addressable memory holding
/// flash content plus the controller's registers, reachable only through
/// the real SAM-BA ASCII command grammar. Writes to flash addresses stage
/// into a page latch, like the real peripheral, and only land in `memory`
/// on `WP` -- and only once `CTRLB.MANW` has been set, so a driver that
/// forgets that register write produces flash that reads back erased.
struct NvmctrlDevice {
    memory: HashMap<u32, u8>,
    page_latch: HashMap<u32, u8>,
    ctrlb: u32,
    response: VecDeque<u8>,
}

impl NvmctrlDevice {
    fn new() -> Self {
        let mut memory = HashMap::new();
        // Erased flash reads as 0xFF.
        for addr in FLASH_BASE..FLASH_BASE + PAGE_SIZE * PAGES {
            memory.insert(addr, 0xFF);
        }
        let param = ((3u32) << 16) | PAGES; // 8 << 3 == 64
        Self::set_u32(&mut memory, NVM_BASE + PARAM_OFFSET, param);
        NvmctrlDevice {
            memory,
            page_latch: HashMap::new(),
            ctrlb: 0,
            response: VecDeque::new(),
        }
    }

    fn set_u32(memory: &mut HashMap<u32, u8>, addr: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            memory.insert(addr + i as u32, byte);
        }
    }

    fn get_u32(&self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        for i in 0..4 {
            bytes[i] = *self.memory.get(&(addr + i as u32)).unwrap_or(&0);
        }
        u32::from_le_bytes(bytes)
    }

    fn is_register(addr: u32) -> bool {
        (NVM_BASE..NVM_BASE + 0x20).contains(&addr)
    }

    fn write_word(&mut self, addr: u32, value: u32) {
        if addr == NVM_BASE + CTRLB_OFFSET {
            self.ctrlb = value;
        } else if Self::is_register(addr) {
            Self::set_u32(&mut self.memory, addr, value);
        } else {
            for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
                self.page_latch.insert(addr + i as u32, byte);
            }
        }
    }

    fn set_u16(&mut self, addr: u32, value: u16) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.memory.insert(addr + i as u32, byte);
        }
        if addr == NVM_BASE + CMDA_OFFSET {
            self.handle_command((value & 0xFF) as u8);
        }
    }

    fn get_u16(&self, addr: u32) -> u16 {
        if addr == NVM_BASE + INTFLAG_OFFSET {
            return 1; // always ready in this simulation
        }
        let mut bytes = [0u8; 2];
        for i in 0..2 {
            bytes[i] = *self.memory.get(&(addr + i as u32)).unwrap_or(&0);
        }
        u16::from_le_bytes(bytes)
    }

    fn handle_command(&mut self, command: u8) {
        const CMD_ER: u8 = 0x02;
        const CMD_WP: u8 = 0x04;
        const CMD_PBC: u8 = 0x44;
        match command {
            CMD_ER => {
                let row_offset_half = self.get_u32(NVM_BASE + ADDRESS_OFFSET);
                let row_start = FLASH_BASE + (row_offset_half << 1);
                for addr in row_start..row_start + PAGE_SIZE * 4 {
                    self.memory.insert(addr, 0xFF);
                }
            }
            CMD_PBC => {
                self.page_latch.clear();
            }
            CMD_WP => {
                if self.ctrlb & CTRLB_MANW != 0 {
                    for (addr, byte) in self.page_latch.drain() {
                        self.memory.insert(addr, byte);
                    }
                }
                // Without MANW set, the real part has already auto-committed
                // words as they were written; this simulation just drops the
                // staged latch, leaving the page unprogrammed.
            }
            _ => {}
        }
    }

    fn execute(&mut self, command: &str) {
        let body = command.trim_end_matches('#');
        let letter = body.chars().next().unwrap();
        let rest = &body[1..];
        let args: Vec<u32> = rest
            .trim_end_matches(',')
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| u32::from_str_radix(s, 16).unwrap())
            .collect();

        match letter {
            'N' => self.response.extend([0, 0]),
            'W' => self.write_word(args[0], args[1]),
            'w' => self.response.extend(self.get_u32(args[0]).to_le_bytes()),
            'H' => self.set_u16(args[0], args[1] as u16),
            'h' => self.response.extend(self.get_u16(args[0]).to_le_bytes()),
            'R' => {
                let (address, length) = (args[0], args[1]);
                for addr in address..address + length {
                    self.response.push_back(*self.memory.get(&addr).unwrap_or(&0xFF));
                }
            }
            'G' => {}
            _ => panic!("unsupported command in test device: {letter}"),
        }
    }
}

impl Transport for NvmctrlDevice {
    fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        (0..length)
            .map(|_| self.response.pop_front().ok_or(Error::Timeout))
            .collect()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let command = std::str::from_utf8(data).unwrap().to_string();
        self.execute(&command);
        Ok(())
    }
}

#[test]
fn programs_and_verifies_a_multi_page_buffer() {
    let samba = SamBa::new(NvmctrlDevice::new(), true).unwrap();
    let shared = std::rc::Rc::new(std::cell::RefCell::new(samba));
    let mut flash = Nvmctrl::new(shared, NVM_BASE, FLASH_BASE).unwrap();

    let data = vec![0xAAu8; 260]; // spans 5 pages at a 64-byte page size
    let ok = flash.program_flash(&data, Some(FLASH_BASE)).unwrap();
    assert!(ok);

    let readback = flash.read_flash(Some(FLASH_BASE), Some(data.len() as u32)).unwrap();
    assert_eq!(readback, data);
}

#[test]
fn new_sets_ctrlb_manw_so_page_writes_actually_commit() {
    let device = NvmctrlDevice::new();
    let samba = SamBa::new(device, true).unwrap();
    let shared = std::rc::Rc::new(std::cell::RefCell::new(samba));
    let mut flash = Nvmctrl::new(shared.clone(), NVM_BASE, FLASH_BASE).unwrap();

    assert_eq!(
        shared.borrow_mut().read_word(NVM_BASE + CTRLB_OFFSET).unwrap() & CTRLB_MANW,
        CTRLB_MANW,
        "Nvmctrl::new must set CTRLB.MANW before any page write is attempted"
    );

    let data = vec![0x42u8; PAGE_SIZE as usize];
    let ok = flash.program_flash(&data, Some(FLASH_BASE)).unwrap();
    assert!(ok);
    let readback = flash
        .read_flash(Some(FLASH_BASE), Some(data.len() as u32))
        .unwrap();
    assert_eq!(readback, data);
}

#[test]
fn erase_resets_touched_rows_to_erased_state() {
    let samba = SamBa::new(NvmctrlDevice::new(), true).unwrap();
    let shared = std::rc::Rc::new(std::cell::RefCell::new(samba));
    let mut flash = Nvmctrl::new(shared, NVM_BASE, FLASH_BASE).unwrap();

    let data = vec![0x00u8; 64];
    flash.program_flash(&data, Some(FLASH_BASE)).unwrap();
    flash.erase_flash(Some(FLASH_BASE)).unwrap();

    let readback = flash.read_flash(Some(FLASH_BASE), Some(64)).unwrap();
    assert_eq!(readback, vec![0xFFu8; 64]);
}
