//! End-to-end EEFC programming against a simulated device: exercises the
//! read-compare-skip fast path, need-erase detection, and keyed FCR command
//! sequencing through the real `SamBa` wire protocol.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use sam_loader::error::{Error, Result};
use sam_loader::flash::{Eefc, FlashController};
use sam_loader::samba::SamBa;
use sam_loader::transport::Transport;

const REGS_BASE: u32 = 0x400E_0A00;
const FLASH_BASE: u32 = 0x0008_0000;
const PAGE_SIZE: u32 = 256;
const PAGES: u32 = 4;
const FCR_OFFSET: u32 = 0x04;
const FSR_OFFSET: u32 = 0x08;
const FSR_FRDY: u32 = 1;
const CMD_EA: u8 = 0x05;

struct EefcDevice {
    memory: HashMap<u32, u8>,
    response: VecDeque<u8>,
}

impl EefcDevice {
    fn new() -> Self {
        let mut memory = HashMap::new();
        for addr in FLASH_BASE..FLASH_BASE + PAGE_SIZE * PAGES {
            memory.insert(addr, 0xFF);
        }
        EefcDevice {
            memory,
            response: VecDeque::new(),
        }
    }

    fn set_u32(&mut self, addr: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.memory.insert(addr + i as u32, byte);
        }
        if addr == REGS_BASE + FCR_OFFSET {
            let command = (value & 0xFF) as u8;
            if command == CMD_EA {
                for a in FLASH_BASE..FLASH_BASE + PAGE_SIZE * PAGES {
                    self.memory.insert(a, 0xFF);
                }
            }
        }
    }

    fn get_u32(&self, addr: u32) -> u32 {
        if addr == REGS_BASE + FSR_OFFSET {
            return FSR_FRDY;
        }
        let mut bytes = [0u8; 4];
        for i in 0..4 {
            bytes[i] = *self.memory.get(&(addr + i as u32)).unwrap_or(&0);
        }
        u32::from_le_bytes(bytes)
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
            'W' => self.set_u32(args[0], args[1]),
            'w' => self.response.extend(self.get_u32(args[0]).to_le_bytes()),
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

impl Transport for EefcDevice {
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

fn new_eefc() -> Eefc<EefcDevice> {
    let samba = SamBa::new(EefcDevice::new(), true).unwrap();
    let shared = Rc::new(RefCell::new(samba));
    Eefc::new(shared, FLASH_BASE, REGS_BASE, PAGES, PAGE_SIZE, false).unwrap()
}

#[test]
fn programs_a_buffer_spanning_two_pages() {
    let mut flash = new_eefc();
    let data: Vec<u8> = (0u16..300).map(|b| (b % 256) as u8).collect();

    let ok = flash.program_flash(&data, Some(FLASH_BASE)).unwrap();
    assert!(ok);

    let readback = flash.read_flash(Some(FLASH_BASE), Some(data.len() as u32)).unwrap();
    assert_eq!(readback, data);
}

#[test]
fn rewriting_identical_contents_is_a_no_op_that_still_verifies() {
    let mut flash = new_eefc();
    let data = vec![0x42u8; PAGE_SIZE as usize];

    assert!(flash.program_flash(&data, Some(FLASH_BASE)).unwrap());
    // Second call: read-compare-skip fast path should take over with no error.
    assert!(flash.program_flash(&data, Some(FLASH_BASE)).unwrap());
}

#[test]
fn chip_erase_restores_the_erased_state() {
    let mut flash = new_eefc();
    let data = vec![0x00u8; PAGE_SIZE as usize];
    flash.program_flash(&data, Some(FLASH_BASE)).unwrap();

    flash.erase_flash(None).unwrap();

    let readback = flash.read_flash(Some(FLASH_BASE), Some(PAGE_SIZE)).unwrap();
    assert_eq!(readback, vec![0xFFu8; PAGE_SIZE as usize]);
}

#[test]
fn sector_erase_is_rejected() {
    let mut flash = new_eefc();
    let err = flash.erase_flash(Some(FLASH_BASE)).unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }));
}
