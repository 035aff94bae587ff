//! The Session façade: sequences probe → identify → select a part, then
//! exposes the read/program/verify/erase/reset operations a caller wants
//! without them needing to know which family they're talking to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::identifiers::{self, IdentifiedRegisters};
use crate::part::{self, Part};
use crate::samba::SamBa;
use crate::transport::Transport;

pub struct Session<T: Transport> {
    samba: Rc<RefCell<SamBa<T>>>,
    part: Option<Box<dyn Part>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, is_usb: bool) -> Result<Self> {
        let samba = SamBa::new(transport, is_usb)?;
        Ok(Session {
            samba: Rc::new(RefCell::new(samba)),
            part: None,
        })
    }

    pub fn probe(&mut self, address_overrides: &HashMap<String, u32>) -> Result<IdentifiedRegisters> {
        identifiers::identify(&mut self.samba.borrow_mut(), address_overrides)
    }

    pub fn select_part(&mut self, ids: &IdentifiedRegisters) -> Result<()> {
        let part = part::select(self.samba.clone(), ids)?;
        self.part = Some(part);
        Ok(())
    }

    fn part_mut(&mut self) -> Result<&mut dyn Part> {
        self.part
            .as_deref_mut()
            .ok_or(crate::error::Error::UnknownPart)
    }

    pub fn info(&mut self) -> Result<String> {
        self.part_mut()?.info()
    }

    pub fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>> {
        self.part_mut()?.read_flash(address, length)
    }

    pub fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.part_mut()?.program_flash(data, address)
    }

    pub fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool> {
        self.part_mut()?.verify_flash(data, address)
    }

    pub fn erase(&mut self, address: Option<u32>) -> Result<()> {
        self.part_mut()?.erase_chip(address)
    }

    pub fn set_flash_boot(&mut self) -> Result<()> {
        self.part_mut()?.set_flash_boot()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.part_mut()?.reset()
    }

    pub fn run_application(&mut self, address: Option<u32>) -> Result<()> {
        self.part_mut()?.run_application(address)
    }

    pub fn part_name(&self) -> Option<&'static str> {
        self.part.as_deref().map(|p| p.name())
    }
}
