//! Decoders for the three chip-identification register layouts this tool
//! knows about, and the probe pipeline that populates them from a live
//! session.

mod chipid;
mod cpuid;
mod dsu;

pub use chipid::ChipId;
pub use cpuid::Cpuid;
pub use dsu::Dsu;

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use crate::samba::SamBa;
use crate::transport::Transport;

pub const CPUID_ADDRESS: u32 = 0xE000_ED00;
pub const CHIPID_ADDRESSES: [u32; 2] = [0x400E_0740, 0x400E_0940];
pub const DSU_ADDRESS: u32 = 0x4100_2000;

/// Identifier registers read back from the device. `chipid` and `dsu` are
/// mutually exclusive in practice (a part has one or the other), but both
/// are modeled as optional so the pipeline stays a pure function of what it
/// actually read.
#[derive(Debug, Clone, Default)]
pub struct IdentifiedRegisters {
    pub cpuid: Option<Cpuid>,
    pub chipid: Option<ChipId>,
    pub dsu: Option<Dsu>,
}

fn read_nonzero<T: Transport>(samba: &mut SamBa<T>, address: u32) -> Result<Option<u32>> {
    let word = samba.read_word(address)?;
    Ok(if word == 0 { None } else { Some(word) })
}

/// Runs the identification pipeline: read CPUID, then dispatch to DSU (for
/// Cortex-M0+ parts) or scan the CHIPID candidate addresses.
///
/// `address_overrides` replaces the candidate address(es) for a named
/// register ("CPUID", "CHIPID", "DSU") when present.
pub fn identify<T: Transport>(
    samba: &mut SamBa<T>,
    address_overrides: &HashMap<String, u32>,
) -> Result<IdentifiedRegisters> {
    let cpuid_address = address_overrides
        .get("CPUID")
        .copied()
        .unwrap_or(CPUID_ADDRESS);
    let cpuid_word = samba.read_word(cpuid_address)?;
    if cpuid_word == 0 {
        return Err(Error::CannotRecognizeChip {
            register: "CPUID",
            addresses_tried: vec![cpuid_address],
        });
    }
    let cpuid = Cpuid::decode(cpuid_word);
    debug!("cpuid = {cpuid:?}");

    let mut identified = IdentifiedRegisters {
        cpuid: Some(cpuid),
        chipid: None,
        dsu: None,
    };

    if cpuid.is_cortex_m0_plus() {
        let dsu_address = address_overrides
            .get("DSU")
            .copied()
            .unwrap_or(DSU_ADDRESS);
        let chip_id = read_nonzero(samba, dsu_address + Dsu::CHIP_ID_OFFSET)?.ok_or(
            Error::CannotRecognizeChip {
                register: "DSU",
                addresses_tried: vec![dsu_address],
            },
        )?;
        identified.dsu = Some(Dsu::decode(dsu_address, chip_id));
    } else {
        let candidates: Vec<u32> = match address_overrides.get("CHIPID") {
            Some(address) => vec![*address],
            None => CHIPID_ADDRESSES.to_vec(),
        };
        let mut found = None;
        for &address in &candidates {
            if let Some(cidr) = read_nonzero(samba, address)? {
                let exid = samba.read_word(address + 0x0004)?;
                found = Some(ChipId::decode(address, cidr, exid));
                break;
            }
        }
        identified.chipid = Some(found.ok_or(Error::CannotRecognizeChip {
            register: "CHIPID",
            addresses_tried: candidates,
        })?);
    }

    Ok(identified)
}
