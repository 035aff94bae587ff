//! The supported-parts registry: an explicit, centrally maintained list in
//! place of the runtime subclass-discovery the original tool used. Adding a
//! part means adding one entry here.

use crate::error::{Error, Result};
use crate::identifiers::IdentifiedRegisters;
use crate::part::{CortexM0pPart, CortexM34Part, CortexM7Part, Part};
use crate::samba::SharedSamBa;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy)]
pub enum Family {
    /// SAM D/L/C: identified via DSU `(processor, family, series)`.
    CortexM0p { processor: u8, family: u8, series: u8 },
    /// SAM3A/X: identified via masked CHIPID, 256B pages.
    Sam3x {
        chip_id: u32,
        flash_planes: u32,
        flash_total_length_kb: u32,
    },
    /// SAM4S: identified via masked CHIPID, 512B pages.
    Sam4s {
        chip_id: u32,
        flash_planes: u32,
        flash_total_length_kb: u32,
    },
    /// SAMV (Cortex-M7): identified via masked CHIPID, single plane.
    SamV {
        chip_id: u32,
        flash_total_length_kb: u32,
        page_size: u32,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PartEntry {
    pub name: &'static str,
    pub untested: bool,
    pub family: Family,
}

impl PartEntry {
    pub fn identify(&self, ids: &IdentifiedRegisters) -> bool {
        match self.family {
            Family::CortexM0p {
                processor,
                family,
                series,
            } => ids
                .dsu
                .map(|dsu| dsu.processor == processor && dsu.family == family && dsu.series == series)
                .unwrap_or(false),
            Family::Sam3x { chip_id, .. } | Family::Sam4s { chip_id, .. } | Family::SamV { chip_id, .. } => {
                ids.chipid
                    .map(|chipid| chipid.masked_chip_id() == chip_id)
                    .unwrap_or(false)
            }
        }
    }
}

macro_rules! sam3x {
    ($name:ident, $chip_id:expr, $planes:expr, $length_kb:expr, untested: $untested:expr) => {
        PartEntry {
            name: stringify!($name),
            untested: $untested,
            family: Family::Sam3x {
                chip_id: $chip_id,
                flash_planes: $planes,
                flash_total_length_kb: $length_kb,
            },
        }
    };
}

macro_rules! sam4s {
    ($name:ident, $chip_id:expr, $planes:expr, $length_kb:expr, untested: $untested:expr) => {
        PartEntry {
            name: stringify!($name),
            untested: $untested,
            family: Family::Sam4s {
                chip_id: $chip_id,
                flash_planes: $planes,
                flash_total_length_kb: $length_kb,
            },
        }
    };
}

pub const REGISTRY: &[PartEntry] = &[
    PartEntry {
        name: "ATSAMD",
        untested: false,
        family: Family::CortexM0p {
            processor: 1,
            family: 0,
            series: 0,
        },
    },
    PartEntry {
        name: "ATSAML",
        untested: true,
        family: Family::CortexM0p {
            processor: 1,
            family: 1,
            series: 2,
        },
    },
    PartEntry {
        name: "ATSAMC",
        untested: true,
        family: Family::CortexM0p {
            processor: 1,
            family: 2,
            series: 1,
        },
    },
    sam3x!(ATSAM3X8H, 0x286E_0A60, 2, 2 * 256, untested: true),
    sam3x!(ATSAM3X8E, 0x285E_0A60, 2, 2 * 256, untested: false),
    sam3x!(ATSAM3X4E, 0x285B_0960, 2, 2 * 128, untested: true),
    sam3x!(ATSAM3X8C, 0x284E_0A60, 2, 2 * 256, untested: true),
    sam3x!(ATSAM3X4C, 0x28A7_0CE0, 2, 2 * 128, untested: true),
    sam3x!(ATSAM3A8C, 0x283E_0A60, 2, 2 * 256, untested: true),
    sam3x!(ATSAM3A4C, 0x283B_0960, 2, 2 * 128, untested: true),
    sam4s!(ATSAM4SD32C, 0x29A7_0EE0, 2, 2 * 1024, untested: true),
    sam4s!(ATSAM4SD32B, 0x2997_0EE0, 2, 2 * 1024, untested: true),
    sam4s!(ATSAM4SD16C, 0x29A7_0CE0, 2, 1024, untested: false),
    sam4s!(ATSAM4SD16B, 0x2997_0CE0, 2, 1024, untested: true),
    sam4s!(ATSAM4SA16C, 0x28A7_0CE0, 1, 1024, untested: true),
    sam4s!(ATSAM4SA16B, 0x2897_0CE0, 1, 1024, untested: true),
    sam4s!(ATSAM4S16B, 0x289C_0CE0, 1, 1024, untested: true),
    sam4s!(ATSAM4S16C, 0x28AC_0CE0, 1, 1024, untested: true),
    sam4s!(ATSAM4S8B, 0x289C_0AE0, 1, 512, untested: true),
    sam4s!(ATSAM4S8C, 0x28AC_0AE0, 1, 512, untested: true),
    sam4s!(ATSAM4S4C, 0x28AB_09E0, 1, 256, untested: true),
    sam4s!(ATSAM4S4B, 0x289B_09E0, 1, 256, untested: true),
    sam4s!(ATSAM4S4A, 0x288B_09E0, 1, 256, untested: true),
    sam4s!(ATSAM4S2C, 0x28AB_07E0, 1, 128, untested: true),
    sam4s!(ATSAM4S2B, 0x289B_07E0, 1, 128, untested: true),
    sam4s!(ATSAM4S2A, 0x288B_07E0, 1, 128, untested: true),
    PartEntry {
        name: "ATSAMV71Q21",
        untested: true,
        family: Family::SamV {
            chip_id: 0x2102_0E00,
            flash_total_length_kb: 2048,
            page_size: 512,
        },
    },
];

const SAM3X_FLASH_BASE: u32 = 0x0008_0000;
const SAM3X_REGS_BASES: [u32; 2] = [0x400E_0A00, 0x400E_0C00];
const SAM3X_RESET_BASE: u32 = 0x400E_1A00;
const SAM3X_PAGE_SIZE: u32 = 256;

const SAM4S_FLASH_BASE: u32 = 0x0040_0000;
const SAM4S_REGS_BASES: [u32; 2] = [0x400E_0A00, 0x400E_0C00];
const SAM4S_RESET_BASE: u32 = 0x400E_1400;
const SAM4S_PAGE_SIZE: u32 = 512;

const SAMV_FLASH_BASE: u32 = 0x0040_0000;
const SAMV_REGS_BASE: u32 = 0x400E_0C00;

/// Finds the single registry entry matching `ids` and constructs it, or
/// fails if zero or more than one entry matches.
pub fn select<T: Transport>(
    samba: SharedSamBa<T>,
    ids: &IdentifiedRegisters,
) -> Result<Box<dyn Part>> {
    let matches: Vec<&PartEntry> = REGISTRY.iter().filter(|entry| entry.identify(ids)).collect();

    let entry = match matches.as_slice() {
        [] => return Err(Error::UnknownPart),
        [single] => *single,
        many => {
            return Err(Error::AmbiguousPart {
                candidates: many.iter().map(|e| e.name).collect(),
            })
        }
    };

    if entry.untested {
        log::warn!("{} has not been hardware-validated by this tool", entry.name);
    }

    match entry.family {
        Family::CortexM0p { .. } => {
            Ok(Box::new(CortexM0pPart::new(entry.name, samba)?))
        }
        Family::Sam3x {
            flash_planes,
            flash_total_length_kb,
            ..
        } => Ok(Box::new(CortexM34Part::new(
            entry.name,
            samba,
            SAM3X_FLASH_BASE,
            &SAM3X_REGS_BASES,
            SAM3X_RESET_BASE,
            flash_planes,
            flash_total_length_kb * 1024,
            SAM3X_PAGE_SIZE,
            true,
        )?)),
        Family::Sam4s {
            flash_planes,
            flash_total_length_kb,
            ..
        } => Ok(Box::new(CortexM34Part::new(
            entry.name,
            samba,
            SAM4S_FLASH_BASE,
            &SAM4S_REGS_BASES,
            SAM4S_RESET_BASE,
            flash_planes,
            flash_total_length_kb * 1024,
            SAM4S_PAGE_SIZE,
            false,
        )?)),
        Family::SamV {
            flash_total_length_kb,
            page_size,
            ..
        } => Ok(Box::new(CortexM7Part::new(
            entry.name,
            samba,
            SAMV_FLASH_BASE,
            SAMV_REGS_BASE,
            None,
            flash_total_length_kb * 1024,
            page_size,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ChipId;

    #[test]
    fn exactly_one_entry_matches_atsam3x8e() {
        let ids = IdentifiedRegisters {
            cpuid: None,
            chipid: Some(ChipId::decode(0x400E_0740, 0x285E_0A60, 0)),
            dsu: None,
        };
        let matches: Vec<_> = REGISTRY.iter().filter(|e| e.identify(&ids)).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "ATSAM3X8E");
    }

    #[test]
    fn no_entry_matches_an_unknown_chip_id() {
        let ids = IdentifiedRegisters {
            cpuid: None,
            chipid: Some(ChipId::decode(0x400E_0740, 0xDEAD_0000, 0)),
            dsu: None,
        };
        assert!(REGISTRY.iter().all(|e| !e.identify(&ids)));
    }
}
