//! Part models: per-family base behavior (Cortex-M0+, Cortex-M3/M4,
//! Cortex-M7) plus the static registry of concrete chips each family
//! supports.

mod cortex_m0p;
mod cortex_m3_4;
mod cortex_m7;
mod registry;

pub use cortex_m0p::CortexM0pPart;
pub use cortex_m3_4::CortexM34Part;
pub use cortex_m7::CortexM7Part;
pub use registry::{select, PartEntry, REGISTRY};

use crate::error::Result;

/// Common operations every concrete part exposes, regardless of family.
pub trait Part {
    fn name(&self) -> &'static str;

    fn info(&mut self) -> Result<String>;

    fn erase_chip(&mut self, address: Option<u32>) -> Result<()>;

    fn program_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool>;

    fn verify_flash(&mut self, data: &[u8], address: Option<u32>) -> Result<bool>;

    fn read_flash(&mut self, address: Option<u32>, length: Option<u32>) -> Result<Vec<u8>>;

    fn run_application(&mut self, address: Option<u32>) -> Result<()>;

    /// Sets the boot-from-flash GPNVM bit. Only meaningful on SAM3/4/V;
    /// SAM D/L/C parts have no GPNVM bits and so do not override this.
    fn set_flash_boot(&mut self) -> Result<()> {
        Err(crate::error::Error::Unsupported {
            operation: "set_flash_boot is not applicable to this part",
        })
    }

    /// Issues a hardware reset. Parts without a reset controller log and
    /// no-op, matching the family base class behavior this is grounded on.
    fn reset(&mut self) -> Result<()> {
        log::warn!("no reset controller for this part");
        Ok(())
    }
}
