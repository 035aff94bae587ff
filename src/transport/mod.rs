//! Byte-level transports to the device, and the XMODEM-CRC framing wrapper
//! that bulk SAM-BA transfers need on non-USB links.

mod serial;
mod xmodem_wrap;

pub use serial::SerialTransport;
pub use xmodem_wrap::XmodemTransport;

use crate::error::Result;

/// An opaque byte pipe to the device. `read` must deliver exactly `length`
/// bytes or fail with [`crate::error::Error::Timeout`].
pub trait Transport {
    fn read(&mut self, length: usize) -> Result<Vec<u8>>;
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        (**self).read(length)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }
}
