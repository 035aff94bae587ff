use std::io;

use log::warn;
use xmodem::{Checksum, Xmodem};

use crate::error::{Error, Result};
use crate::transport::Transport;

const XMODEM_BLOCK_SIZE: usize = 128;
const XMODEM_PAD_BYTE: u8 = 0xFF;

/// Adapts a raw [`Transport`] to `std::io::Read`/`Write` so the `xmodem`
/// crate can drive it one byte at a time.
struct TransportIo<'a, T: Transport + ?Sized>(&'a mut T);

impl<T: Transport + ?Sized> io::Read for TransportIo<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self
            .0
            .read(buf.len().max(1))
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

impl<T: Transport + ?Sized> io::Write for TransportIo<'_, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .write(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Wraps a raw serial [`Transport`] so that bulk block reads/writes are
/// XMODEM-CRC framed, as the SAM-BA bootloader requires on non-USB links.
/// Not used on USB-CDC transports, which move raw bytes instead.
pub struct XmodemTransport<T: Transport> {
    inner: T,
}

impl<T: Transport> XmodemTransport<T> {
    pub fn new(inner: T) -> Self {
        XmodemTransport { inner }
    }
}

impl<T: Transport> Transport for XmodemTransport<T> {
    fn read(&mut self, _length: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut io = TransportIo(&mut self.inner);
        Xmodem::new()
            .recv(&mut io, &mut buf, Checksum::CRC16)
            .map_err(|e| Error::Connection {
                reason: format!("xmodem receive failed: {e}"),
            })?;
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut padded = data.to_vec();
        let remainder = padded.len() % XMODEM_BLOCK_SIZE;
        if remainder != 0 {
            let pad = XMODEM_BLOCK_SIZE - remainder;
            warn!(
                "xmodem write padding {} bytes with {:#04x} to reach a full block",
                pad, XMODEM_PAD_BYTE
            );
            padded.resize(padded.len() + pad, XMODEM_PAD_BYTE);
        }
        let mut io = TransportIo(&mut self.inner);
        Xmodem::new()
            .send(&mut io, &mut &padded[..])
            .map_err(|e| Error::Connection {
                reason: format!("xmodem send failed: {e}"),
            })?;
        Ok(())
    }
}
