use std::io::{Read, Write};
use std::time::Duration;

use log::trace;

use crate::error::{Error, Result};
use crate::transport::Transport;

const DEFAULT_BAUD: u32 = 115_200;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A real serial port, opened 8N1 with a 1s read/write timeout.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str, baud: Option<u32>) -> Result<Self> {
        let port = serialport::new(path, baud.unwrap_or(DEFAULT_BAUD))
            .timeout(DEFAULT_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()?;
        let mut transport = SerialTransport { port };
        transport.port.clear(serialport::ClearBuffer::Input).ok();
        Ok(transport)
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.port.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                Error::Timeout
            } else {
                Error::Io(e)
            }
        })?;
        trace!("serial read {} bytes: {:02x?}", length, buf);
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!("serial write {} bytes: {:02x?}", data.len(), data);
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}
