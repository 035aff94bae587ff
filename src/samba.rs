//! The stateless SAM-BA ASCII command grammar, and the session wrapper that
//! drives a [`Transport`] with it.

use std::cell::RefCell;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{Error, Result};
use crate::transport::{Transport, XmodemTransport};

/// A [`SamBa`] session shared between a [`crate::part::Part`] and its flash
/// controllers, which all issue commands over the same single-threaded link.
pub type SharedSamBa<T> = Rc<RefCell<SamBa<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    SetNormalMode,
    Go,
    GetVersion,
    SendFile,
    ReceiveFile,
    WriteWord,
    ReadWord,
    WriteHalfWord,
    ReadHalfWord,
    WriteByte,
    ReadByte,
}

impl Command {
    fn letter(self) -> char {
        match self {
            Command::SetNormalMode => 'N',
            Command::Go => 'G',
            Command::GetVersion => 'V',
            Command::SendFile => 'S',
            Command::ReceiveFile => 'R',
            Command::WriteWord => 'W',
            Command::ReadWord => 'w',
            Command::WriteHalfWord => 'H',
            Command::ReadHalfWord => 'h',
            Command::WriteByte => 'O',
            Command::ReadByte => 'o',
        }
    }
}

/// Serializes a SAM-BA command with 0, 1, or 2 hex arguments. More than two
/// arguments can only happen from a bug in this module's own call sites.
fn serialize_command(command: Command, arguments: &[u32]) -> Vec<u8> {
    let args = match arguments {
        [] => String::new(),
        [a] => format!("{a:08x},"),
        [a, b] => format!("{a:08x},{b:08x}"),
        _ => panic!("invalid SAM-BA command argument count: {}", arguments.len()),
    };
    format!("{}{}#", command.letter(), args).into_bytes()
}

/// A SAM-BA session over an established [`Transport`].
pub struct SamBa<T: Transport> {
    transport: T,
    is_usb: bool,
}

impl<T: Transport> SamBa<T> {
    /// Opens a session: in serial mode, emits the auto-baud training
    /// sequence before the `N` command; in USB mode `N` is sent directly.
    pub fn new(mut transport: T, is_usb: bool) -> Result<Self> {
        if !is_usb {
            transport.write(&[0xFF, 0xFF, 0xFF, 0xFF, b'#'])?;
        }
        debug!("set normal mode");
        transport.write(&serialize_command(Command::SetNormalMode, &[]))?;
        transport.read(2)?;
        Ok(SamBa { transport, is_usb })
    }

    pub fn is_usb(&self) -> bool {
        self.is_usb
    }

    pub fn run_from_address(&mut self, address: u32) -> Result<()> {
        debug!("run @ {address:#010x}");
        self.transport
            .write(&serialize_command(Command::Go, &[address]))
    }

    /// Accumulates bytes until the `\n\r` line terminator appears.
    pub fn get_version(&mut self) -> Result<String> {
        self.transport
            .write(&serialize_command(Command::GetVersion, &[]))?;
        let mut version = Vec::new();
        loop {
            version.extend(self.transport.read(1)?);
            if version.ends_with(b"\n\r") {
                break;
            }
        }
        version.truncate(version.len() - 2);
        let version = String::from_utf8(version)
            .map_err(|_| Error::Connection {
                reason: "version string was not valid ASCII".into(),
            })?
            .trim()
            .to_string();
        debug!("read version = {version}");
        Ok(version)
    }

    pub fn write_word(&mut self, address: u32, word: u32) -> Result<()> {
        debug!("write word @ {address:#010x} = {word:#010x}");
        self.transport
            .write(&serialize_command(Command::WriteWord, &[address, word]))
    }

    pub fn read_word(&mut self, address: u32) -> Result<u32> {
        self.transport
            .write(&serialize_command(Command::ReadWord, &[address]))?;
        let bytes = self.transport.read(4)?;
        let word = LittleEndian::read_u32(&bytes);
        debug!("read word @ {address:#010x} = {word:#010x}");
        Ok(word)
    }

    pub fn write_half_word(&mut self, address: u32, half_word: u16) -> Result<()> {
        debug!("write half-word @ {address:#010x} = {half_word:#06x}");
        self.transport.write(&serialize_command(
            Command::WriteHalfWord,
            &[address, half_word as u32],
        ))
    }

    pub fn read_half_word(&mut self, address: u32) -> Result<u16> {
        self.transport
            .write(&serialize_command(Command::ReadHalfWord, &[address]))?;
        let bytes = self.transport.read(2)?;
        let half_word = LittleEndian::read_u16(&bytes);
        debug!("read half-word @ {address:#010x} = {half_word:#06x}");
        Ok(half_word)
    }

    pub fn write_byte(&mut self, address: u32, byte: u8) -> Result<()> {
        debug!("write byte @ {address:#010x} = {byte:#04x}");
        self.transport.write(&serialize_command(
            Command::WriteByte,
            &[address, byte as u32],
        ))
    }

    pub fn read_byte(&mut self, address: u32) -> Result<u8> {
        self.transport
            .write(&serialize_command(Command::ReadByte, &[address]))?;
        let bytes = self.transport.read(1)?;
        debug!("read byte @ {address:#010x} = {:#04x}", bytes[0]);
        Ok(bytes[0])
    }

    /// Device → host block transfer. The `R` command itself always goes out
    /// over the raw transport; only the bulk payload that follows is
    /// XMODEM-CRC framed, and only on non-USB links.
    pub fn read_block(&mut self, address: u32, length: usize) -> Result<Vec<u8>> {
        self.transport.write(&serialize_command(
            Command::ReceiveFile,
            &[address, length as u32],
        ))?;
        if self.is_usb {
            self.transport.read(length)
        } else {
            XmodemTransport::new(&mut self.transport).read(length)
        }
    }

    /// Host → device block transfer; see [`Self::read_block`] for the
    /// command-vs-payload framing split.
    pub fn write_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.transport.write(&serialize_command(
            Command::SendFile,
            &[address, data.len() as u32],
        ))?;
        if self.is_usb {
            self.transport.write(data)
        } else {
            XmodemTransport::new(&mut self.transport).write(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct MockTransport {
        to_read: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl MockTransport {
        fn new(to_read: &[u8]) -> Self {
            MockTransport {
                to_read: to_read.iter().copied().collect(),
                written: Vec::new(),
            }
        }
    }

    impl Transport for MockTransport {
        fn read(&mut self, length: usize) -> Result<Vec<u8>> {
            (0..length)
                .map(|_| self.to_read.pop_front().ok_or(Error::Timeout))
                .collect()
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.written.extend_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn serializes_zero_one_two_argument_commands() {
        assert_eq!(serialize_command(Command::SetNormalMode, &[]), b"N#");
        assert_eq!(
            serialize_command(Command::Go, &[0x2000_0000]),
            b"G20000000#"
        );
        assert_eq!(
            serialize_command(Command::WriteWord, &[0x2000_0000, 0xDEAD_BEEF]),
            b"W20000000,deadbeef#"
        );
        assert_eq!(
            serialize_command(Command::ReadWord, &[0x400E_0A08]),
            b"w400e0a08,#"
        );
    }

    #[test]
    fn read_word_decodes_little_endian() {
        let mut samba = SamBa::new(MockTransport::new(&[0, 0]), true).unwrap();
        // Prime the transport's queue for the read_word call itself.
        samba.transport.to_read.extend([0x11, 0x22, 0x33, 0x44]);
        let word = samba.read_word(0x400E_0A08).unwrap();
        assert_eq!(word, 0x4433_2211);
    }

    #[test]
    fn get_version_stops_at_line_terminator() {
        let mut samba = SamBa::new(MockTransport::new(&[0, 0]), true).unwrap();
        samba
            .transport
            .to_read
            .extend(b"v1.4a\n\r".iter().copied());
        let version = samba.get_version().unwrap();
        assert_eq!(version, "v1.4a");
    }

    #[test]
    fn serial_session_open_sends_training_bytes_before_normal_mode() {
        let samba = SamBa::new(MockTransport::new(&[0, 0]), false).unwrap();
        assert_eq!(&samba.transport.written[..5], &[0xFF, 0xFF, 0xFF, 0xFF, b'#']);
        assert_eq!(&samba.transport.written[5..], b"N#");
    }
}
