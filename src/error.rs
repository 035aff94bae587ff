use thiserror::Error;

use crate::address_range::AddressRange;

/// Errors produced anywhere in the SAM-BA stack, from the wire up to the CLI.
#[derive(Error, Debug)]
pub enum Error {
    #[error("timed out waiting for the device to respond")]
    Timeout,

    #[error("could not recognize chip: {register} read as zero at {addresses_tried:02x?}")]
    CannotRecognizeChip {
        register: &'static str,
        addresses_tried: Vec<u32>,
    },

    #[error("no supported part matches the identifiers read from the device")]
    UnknownPart,

    #[error("more than one supported part matches the identifiers read from the device: {candidates:?}")]
    AmbiguousPart { candidates: Vec<&'static str> },

    #[error("flash command failed at controller {fsr_address:#010x}: FSR={fsr:#010x}")]
    CommandError { fsr_address: u32, fsr: u32 },

    #[error("address {address:#010x} length {length} is out of range {range:?}")]
    OutOfRange {
        range: AddressRange,
        address: u32,
        length: u32,
    },

    #[error("verification of page at {page_address:#010x} failed (range {range:?})")]
    FlashWriteError {
        page_address: u32,
        range: AddressRange,
    },

    #[error("could not set flash-boot GPNVM bit (read back {gpnvm:#010x})")]
    CannotSetFlashBoot { gpnvm: u32 },

    #[error("operation not supported: {operation}")]
    Unsupported { operation: &'static str },

    #[error("file format error in {filename}: {reason}")]
    FileFormat { filename: String, reason: String },

    #[error("connection error: {reason}")]
    Connection { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serial(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes, kept as data so the mapping is unit-testable without
/// touching `std::process::exit`.
///
/// `UnsupportedFormat` (3) is reserved for a missing optional HEX-support
/// build; since HEX support is always compiled in, no `Error` variant maps
/// to it today. It stays in the enum for a future feature-gated build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success = 0,
    SessionError = 1,
    TransportError = 2,
    UnsupportedFormat = 3,
}

impl ExitOutcome {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitOutcome {
    fn from(err: &Error) -> Self {
        match err {
            Error::Timeout
            | Error::CannotRecognizeChip { .. }
            | Error::UnknownPart
            | Error::AmbiguousPart { .. }
            | Error::CommandError { .. }
            | Error::OutOfRange { .. }
            | Error::FlashWriteError { .. }
            | Error::CannotSetFlashBoot { .. }
            | Error::Connection { .. }
            | Error::Unsupported { .. }
            | Error::FileFormat { .. } => ExitOutcome::SessionError,
            Error::Io(_) | Error::Serial(_) => ExitOutcome::TransportError,
        }
    }
}
