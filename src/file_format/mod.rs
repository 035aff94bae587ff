//! File format ingestion, dispatched by filename extension. Only two
//! formats exist so this stays a small trait rather than a registry.

mod bin;
mod hex;

pub use bin::BinFormat;
pub use hex::HexFormat;

use std::path::Path;

use crate::error::{Error, Result};

/// The bytes read from a file, plus the address they should be loaded at
/// (Intel HEX carries its own load address; binary files don't).
pub struct LoadedFile {
    pub address: Option<u32>,
    pub data: Vec<u8>,
}

pub trait FileFormat {
    fn can_process(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<LoadedFile>;
}

/// Picks a format by the file's extension and reads it.
pub fn read_file(path: &Path) -> Result<LoadedFile> {
    let formats: [&dyn FileFormat; 2] = [&HexFormat, &BinFormat];
    for format in formats {
        if format.can_process(path) {
            return format.read(path);
        }
    }
    Err(Error::FileFormat {
        filename: path.display().to_string(),
        reason: "no file format recognizes this extension".into(),
    })
}
