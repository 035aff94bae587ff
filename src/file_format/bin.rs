use std::path::Path;

use crate::error::Result;
use crate::file_format::{FileFormat, LoadedFile};

/// Identity passthrough: reads the whole file into a byte buffer.
pub struct BinFormat;

impl FileFormat for BinFormat {
    fn can_process(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("bin")
        )
    }

    fn read(&self, path: &Path) -> Result<LoadedFile> {
        let data = std::fs::read(path)?;
        Ok(LoadedFile {
            address: None,
            data,
        })
    }
}
