use std::path::Path;

use ihex::Record;

use crate::error::{Error, Result};
use crate::file_format::{FileFormat, LoadedFile};

/// Intel HEX reader: collects data records into one contiguous buffer
/// spanning `[min_addr, max_addr)`, zero-filling any gaps between records.
pub struct HexFormat;

impl FileFormat for HexFormat {
    fn can_process(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("hex")
        )
    }

    fn read(&self, path: &Path) -> Result<LoadedFile> {
        let filename = path.display().to_string();
        let text = std::fs::read_to_string(path)?;

        let mut segments: Vec<(u32, Vec<u8>)> = Vec::new();
        let mut upper_linear: u32 = 0;
        let mut upper_segment: u32 = 0;

        for record in ihex::Reader::new(&text) {
            let record = record.map_err(|e| Error::FileFormat {
                filename: filename.clone(),
                reason: e.to_string(),
            })?;
            match record {
                Record::Data { offset, value } => {
                    let base = upper_linear.max(upper_segment);
                    let address = base + offset as u32;
                    segments.push((address, value));
                }
                Record::ExtendedLinearAddress(upper) => {
                    upper_linear = (upper as u32) << 16;
                    upper_segment = 0;
                }
                Record::ExtendedSegmentAddress(segment) => {
                    upper_segment = (segment as u32) << 4;
                    upper_linear = 0;
                }
                Record::StartLinearAddress(_) | Record::StartSegmentAddress { .. } => {}
                Record::EndOfFile => break,
            }
        }

        if segments.is_empty() {
            return Err(Error::FileFormat {
                filename,
                reason: "file contains no data records".into(),
            });
        }

        let min_addr = segments.iter().map(|(addr, _)| *addr).min().unwrap();
        let max_addr = segments
            .iter()
            .map(|(addr, data)| addr + data.len() as u32)
            .max()
            .unwrap();

        let mut buffer = vec![0u8; (max_addr - min_addr) as usize];
        for (address, data) in &segments {
            let offset = (address - min_addr) as usize;
            buffer[offset..offset + data.len()].copy_from_slice(data);
        }

        Ok(LoadedFile {
            address: Some(min_addr),
            data: buffer,
        })
    }
}
