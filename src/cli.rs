//! Command line surface: argument parsing, numeric literal parsing, and the
//! subcommands that drive a [`crate::session::Session`].

use std::collections::HashMap;
use std::path::PathBuf;

use structopt::StructOpt;

/// Host-side programmer for Atmel SAM microcontrollers over SAM-BA.
#[derive(StructOpt, Debug)]
#[structopt(name = "sam-loader")]
pub struct CliArgs {
    /// Serial port or USB-CDC device path (e.g. /dev/ttyACM0, COM3).
    #[structopt(short, long)]
    pub port: String,

    /// Baud rate for the serial link; ignored on USB-CDC.
    #[structopt(long)]
    pub baud: Option<u32>,

    /// Treat the link as USB-CDC (skip auto-baud training, raw block I/O).
    #[structopt(long)]
    pub usb: bool,

    /// Raise verbosity; repeat for more detail (-v, -vv, -vvv).
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,

    /// Attempt to discover the port automatically from a VID:PID pair.
    #[structopt(long)]
    pub autoconnect: bool,

    /// VID:PID pair used by `--autoconnect` (informational only; this
    /// tool does not itself enumerate USB devices).
    #[structopt(long, default_value = "03eb:6124")]
    pub autoconnect_vidpid: String,

    /// Override identifier register addresses, as a comma-separated list
    /// of `NAME=ADDRESS` pairs, e.g. `CHIPID=0x400e0940,DSU=0x41002000`.
    #[structopt(long, parse(try_from_str = parse_address_overrides), default_value = "")]
    pub addresses: HashMap<String, u32>,

    /// Set the boot-from-flash GPNVM bit after a successful write.
    #[structopt(long)]
    pub flash_boot: bool,

    /// Reset the device after the operation completes.
    #[structopt(long)]
    pub reset: bool,

    #[structopt(subcommand)]
    pub command: Command,
}

impl CliArgs {
    pub fn address_overrides(&self) -> HashMap<String, u32> {
        self.addresses.clone()
    }
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// List every part this tool recognizes.
    Parts,
    /// Probe and identify the attached device.
    Info,
    /// Read flash to a file, or hex-dump to stdout if no file is given.
    Read {
        #[structopt(short, long, parse(try_from_str = parse_number))]
        address: Option<u32>,
        #[structopt(short, long, parse(try_from_str = parse_number))]
        length: Option<u32>,
        #[structopt(short, long, parse(from_os_str))]
        file: Option<PathBuf>,
    },
    /// Program (and verify) a file's contents to flash.
    Write {
        #[structopt(short, long, parse(from_os_str))]
        file: PathBuf,
        #[structopt(short, long, parse(try_from_str = parse_number))]
        address: Option<u32>,
        #[structopt(short, long, parse(try_from_str = parse_number))]
        length: Option<u32>,
    },
    /// Erase a flash plane, or the whole chip if no address is given.
    Erase {
        #[structopt(short, long, parse(try_from_str = parse_number))]
        address: Option<u32>,
    },
}

fn parse_address_overrides(s: &str) -> Result<HashMap<String, u32>, String> {
    s.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| format!("expected NAME=ADDRESS, got {entry:?}"))?;
            Ok((name.to_string(), parse_number(value)?))
        })
        .collect()
}

/// Accepts decimal, `0x`-prefixed hex, or a `k`/`K`/`m`/`M`-suffixed
/// decimal (×1024, ×1024²).
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(|e| e.to_string());
    }
    let (digits, multiplier) = match s.chars().last() {
        Some('k') | Some('K') => (&s[..s.len() - 1], 1024),
        Some('m') | Some('M') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };
    let value: u32 = digits.parse().map_err(|_| format!("invalid number: {s:?}"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("number out of range: {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_hex_and_suffixed_values() {
        assert_eq!(parse_number("1024"), Ok(1024));
        assert_eq!(parse_number("0x400"), Ok(0x400));
        assert_eq!(parse_number("0X400"), Ok(0x400));
        assert_eq!(parse_number("4k"), Ok(4096));
        assert_eq!(parse_number("4K"), Ok(4096));
        assert_eq!(parse_number("2m"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_number("2M"), Ok(2 * 1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_number("not-a-number").is_err());
        assert!(parse_number("0xZZ").is_err());
    }

    #[test]
    fn parses_comma_separated_address_overrides() {
        let overrides = parse_address_overrides("CHIPID=0x400e0940,DSU=0x41002000").unwrap();
        assert_eq!(overrides.get("CHIPID"), Some(&0x400e_0940));
        assert_eq!(overrides.get("DSU"), Some(&0x4100_2000));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn empty_string_yields_no_overrides() {
        assert!(parse_address_overrides("").unwrap().is_empty());
    }
}
