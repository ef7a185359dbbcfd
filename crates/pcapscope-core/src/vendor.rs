//! Hardware vendor resolution.
//!
//! Lookups are an injected capability: the decoder and the aggregator only
//! see [`VendorLookup`], so tests and callers can swap the table freely.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::record::MacAddr;

/// Vendor name reported when a prefix is not known.
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Resolve a hardware address to a vendor name; never fails.
pub trait VendorLookup: Send + Sync {
    fn lookup(&self, mac: &MacAddr) -> String;
}

impl<F> VendorLookup for F
where
    F: Fn(&MacAddr) -> String + Send + Sync,
{
    fn lookup(&self, mac: &MacAddr) -> String {
        self(mac)
    }
}

/// Lookup that knows no vendors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVendors;

impl VendorLookup for NoVendors {
    fn lookup(&self, _mac: &MacAddr) -> String {
        UNKNOWN_VENDOR.to_string()
    }
}

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid vendor table line {line}: {content}")]
    InvalidLine { line: usize, content: String },
}

const BUILTIN_PREFIXES: &[([u8; 3], &str)] = &[
    ([0x00, 0x00, 0x0c], "Cisco Systems, Inc"),
    ([0x00, 0x05, 0x69], "VMware, Inc."),
    ([0x00, 0x0c, 0x29], "VMware, Inc."),
    ([0x00, 0x15, 0x5d], "Microsoft Corporation"),
    ([0x00, 0x16, 0x3e], "Xensource, Inc."),
    ([0x00, 0x1a, 0x11], "Google, Inc."),
    ([0x00, 0x1b, 0x21], "Intel Corporate"),
    ([0x00, 0x1b, 0x63], "Apple, Inc."),
    ([0x00, 0x1c, 0x42], "Parallels, Inc."),
    ([0x00, 0x50, 0x56], "VMware, Inc."),
    ([0x00, 0xe0, 0x4c], "Realtek Semiconductor Corp."),
    ([0x01, 0x00, 0x5e], "IPv4 Multicast"),
    ([0x08, 0x00, 0x27], "PCS Systemtechnik GmbH"),
    ([0x3c, 0x22, 0xfb], "Apple, Inc."),
    ([0x3c, 0xfd, 0xfe], "Intel Corporate"),
    ([0x52, 0x54, 0x00], "QEMU virtual NIC"),
    ([0xb8, 0x27, 0xeb], "Raspberry Pi Foundation"),
    ([0xdc, 0xa6, 0x32], "Raspberry Pi Trading Ltd"),
    ([0xf0, 0x18, 0x98], "Apple, Inc."),
    ([0xff, 0xff, 0xff], "Broadcast"),
];

/// OUI prefix table.
///
/// # Examples
/// ```
/// use pcapscope_core::{MacAddr, OuiTable, VendorLookup};
///
/// let table = OuiTable::builtin();
/// let mac: MacAddr = "00:50:56:01:02:03".parse().unwrap();
/// assert_eq!(table.lookup(&mac), "VMware, Inc.");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OuiTable {
    prefixes: HashMap<[u8; 3], String>,
}

impl OuiTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Small table of common virtualisation, board and NIC vendors.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (prefix, vendor) in BUILTIN_PREFIXES {
            table.insert(*prefix, *vendor);
        }
        table
    }

    /// Load a `manuf`-style table from disk.
    pub fn load(path: &Path) -> Result<Self, VendorError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse `PREFIX<whitespace>Vendor` lines.
    ///
    /// Blank lines and `#` comments are skipped, as are masked prefixes
    /// (`00:1B:C5:00:00:00/36`). When a line is tab-separated the last field
    /// wins, so Wireshark's short/long name pairs resolve to the long name.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, VendorError> {
        let mut table = Self::empty();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let (prefix, vendor) = split_entry(content).ok_or_else(|| VendorError::InvalidLine {
                line: index + 1,
                content: content.to_string(),
            })?;
            if prefix.contains('/') {
                continue;
            }
            let prefix = parse_prefix(prefix).ok_or_else(|| VendorError::InvalidLine {
                line: index + 1,
                content: content.to_string(),
            })?;
            table.insert(prefix, vendor);
        }
        Ok(table)
    }

    pub fn insert(&mut self, prefix: [u8; 3], vendor: impl Into<String>) {
        self.prefixes.insert(prefix, vendor.into());
    }

    /// Add every entry of `other`, overriding existing prefixes.
    pub fn merge(&mut self, other: OuiTable) {
        self.prefixes.extend(other.prefixes);
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl VendorLookup for OuiTable {
    fn lookup(&self, mac: &MacAddr) -> String {
        self.prefixes
            .get(&mac.oui())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
    }
}

fn split_entry(content: &str) -> Option<(&str, String)> {
    if content.contains('\t') {
        let mut fields = content.split('\t').map(str::trim).filter(|f| !f.is_empty());
        let prefix = fields.next()?;
        let vendor = fields.last()?;
        return Some((prefix, vendor.to_string()));
    }
    let mut parts = content.split_whitespace();
    let prefix = parts.next()?;
    let vendor = parts.collect::<Vec<_>>().join(" ");
    if vendor.is_empty() {
        return None;
    }
    Some((prefix, vendor))
}

fn parse_prefix(prefix: &str) -> Option<[u8; 3]> {
    let digits: String = prefix
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if digits.len() != 6 {
        return None;
    }
    let mut octets = [0u8; 3];
    for (index, octet) in octets.iter_mut().enumerate() {
        *octet = u8::from_str_radix(digits.get(index * 2..index * 2 + 2)?, 16).ok()?;
    }
    Some(octets)
}
