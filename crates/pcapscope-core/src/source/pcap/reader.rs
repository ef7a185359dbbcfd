use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Link type and clock of one pcapng interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    /// Timestamp units per second.
    pub units_per_second: u64,
    /// Seconds added to every timestamp (`if_tsoffset`).
    pub offset_seconds: f64,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            units_per_second: ts_units_per_second(layout::PCAPNG_DEFAULT_TSRESOL),
            offset_seconds: 0.0,
        }
    }
}

/// Read the magic bytes and rewind the reader to the start.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pcapscope_core::source::pcap::reader::read_magic_and_rewind;
/// use std::io::Cursor;
///
/// let bytes = [0x0a, 0x0d, 0x0d, 0x0a, 0x01];
/// let mut cursor = Cursor::new(bytes);
/// let magic = read_magic_and_rewind(&mut cursor).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// ```
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Check whether the magic bytes match PCAPNG.
pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Resolve the interface for a given interface id, defaulting to Ethernet
/// with microsecond timestamps.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pcapscope_core::source::pcap::reader::{InterfaceInfo, interface_for};
/// use pcap_parser::Linktype;
///
/// let raw = InterfaceInfo { linktype: Linktype::RAW, ..InterfaceInfo::default() };
/// assert_eq!(interface_for(&[raw], 0).linktype, Linktype::RAW);
/// assert_eq!(interface_for(&[raw], 1).linktype, Linktype::ETHERNET);
/// ```
pub fn interface_for(interfaces: &[InterfaceInfo], if_id: u32) -> InterfaceInfo {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Units per second encoded by an `if_tsresol` option value.
///
/// The low seven bits are an exponent of ten, or of two when the high bit is
/// set. Exponents that overflow fall back to microseconds.
pub fn ts_units_per_second(if_tsresol: u8) -> u64 {
    let exponent = u32::from(if_tsresol & !layout::PCAPNG_TSRESOL_BINARY_FLAG);
    let units = if if_tsresol & layout::PCAPNG_TSRESOL_BINARY_FLAG == 0 {
        10u64.checked_pow(exponent)
    } else {
        2u64.checked_pow(exponent)
    };
    units.unwrap_or(1_000_000)
}

/// Convert a PCAPNG high/low timestamp to epoch seconds.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pcapscope_core::source::pcap::reader::{InterfaceInfo, pcapng_ts_to_seconds};
///
/// let seconds = pcapng_ts_to_seconds(0, 1_500_000, &InterfaceInfo::default());
/// assert!((seconds - 1.5).abs() < f64::EPSILON);
/// ```
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32, interface: &InterfaceInfo) -> f64 {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let units = interface.units_per_second.max(1);
    let whole = (ts / units) as f64;
    let fraction = (ts % units) as f64 / units as f64;
    interface.offset_seconds + whole + fraction
}

/// Convert a classic pcap record timestamp to epoch seconds.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond_precision: bool) -> f64 {
    let divisor = if nanosecond_precision {
        layout::PCAP_NANOS_PER_SECOND
    } else {
        layout::PCAP_MICROS_PER_SECOND
    };
    f64::from(ts_sec) + f64::from(ts_frac) / divisor
}
