/// Section Header Block type, the first four bytes of every pcapng file.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

/// Fractional-second units of a classic pcap record.
pub const PCAP_MICROS_PER_SECOND: f64 = 1e6;
pub const PCAP_NANOS_PER_SECOND: f64 = 1e9;

/// `if_tsresol` used when an interface does not declare one.
pub const PCAPNG_DEFAULT_TSRESOL: u8 = 6;
/// High bit of `if_tsresol`: the exponent is a power of two instead of ten.
pub const PCAPNG_TSRESOL_BINARY_FLAG: u8 = 0x80;
