//! PCAP/PCAPNG source implementation.
//!
//! Opens a capture file, sniffs the container from its magic bytes and emits
//! one `PacketEvent` per packet record. Timestamps are converted to epoch
//! seconds using the container's resolution (micro- or nanosecond pcap,
//! per-interface `if_tsresol` for pcapng).

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
