//! Trace decoding: capture file to an ordered `PacketRecord` sequence.
//!
//! The source is drained sequentially (the file handle is released before
//! any decoding starts), then frames are decoded in parallel with order
//! preserved. Container failures abort the whole trace; per-frame problems
//! only drop the affected layers.

mod frame;

pub use frame::FrameDecoder;

use std::path::Path;

use log::info;
use rayon::prelude::*;
use thiserror::Error;

use crate::record::PacketRecord;
use crate::source::{PacketSource, PcapFileSource, SourceError};
use crate::vendor::{OuiTable, VendorLookup};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture could not be read: {0}")]
    Source(#[from] SourceError),
}

/// How application payload bytes become a `Payload`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadMode {
    /// UTF-8 with invalid sequences replaced; always text.
    #[default]
    Lossy,
    /// Text only when the bytes are valid UTF-8, hex otherwise.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub payload: PayloadMode,
}

/// Decode every frame of a capture file with the built-in vendor table.
///
/// # Errors
/// Returns `DecodeError` when the file cannot be opened or its container is
/// corrupt; no partial trace is returned.
pub fn decode_trace(path: &Path) -> Result<Vec<PacketRecord>, DecodeError> {
    decode_trace_with(path, &OuiTable::builtin(), DecodeOptions::default())
}

pub fn decode_trace_with(
    path: &Path,
    vendors: &dyn VendorLookup,
    options: DecodeOptions,
) -> Result<Vec<PacketRecord>, DecodeError> {
    let source = PcapFileSource::open(path)?;
    let packets = decode_source(source, vendors, options)?;
    info!("decoded {} frames from {}", packets.len(), path.display());
    Ok(packets)
}

/// Drain a source and decode its frames, numbered from 1 in source order.
pub fn decode_source<S: PacketSource>(
    mut source: S,
    vendors: &dyn VendorLookup,
    options: DecodeOptions,
) -> Result<Vec<PacketRecord>, DecodeError> {
    let mut events = Vec::new();
    while let Some(event) = source.next_packet()? {
        events.push(event);
    }
    drop(source);

    let decoder = FrameDecoder::new(vendors, options);
    Ok(events
        .par_iter()
        .enumerate()
        .map(|(index, event)| decoder.decode(index as u64 + 1, event))
        .collect())
}
