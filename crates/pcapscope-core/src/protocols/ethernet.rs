use etherparse::{Ethernet2HeaderSlice, SingleVlanHeaderSlice};

use super::error::LayerError;
use super::layout;

/// Ethernet II header and the bytes it carries.
#[derive(Debug, Clone, Copy)]
pub struct EthernetFrame<'a> {
    pub source: [u8; 6],
    pub destination: [u8; 6],
    /// Ethertype as written in the outer header.
    pub ethertype: u16,
    pub payload: &'a [u8],
}

pub fn parse_ethernet(frame: &[u8]) -> Result<EthernetFrame<'_>, LayerError> {
    let header = Ethernet2HeaderSlice::from_slice(frame).map_err(|e| LayerError::Slice {
        layer: "Ethernet",
        message: e.to_string(),
    })?;
    let header_len = header.slice().len();

    Ok(EthernetFrame {
        source: header.source(),
        destination: header.destination(),
        ethertype: header.ether_type().0,
        payload: &frame[header_len..],
    })
}

impl<'a> EthernetFrame<'a> {
    /// Ethertype and bytes of the encapsulated protocol, looking through a
    /// single 802.1Q tag.
    pub fn encapsulated(&self) -> Result<(u16, &'a [u8]), LayerError> {
        if self.ethertype != layout::ETHERTYPE_VLAN {
            return Ok((self.ethertype, self.payload));
        }
        let tag = SingleVlanHeaderSlice::from_slice(self.payload)
            .map_err(|err| LayerError::too_short("802.1Q", &err))?;
        Ok((tag.ether_type().0, &self.payload[tag.slice().len()..]))
    }
}
