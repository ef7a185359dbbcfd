use std::net::Ipv4Addr;

use etherparse::Ipv4HeaderSlice;
use etherparse::err::ipv4::{HeaderError, HeaderSliceError};

use super::error::LayerError;

/// IPv4 header fields and the bytes of the IP payload.
#[derive(Debug, Clone)]
pub struct Ipv4Packet<'a> {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: u8,
    pub ttl: u8,
    pub version: u8,
    /// Declared total length, or the bytes available when the field is zero.
    pub total_len: u16,
    pub fragment_offset: u16,
    /// Payload bounded by the declared total length when it is consistent.
    pub payload: &'a [u8],
}

impl Ipv4Packet<'_> {
    /// Only the first fragment carries the transport header.
    pub fn is_first_fragment(&self) -> bool {
        self.fragment_offset == 0
    }
}

pub fn parse_ipv4(bytes: &[u8]) -> Result<Ipv4Packet<'_>, LayerError> {
    let header = Ipv4HeaderSlice::from_slice(bytes).map_err(|err| match err {
        HeaderSliceError::Len(err) => LayerError::too_short("IPv4", &err),
        HeaderSliceError::Content(HeaderError::UnexpectedVersion { version_number }) => {
            LayerError::UnexpectedVersion {
                version: version_number,
            }
        }
        HeaderSliceError::Content(HeaderError::HeaderLengthSmallerThanHeader { ihl }) => {
            LayerError::InvalidHeaderLength { ihl }
        }
    })?;
    let header_len = header.slice().len();

    // Total length is not checked by the header slice.
    let declared = header.total_len();
    let available = bytes.len();
    let end = match usize::from(declared) {
        len if len >= header_len && len <= available => len,
        _ => available,
    };
    let total_len = if declared == 0 {
        u16::try_from(available).unwrap_or(u16::MAX)
    } else {
        declared
    };

    Ok(Ipv4Packet {
        source: header.source_addr(),
        destination: header.destination_addr(),
        protocol: header.protocol().0,
        ttl: header.ttl(),
        version: header.version(),
        total_len,
        fragment_offset: header.fragments_offset().value(),
        payload: &bytes[header_len..end],
    })
}

#[cfg(test)]
mod tests {
    use super::parse_ipv4;
    use crate::protocols::error::LayerError;
    use crate::protocols::layout;

    fn header(total_len: u16, protocol: u8) -> Vec<u8> {
        let [len_hi, len_lo] = total_len.to_be_bytes();
        vec![
            0x45, 0x00, len_hi, len_lo, // version/IHL, DSCP, total length
            0x00, 0x00, 0x00, 0x00, // identification, flags/fragment offset
            64, protocol, 0x00, 0x00, // TTL, protocol, checksum
            192, 168, 1, 10, // source
            10, 0, 0, 1, // destination
        ]
    }

    #[test]
    fn parses_header_fields() {
        let mut bytes = header(24, layout::IP_PROTO_UDP);
        bytes.extend_from_slice(&[1, 2, 3, 4]);

        let packet = parse_ipv4(&bytes).unwrap();
        assert_eq!(packet.source.to_string(), "192.168.1.10");
        assert_eq!(packet.destination.to_string(), "10.0.0.1");
        assert_eq!(packet.protocol, layout::IP_PROTO_UDP);
        assert_eq!(packet.ttl, 64);
        assert_eq!(packet.version, 4);
        assert_eq!(packet.total_len, 24);
        assert_eq!(packet.payload, &[1, 2, 3, 4]);
        assert!(packet.is_first_fragment());
    }

    #[test]
    fn trailing_padding_is_not_payload() {
        let mut bytes = header(22, 1);
        bytes.extend_from_slice(&[9, 9, 0, 0, 0, 0]);

        let packet = parse_ipv4(&bytes).unwrap();
        assert_eq!(packet.payload, &[9, 9]);
    }

    #[test]
    fn zero_total_length_falls_back_to_available_bytes() {
        let mut bytes = header(0, 1);
        bytes.extend_from_slice(&[7, 7, 7]);

        let packet = parse_ipv4(&bytes).unwrap();
        assert_eq!(packet.total_len, 23);
        assert_eq!(packet.payload, &[7, 7, 7]);
    }

    #[test]
    fn total_length_beyond_capture_uses_available_bytes() {
        let mut bytes = header(1500, 1);
        bytes.extend_from_slice(&[5, 5]);

        let packet = parse_ipv4(&bytes).unwrap();
        assert_eq!(packet.total_len, 1500);
        assert_eq!(packet.payload, &[5, 5]);
    }

    #[test]
    fn records_fragment_offset() {
        let mut bytes = header(20, layout::IP_PROTO_TCP);
        bytes[6..8].copy_from_slice(&0x2005u16.to_be_bytes());

        let packet = parse_ipv4(&bytes).unwrap();
        assert_eq!(packet.fragment_offset, 5);
        assert!(!packet.is_first_fragment());
    }

    #[test]
    fn rejects_bad_headers() {
        let mut v6 = header(20, 6);
        v6[0] = 0x60;
        assert!(matches!(
            parse_ipv4(&v6),
            Err(LayerError::UnexpectedVersion { version: 6 })
        ));

        let mut short_ihl = header(20, 6);
        short_ihl[0] = 0x44;
        assert!(matches!(
            parse_ipv4(&short_ihl),
            Err(LayerError::InvalidHeaderLength { ihl: 4 })
        ));

        let mut long_ihl = header(20, 6);
        long_ihl[0] = 0x46;
        assert!(matches!(
            parse_ipv4(&long_ihl),
            Err(LayerError::TooShort { layer: "IPv4", needed: 24, actual: 20 })
        ));

        assert!(matches!(
            parse_ipv4(&[0x45, 0, 0]),
            Err(LayerError::TooShort { needed: 20, actual: 3, .. })
        ));
    }
}
