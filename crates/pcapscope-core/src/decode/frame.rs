use log::debug;
use pcap_parser::Linktype;

use crate::protocols::ethernet::parse_ethernet;
use crate::protocols::ipv4::parse_ipv4;
use crate::protocols::layout;
use crate::protocols::transport::{parse_tcp, parse_udp};
use crate::record::{
    LinkLayer, MacAddr, NetworkLayer, PacketRecord, PacketTime, Payload, Transport,
};
use crate::source::PacketEvent;
use crate::vendor::VendorLookup;

use super::{DecodeOptions, PayloadMode};

/// Best-effort decoder for single frames.
///
/// Decoding never fails: a layer that cannot be parsed is left out of the
/// record together with everything it would have encapsulated.
///
/// # Examples
/// ```
/// use pcap_parser::Linktype;
/// use pcapscope_core::{DecodeOptions, FrameDecoder, NoVendors, PacketEvent};
///
/// let decoder = FrameDecoder::new(&NoVendors, DecodeOptions::default());
/// let event = PacketEvent { ts: Some(1.0), linktype: Linktype::ETHERNET, data: vec![0; 6] };
/// let record = decoder.decode(1, &event);
/// assert_eq!(record.length, 6);
/// assert!(record.link.is_none());
/// ```
pub struct FrameDecoder<'a> {
    vendors: &'a dyn VendorLookup,
    options: DecodeOptions,
}

impl<'a> FrameDecoder<'a> {
    pub fn new(vendors: &'a dyn VendorLookup, options: DecodeOptions) -> Self {
        Self { vendors, options }
    }

    pub fn decode(&self, packet_number: u64, event: &PacketEvent) -> PacketRecord {
        let timestamp = PacketTime::Epoch(event.ts.unwrap_or(0.0));
        let mut record = PacketRecord::new(packet_number, timestamp, event.data.len() as u64);

        let network_bytes = if event.linktype == Linktype::ETHERNET {
            self.decode_link(&mut record, &event.data)
        } else if event.linktype == Linktype::RAW || event.linktype == Linktype::IPV4 {
            Some(event.data.as_slice())
        } else {
            debug!(
                "packet {packet_number}: unsupported link type {}",
                event.linktype.0
            );
            None
        };

        if let Some(bytes) = network_bytes {
            self.decode_network(&mut record, bytes);
        }
        record
    }

    fn decode_link<'f>(&self, record: &mut PacketRecord, frame: &'f [u8]) -> Option<&'f [u8]> {
        let ethernet = match parse_ethernet(frame) {
            Ok(ethernet) => ethernet,
            Err(err) => {
                debug!("packet {}: link layer dropped: {err}", record.packet_number);
                return None;
            }
        };

        let src_mac = MacAddr(ethernet.source);
        let dst_mac = MacAddr(ethernet.destination);
        record.link = Some(LinkLayer {
            src_mac,
            dst_mac,
            ethertype: ethernet.ethertype,
            src_vendor: self.vendors.lookup(&src_mac),
            dst_vendor: self.vendors.lookup(&dst_mac),
        });

        match ethernet.encapsulated() {
            Ok((layout::ETHERTYPE_IPV4, payload)) => Some(payload),
            Ok((ethertype, _)) => {
                debug!(
                    "packet {}: no IPv4 above ethertype {ethertype:#06x}",
                    record.packet_number
                );
                None
            }
            Err(err) => {
                debug!("packet {}: network layer dropped: {err}", record.packet_number);
                None
            }
        }
    }

    fn decode_network(&self, record: &mut PacketRecord, bytes: &[u8]) {
        let packet = match parse_ipv4(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("packet {}: network layer dropped: {err}", record.packet_number);
                return;
            }
        };

        record.network = Some(NetworkLayer {
            src_ip: packet.source,
            dst_ip: packet.destination,
            protocol_number: packet.protocol,
            ttl: packet.ttl,
            ip_version: packet.version,
            total_len: packet.total_len,
        });

        let application = if !packet.is_first_fragment() {
            packet.payload
        } else {
            match packet.protocol {
                layout::IP_PROTO_TCP => match parse_tcp(packet.payload) {
                    Ok((segment, data)) => {
                        record.transport = Some(Transport::Tcp(segment));
                        data
                    }
                    Err(err) => {
                        debug!("packet {}: transport dropped: {err}", record.packet_number);
                        return;
                    }
                },
                layout::IP_PROTO_UDP => match parse_udp(packet.payload) {
                    Ok((datagram, data)) => {
                        record.transport = Some(Transport::Udp(datagram));
                        data
                    }
                    Err(err) => {
                        debug!("packet {}: transport dropped: {err}", record.packet_number);
                        return;
                    }
                },
                _ => packet.payload,
            }
        };

        record.payload = self.payload(application);
    }

    fn payload(&self, bytes: &[u8]) -> Option<Payload> {
        if bytes.is_empty() {
            return None;
        }
        let payload = match self.options.payload {
            PayloadMode::Lossy => Payload::Text(String::from_utf8_lossy(bytes).into_owned()),
            PayloadMode::Strict => match std::str::from_utf8(bytes) {
                Ok(text) => Payload::Text(text.to_string()),
                Err(_) => Payload::Hex(bytes.iter().map(|b| format!("{b:02x}")).collect()),
            },
        };
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProtocolClass;
    use crate::vendor::{NoVendors, OuiTable, UNKNOWN_VENDOR};
    use etherparse::PacketBuilder;

    const SRC_MAC: [u8; 6] = [0x00, 0x50, 0x56, 0x01, 0x02, 0x03];
    const DST_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

    fn tcp_frame(payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([192, 168, 1, 10], [10, 0, 0, 1], 64)
            .tcp(51000, 80, 1234, 4096)
            .syn()
            .ack(99);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        frame
    }

    fn udp_frame(payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
            .ipv4([10, 0, 0, 2], [10, 0, 0, 3], 32)
            .udp(5353, 53);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).unwrap();
        frame
    }

    fn event(linktype: Linktype, data: Vec<u8>) -> PacketEvent {
        PacketEvent {
            ts: Some(1_700_000_000.25),
            linktype,
            data,
        }
    }

    fn decode(data: Vec<u8>) -> PacketRecord {
        FrameDecoder::new(&OuiTable::builtin(), DecodeOptions::default())
            .decode(7, &event(Linktype::ETHERNET, data))
    }

    #[test]
    fn decodes_tcp_frame() {
        let frame = tcp_frame(b"GET /");
        let len = frame.len() as u64;
        let record = decode(frame);

        assert_eq!(record.packet_number, 7);
        assert_eq!(record.timestamp, PacketTime::Epoch(1_700_000_000.25));
        assert_eq!(record.length, len);

        let link = record.link.as_ref().unwrap();
        assert_eq!(link.src_mac.to_string(), "00:50:56:01:02:03");
        assert_eq!(link.src_vendor, "VMware, Inc.");
        assert_eq!(link.dst_vendor, UNKNOWN_VENDOR);
        assert_eq!(link.ethertype, layout::ETHERTYPE_IPV4);

        let network = record.network.as_ref().unwrap();
        assert_eq!(network.src_ip.to_string(), "192.168.1.10");
        assert_eq!(network.protocol_number, layout::IP_PROTO_TCP);
        assert_eq!(network.ttl, 64);
        assert_eq!(network.ip_version, 4);
        assert_eq!(u64::from(network.total_len), len - 14);

        let Some(Transport::Tcp(segment)) = &record.transport else {
            panic!("expected tcp transport");
        };
        assert_eq!((segment.src_port, segment.dst_port), (51000, 80));
        assert_eq!(segment.seq, 1234);
        assert_eq!(segment.ack, 99);
        assert_eq!(segment.window, 4096);
        assert!(segment.flags.syn && segment.flags.ack);
        assert_eq!(segment.flags.text, "SA");
        assert_eq!(record.payload, Some(Payload::Text("GET /".to_string())));
        assert_eq!(record.protocol_label(), "TCP");
    }

    #[test]
    fn decodes_udp_frame() {
        let record = decode(udp_frame(b"abc"));
        let Some(Transport::Udp(datagram)) = &record.transport else {
            panic!("expected udp transport");
        };
        assert_eq!((datagram.src_port, datagram.dst_port), (5353, 53));
        assert_eq!(datagram.length, 11);
        assert_eq!(record.protocol_class(), ProtocolClass::Udp);
        assert_eq!(record.payload, Some(Payload::Text("abc".to_string())));
    }

    #[test]
    fn empty_payload_is_absent() {
        let record = decode(tcp_frame(&[]));
        assert!(record.transport.is_some());
        assert!(record.payload.is_none());
    }

    #[test]
    fn truncated_transport_keeps_network() {
        let mut frame = tcp_frame(&[]);
        frame.truncate(14 + 20 + 10);
        let record = decode(frame);
        assert!(record.link.is_some());
        assert!(record.network.is_some());
        assert!(record.transport.is_none());
        assert!(record.payload.is_none());
        assert_eq!(record.protocol_label(), "IP(6)");
    }

    #[test]
    fn truncated_network_keeps_link() {
        let mut frame = tcp_frame(&[]);
        frame.truncate(14 + 8);
        let record = decode(frame);
        assert!(record.link.is_some());
        assert!(record.network.is_none());
        assert_eq!(record.protocol_label(), "Other");
    }

    #[test]
    fn runt_frame_keeps_base_fields() {
        let record = decode(vec![0xaa; 5]);
        assert_eq!(record.length, 5);
        assert!(record.link.is_none());
        assert!(record.network.is_none());
    }

    #[test]
    fn non_ip_ethertype_has_link_only() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&DST_MAC);
        frame.extend_from_slice(&SRC_MAC);
        frame.extend_from_slice(&0x0806u16.to_be_bytes());
        frame.extend_from_slice(&[0u8; 28]);
        let record = decode(frame);
        assert_eq!(record.link.as_ref().unwrap().ethertype, 0x0806);
        assert!(record.network.is_none());
    }

    #[test]
    fn raw_ip_link_type_skips_link_layer() {
        let frame = udp_frame(b"x");
        let decoder = FrameDecoder::new(&NoVendors, DecodeOptions::default());
        let record = decoder.decode(1, &event(Linktype::RAW, frame[14..].to_vec()));
        assert!(record.link.is_none());
        assert!(record.network.is_some());
        assert!(matches!(record.transport, Some(Transport::Udp(_))));
    }

    #[test]
    fn vlan_tagged_frame_reaches_transport() {
        let frame = udp_frame(b"v");
        let mut tagged = frame[..12].to_vec();
        tagged.extend_from_slice(&layout::ETHERTYPE_VLAN.to_be_bytes());
        tagged.extend_from_slice(&[0x00, 0x0a]);
        tagged.extend_from_slice(&frame[12..]);

        let record = decode(tagged);
        assert_eq!(record.link.as_ref().unwrap().ethertype, layout::ETHERTYPE_VLAN);
        assert!(matches!(record.transport, Some(Transport::Udp(_))));
    }

    #[test]
    fn later_fragments_carry_no_transport() {
        let mut frame = udp_frame(b"fragment");
        frame[14 + 6..14 + 8].copy_from_slice(&0x0010u16.to_be_bytes());
        let record = decode(frame);
        assert!(record.network.is_some());
        assert!(record.transport.is_none());
        assert!(record.payload.is_some());
    }

    #[test]
    fn payload_modes() {
        let frame = udp_frame(&[0x66, 0xff, 0x6f]);

        let lossy = decode(frame.clone());
        assert_eq!(lossy.payload, Some(Payload::Text("f\u{fffd}o".to_string())));

        let strict = FrameDecoder::new(
            &NoVendors,
            DecodeOptions {
                payload: PayloadMode::Strict,
            },
        )
        .decode(1, &event(Linktype::ETHERNET, frame));
        assert_eq!(strict.payload, Some(Payload::Hex("66ff6f".to_string())));
    }

    #[test]
    fn missing_timestamp_becomes_zero() {
        let decoder = FrameDecoder::new(&NoVendors, DecodeOptions::default());
        let record = decoder.decode(
            1,
            &PacketEvent {
                ts: None,
                linktype: Linktype::ETHERNET,
                data: udp_frame(b""),
            },
        );
        assert_eq!(record.timestamp, PacketTime::Epoch(0.0));
    }

    #[test]
    fn unknown_link_type_keeps_base_fields() {
        let decoder = FrameDecoder::new(&NoVendors, DecodeOptions::default());
        let record = decoder.decode(3, &event(Linktype(147), udp_frame(b"x")));
        assert!(record.link.is_none());
        assert!(record.network.is_none());
    }
}
