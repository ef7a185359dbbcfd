use etherparse::{TcpHeaderSlice, UdpHeaderSlice};

use crate::record::{TcpFlags, TcpSegment, UdpDatagram};

use super::error::LayerError;
use super::layout;

pub fn parse_tcp(bytes: &[u8]) -> Result<(TcpSegment, &[u8]), LayerError> {
    let header = TcpHeaderSlice::from_slice(bytes).map_err(|e| LayerError::Slice {
        layer: "TCP",
        message: e.to_string(),
    })?;

    let bits = [
        (header.fin(), layout::TCP_FLAG_FIN),
        (header.syn(), layout::TCP_FLAG_SYN),
        (header.rst(), layout::TCP_FLAG_RST),
        (header.psh(), layout::TCP_FLAG_PSH),
        (header.ack(), layout::TCP_FLAG_ACK),
        (header.urg(), layout::TCP_FLAG_URG),
        (header.ece(), layout::TCP_FLAG_ECE),
        (header.cwr(), layout::TCP_FLAG_CWR),
    ]
    .into_iter()
    .filter(|(set, _)| *set)
    .fold(0u8, |acc, (_, mask)| acc | mask);

    let segment = TcpSegment {
        src_port: header.source_port(),
        dst_port: header.destination_port(),
        flags: TcpFlags::from_bits(bits),
        seq: header.sequence_number(),
        ack: header.acknowledgment_number(),
        window: header.window_size(),
    };
    Ok((segment, &bytes[header.slice().len()..]))
}

pub fn parse_udp(bytes: &[u8]) -> Result<(UdpDatagram, &[u8]), LayerError> {
    let header = UdpHeaderSlice::from_slice(bytes).map_err(|e| LayerError::Slice {
        layer: "UDP",
        message: e.to_string(),
    })?;

    let header_len = header.slice().len();
    let length = header.length();
    let end = match usize::from(length) {
        len if len >= header_len && len <= bytes.len() => len,
        _ => bytes.len(),
    };

    let datagram = UdpDatagram {
        src_port: header.source_port(),
        dst_port: header.destination_port(),
        length,
    };
    Ok((datagram, &bytes[header_len..end]))
}
