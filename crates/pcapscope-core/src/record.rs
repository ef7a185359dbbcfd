//! Decoded packet model.
//!
//! Each captured frame becomes one [`PacketRecord`]; optional sections model
//! the layers that could be decoded. Records are immutable once produced and
//! serialize to a nested mapping so they can be stored and reloaded without
//! re-decoding the capture.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocols::layout;
use crate::timestamp::{parse_timestamp, ts_to_rfc3339};

/// One decoded frame.
///
/// # Examples
/// ```
/// use pcapscope_core::{PacketRecord, PacketTime};
///
/// let record = PacketRecord::new(1, PacketTime::Epoch(1.5), 60);
/// assert_eq!(record.protocol_label(), "Other");
/// assert!(record.ports().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// 1-based position in capture order.
    pub packet_number: u64,
    pub timestamp: PacketTime,
    /// Captured frame length in bytes.
    pub length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl PacketRecord {
    /// Record with only the always-present fields set.
    pub fn new(packet_number: u64, timestamp: PacketTime, length: u64) -> Self {
        Self {
            packet_number,
            timestamp,
            length,
            link: None,
            network: None,
            transport: None,
            payload: None,
        }
    }

    /// `TCP`, `UDP`, `IP(<protocol number>)` or `Other`.
    pub fn protocol_label(&self) -> String {
        match (&self.transport, &self.network) {
            (Some(Transport::Tcp(_)), _) => "TCP".to_string(),
            (Some(Transport::Udp(_)), _) => "UDP".to_string(),
            (None, Some(network)) => format!("IP({})", network.protocol_number),
            (None, None) => "Other".to_string(),
        }
    }

    pub fn protocol_class(&self) -> ProtocolClass {
        match self.transport {
            Some(Transport::Tcp(_)) => ProtocolClass::Tcp,
            Some(Transport::Udp(_)) => ProtocolClass::Udp,
            None => ProtocolClass::Other,
        }
    }

    /// Capture time as an RFC 3339 UTC string, when the timestamp is usable.
    ///
    /// # Examples
    /// ```
    /// use pcapscope_core::{PacketRecord, PacketTime};
    ///
    /// let record = PacketRecord::new(1, PacketTime::Epoch(1_700_000_000.0), 60);
    /// assert_eq!(record.time_label().as_deref(), Some("2023-11-14T22:13:20Z"));
    /// ```
    pub fn time_label(&self) -> Option<String> {
        ts_to_rfc3339(self.timestamp.to_epoch())
    }

    /// Source and destination ports when a transport section is present.
    pub fn ports(&self) -> Option<(u16, u16)> {
        self.transport
            .as_ref()
            .map(|transport| (transport.src_port(), transport.dst_port()))
    }
}

/// Capture time of a frame.
///
/// Decoded frames carry epoch seconds; records reloaded from storage may carry
/// a textual timestamp instead, which is parsed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketTime {
    Epoch(f64),
    Text(String),
}

impl PacketTime {
    /// Epoch seconds if the value is finite or the text parses.
    pub fn to_epoch(&self) -> Option<f64> {
        match self {
            PacketTime::Epoch(seconds) => seconds.is_finite().then_some(*seconds),
            PacketTime::Text(text) => parse_timestamp(text),
        }
    }

    /// Epoch seconds usable by time-based aggregates (strictly positive).
    pub fn valid_epoch(&self) -> Option<f64> {
        self.to_epoch().filter(|seconds| *seconds > 0.0)
    }
}

impl From<f64> for PacketTime {
    fn from(value: f64) -> Self {
        PacketTime::Epoch(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkLayer {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub ethertype: u16,
    pub src_vendor: String,
    pub dst_vendor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLayer {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub protocol_number: u8,
    pub ttl: u8,
    pub ip_version: u8,
    /// Declared total length, or the bytes remaining when the field is zero.
    pub total_len: u16,
}

/// Transport section; a record holds at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    Tcp(TcpSegment),
    Udp(UdpDatagram),
}

impl Transport {
    pub fn src_port(&self) -> u16 {
        match self {
            Transport::Tcp(tcp) => tcp.src_port,
            Transport::Udp(udp) => udp.src_port,
        }
    }

    pub fn dst_port(&self) -> u16 {
        match self {
            Transport::Tcp(tcp) => tcp.dst_port,
            Transport::Udp(udp) => udp.dst_port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpSegment {
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: TcpFlags,
    pub seq: u32,
    pub ack: u32,
    pub window: u16,
}

/// TCP control bits, raw and decomposed.
///
/// # Examples
/// ```
/// use pcapscope_core::TcpFlags;
///
/// let flags = TcpFlags::from_bits(0x12);
/// assert!(flags.syn && flags.ack);
/// assert_eq!(flags.text, "SA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpFlags {
    pub bits: u8,
    /// Printable form, one letter per set bit in `FSRPAUEC` order.
    pub text: String,
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
    pub urg: bool,
}

impl TcpFlags {
    pub fn from_bits(bits: u8) -> Self {
        const LETTERS: [(u8, char); 8] = [
            (layout::TCP_FLAG_FIN, 'F'),
            (layout::TCP_FLAG_SYN, 'S'),
            (layout::TCP_FLAG_RST, 'R'),
            (layout::TCP_FLAG_PSH, 'P'),
            (layout::TCP_FLAG_ACK, 'A'),
            (layout::TCP_FLAG_URG, 'U'),
            (layout::TCP_FLAG_ECE, 'E'),
            (layout::TCP_FLAG_CWR, 'C'),
        ];
        let text = LETTERS
            .iter()
            .filter(|(mask, _)| bits & mask != 0)
            .map(|(_, letter)| *letter)
            .collect();

        Self {
            bits,
            text,
            syn: bits & layout::TCP_FLAG_SYN != 0,
            ack: bits & layout::TCP_FLAG_ACK != 0,
            fin: bits & layout::TCP_FLAG_FIN != 0,
            rst: bits & layout::TCP_FLAG_RST != 0,
            psh: bits & layout::TCP_FLAG_PSH != 0,
            urg: bits & layout::TCP_FLAG_URG != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpDatagram {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
}

/// Application payload: decoded text or, when text decoding is refused, hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Hex(String),
}

/// Transport class used by per-address breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolClass {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "Other")]
    Other,
}

impl ProtocolClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolClass::Tcp => "TCP",
            ProtocolClass::Udp => "UDP",
            ProtocolClass::Other => "Other",
        }
    }
}

impl fmt::Display for ProtocolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IEEE 802 hardware address, rendered as lowercase colon-separated hex.
///
/// # Examples
/// ```
/// use pcapscope_core::MacAddr;
///
/// let mac: MacAddr = "00-50-56-AB-CD-EF".parse().unwrap();
/// assert_eq!(mac.to_string(), "00:50:56:ab:cd:ef");
/// assert_eq!(mac.oui(), [0x00, 0x50, 0x56]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Organizationally unique identifier (first three octets).
    pub fn oui(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid MAC address: {0}")]
pub struct ParseMacError(pub String);

impl FromStr for MacAddr {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseMacError(s.to_string()));
        }
        let mut octets = [0u8; 6];
        for (index, octet) in octets.iter_mut().enumerate() {
            let pair = digits
                .get(index * 2..index * 2 + 2)
                .ok_or_else(|| ParseMacError(s.to_string()))?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }
        Ok(MacAddr(octets))
    }
}

impl From<MacAddr> for String {
    fn from(value: MacAddr) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MacAddr {
    type Error = ParseMacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
