//! Per-shard counter pass.
//!
//! One `ShardCounters` is built per chunk of the packet slice; shards are
//! merged left to right so every table keeps first-encounter order.

use std::net::Ipv4Addr;

use crate::ProtocolCounts;
use crate::protocols::layout;
use crate::record::{MacAddr, PacketRecord, Transport};

use super::ordered::{Absorb, OrderedCounts};

/// Assumed header bytes for a record: link, plus IP when a network section
/// is present, plus the fixed TCP or UDP header.
pub(crate) fn assumed_header_size(record: &PacketRecord) -> u64 {
    let mut size = layout::ASSUMED_LINK_HEADER;
    if record.network.is_some() {
        size += layout::ASSUMED_IP_HEADER;
    }
    match record.transport {
        Some(Transport::Tcp(_)) => size += layout::ASSUMED_TCP_HEADER,
        Some(Transport::Udp(_)) => size += layout::ASSUMED_UDP_HEADER,
        None => {}
    }
    size
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PayloadTally {
    pub total: u64,
    pub packets: u64,
    pub max: u64,
    /// Smallest positive payload seen.
    pub min: Option<u64>,
}

impl PayloadTally {
    fn record(&mut self, payload: u64) {
        self.total += payload;
        if payload == 0 {
            return;
        }
        self.packets += 1;
        self.max = self.max.max(payload);
        self.min = Some(self.min.map_or(payload, |min| min.min(payload)));
    }

    fn merge(&mut self, other: PayloadTally) {
        self.total += other.total;
        self.packets += other.packets;
        self.max = self.max.max(other.max);
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ByteTally {
    pub packets: u64,
    pub bytes: u64,
}

impl Absorb for ByteTally {
    fn absorb(&mut self, other: Self) {
        self.packets += other.packets;
        self.bytes += other.bytes;
    }
}

impl Absorb for ProtocolCounts {
    fn absorb(&mut self, other: Self) {
        self.tcp += other.tcp;
        self.udp += other.udp;
        self.other += other.other;
    }
}

/// Packets on one ordered address pair and the labels seen on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EdgeTally {
    pub packets: u64,
    pub protocols: Vec<String>,
}

impl EdgeTally {
    fn add(&mut self, label: &str) {
        self.packets += 1;
        if !self.protocols.iter().any(|seen| seen == label) {
            self.protocols.push(label.to_string());
        }
    }
}

impl Absorb for EdgeTally {
    fn absorb(&mut self, other: Self) {
        self.packets += other.packets;
        for label in other.protocols {
            if !self.protocols.contains(&label) {
                self.protocols.push(label);
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ShardCounters {
    pub packets: u64,
    pub protocols: OrderedCounts<String>,
    pub ips: OrderedCounts<Ipv4Addr>,
    pub ports: OrderedCounts<u16>,
    pub macs: OrderedCounts<MacAddr>,
    pub vendors: OrderedCounts<String>,
    pub payload: PayloadTally,
    pub total_bytes: u64,
    pub header_overhead: u64,
    pub protocol_payload: OrderedCounts<String, ByteTally>,
    pub mac_protocols: OrderedCounts<MacAddr, ProtocolCounts>,
    pub ip_edges: OrderedCounts<(Ipv4Addr, Ipv4Addr)>,
    pub mac_edges: OrderedCounts<(MacAddr, MacAddr), EdgeTally>,
}

impl ShardCounters {
    pub(crate) fn from_packets(packets: &[PacketRecord]) -> Self {
        let mut counters = Self::default();
        for record in packets {
            counters.add(record);
        }
        counters
    }

    fn add(&mut self, record: &PacketRecord) {
        let label = record.protocol_label();
        let class = record.protocol_class();
        let header = assumed_header_size(record);

        self.packets += 1;
        self.protocols.bump(label.clone());
        self.total_bytes += record.length;
        self.header_overhead += header;
        self.payload.record(record.length.saturating_sub(header));

        let payload = self.protocol_payload.entry(label.clone());
        payload.packets += 1;
        payload.bytes += record.length;

        if let Some(link) = &record.link {
            self.macs.bump(link.src_mac);
            self.macs.bump(link.dst_mac);
            self.vendors.bump(link.src_vendor.clone());
            self.vendors.bump(link.dst_vendor.clone());
            self.mac_protocols.entry(link.src_mac).add(class);
            self.mac_protocols.entry(link.dst_mac).add(class);
            self.mac_edges
                .entry((link.src_mac, link.dst_mac))
                .add(&label);
        }

        if let Some(network) = &record.network {
            self.ips.bump(network.src_ip);
            self.ips.bump(network.dst_ip);
            self.ip_edges.bump((network.src_ip, network.dst_ip));
        }

        if let Some((src, dst)) = record.ports() {
            self.ports.bump(src);
            self.ports.bump(dst);
        }
    }

    /// Fold in the shard that follows this one in capture order.
    pub(crate) fn merge(&mut self, other: ShardCounters) {
        self.packets += other.packets;
        self.protocols.merge(other.protocols);
        self.ips.merge(other.ips);
        self.ports.merge(other.ports);
        self.macs.merge(other.macs);
        self.vendors.merge(other.vendors);
        self.payload.merge(other.payload);
        self.total_bytes += other.total_bytes;
        self.header_overhead += other.header_overhead;
        self.protocol_payload.merge(other.protocol_payload);
        self.mac_protocols.merge(other.mac_protocols);
        self.ip_edges.merge(other.ip_edges);
        self.mac_edges.merge(other.mac_edges);
    }
}
