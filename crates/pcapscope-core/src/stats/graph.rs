use std::collections::HashSet;

use crate::record::MacAddr;
use crate::vendor::VendorLookup;
use crate::{EnhancedEdge, EnhancedGraph, EnhancedNode, Graph, GraphEdge, GraphNode};

use super::counters::ShardCounters;

/// Node colors keyed by protocol name.
const PALETTE: [(&str, &str); 9] = [
    ("TCP", "#FF6B6B"),
    ("UDP", "#4ECDC4"),
    ("ICMP", "#45B7D1"),
    ("ARP", "#96CEB4"),
    ("DNS", "#FECA57"),
    ("HTTP", "#FF9FF3"),
    ("HTTPS", "#54A0FF"),
    ("Other", "#DDA0DD"),
    ("Unknown", "#C8C8C8"),
];
const UNKNOWN_COLOR: &str = "#C8C8C8";

const NODE_LABEL_CHARS: usize = 8;
const MIN_EDGE_WIDTH: f64 = 1.0;
const MAX_EDGE_WIDTH: f64 = 10.0;

pub(crate) fn protocol_color(protocol: &str) -> &'static str {
    PALETTE
        .iter()
        .find(|(name, _)| *name == protocol)
        .map_or(UNKNOWN_COLOR, |(_, color)| *color)
}

pub(crate) fn ip_graph(counters: &ShardCounters) -> Graph {
    let nodes = counters
        .ips
        .iter()
        .map(|(ip, count)| GraphNode {
            id: ip.to_string(),
            label: ip.to_string(),
            value: *count,
            title: None,
        })
        .collect();
    let edges = counters
        .ip_edges
        .iter()
        .map(|((from, to), count)| GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            value: *count,
        })
        .collect();
    Graph { nodes, edges }
}

pub(crate) fn mac_graph(counters: &ShardCounters, vendors: &dyn VendorLookup) -> Graph {
    let nodes = counters
        .macs
        .iter()
        .map(|(mac, count)| GraphNode {
            id: mac.to_string(),
            label: mac.to_string(),
            value: *count,
            title: Some(vendors.lookup(mac)),
        })
        .collect();
    let edges = counters
        .mac_edges
        .iter()
        .map(|((from, to), edge)| GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            value: edge.packets,
        })
        .collect();
    Graph { nodes, edges }
}

/// MAC graph annotated with per-node protocol mix and per-edge label sets.
pub(crate) fn enhanced_mac_graph(
    counters: &ShardCounters,
    vendors: &dyn VendorLookup,
) -> EnhancedGraph {
    let mut present: HashSet<MacAddr> = HashSet::new();
    let mut nodes = Vec::new();

    for (mac, stats) in counters.mac_protocols.iter() {
        let total = stats.total();
        if total == 0 {
            continue;
        }
        present.insert(*mac);

        let id = mac.to_string();
        let vendor = vendors.lookup(mac);
        let dominant = stats.dominant();
        let label = id
            .get(id.len().saturating_sub(NODE_LABEL_CHARS)..)
            .unwrap_or(&id)
            .to_string();
        nodes.push(EnhancedNode {
            title: format!("MAC: {id}\nVendor: {vendor}\nDominant: {dominant}\nPackets: {total}"),
            label,
            id,
            value: total,
            color: protocol_color(dominant.as_str()).to_string(),
            protocol: dominant,
            protocol_stats: *stats,
            vendor,
        });
    }

    let edges = counters
        .mac_edges
        .iter()
        .filter(|((from, to), _)| present.contains(from) && present.contains(to))
        .map(|((from, to), edge)| EnhancedEdge {
            from: from.to_string(),
            to: to.to_string(),
            value: edge.packets,
            title: format!(
                "Packets: {}\nProtocols: {}",
                edge.packets,
                edge.protocols.join(", ")
            ),
            width: (edge.packets as f64 / 10.0).clamp(MIN_EDGE_WIDTH, MAX_EDGE_WIDTH),
            protocols: edge.protocols.clone(),
        })
        .collect();

    EnhancedGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use crate::ProtocolClass;
    use crate::record::{
        LinkLayer, NetworkLayer, PacketRecord, PacketTime, TcpFlags, TcpSegment, Transport,
    };
    use crate::vendor::OuiTable;

    fn frame(src: u8, dst: u8, tcp: bool) -> PacketRecord {
        let mut record = PacketRecord::new(1, PacketTime::Epoch(1.0), 80);
        record.link = Some(LinkLayer {
            src_mac: MacAddr([0x00, 0x50, 0x56, 0, 0, src]),
            dst_mac: MacAddr([0x00, 0x50, 0x56, 0, 0, dst]),
            ethertype: 0x0800,
            src_vendor: String::new(),
            dst_vendor: String::new(),
        });
        record.network = Some(NetworkLayer {
            src_ip: Ipv4Addr::new(10, 0, 0, src),
            dst_ip: Ipv4Addr::new(10, 0, 0, dst),
            protocol_number: if tcp { 6 } else { 1 },
            ttl: 64,
            ip_version: 4,
            total_len: 60,
        });
        if tcp {
            record.transport = Some(Transport::Tcp(TcpSegment {
                src_port: 1,
                dst_port: 2,
                flags: TcpFlags::from_bits(0x10),
                seq: 0,
                ack: 0,
                window: 0,
            }));
        }
        record
    }

    fn counters() -> ShardCounters {
        let mut packets = vec![frame(1, 2, true); 25];
        packets.push(frame(2, 1, false));
        packets.push(frame(3, 1, false));
        ShardCounters::from_packets(&packets)
    }

    #[test]
    fn palette_defaults_to_unknown() {
        assert_eq!(protocol_color("TCP"), "#FF6B6B");
        assert_eq!(protocol_color("Other"), "#DDA0DD");
        assert_eq!(protocol_color("SCTP"), "#C8C8C8");
    }

    #[test]
    fn ip_graph_weights() {
        let graph = ip_graph(&counters());
        let ids: Vec<_> = graph.nodes.iter().map(|n| (n.id.as_str(), n.value)).collect();
        assert_eq!(ids, vec![("10.0.0.1", 27), ("10.0.0.2", 26), ("10.0.0.3", 1)]);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.edges[0].value, 25);
        assert!(graph.nodes.iter().all(|n| n.title.is_none()));
    }

    #[test]
    fn mac_graph_titles_are_vendors() {
        let graph = mac_graph(&counters(), &OuiTable::builtin());
        assert_eq!(graph.nodes[0].id, "00:50:56:00:00:01");
        assert_eq!(graph.nodes[0].title.as_deref(), Some("VMware, Inc."));
        assert_eq!(graph.edges[0].value, 25);
    }

    #[test]
    fn enhanced_graph_nodes_and_edges() {
        let graph = enhanced_mac_graph(&counters(), &OuiTable::builtin());
        assert_eq!(graph.nodes.len(), 3);

        let first = &graph.nodes[0];
        assert_eq!(first.label, "00:00:01");
        assert_eq!(first.protocol, ProtocolClass::Tcp);
        assert_eq!(first.color, "#FF6B6B");
        assert_eq!(first.value, 27);
        assert_eq!(first.protocol_stats.other, 2);
        assert_eq!(
            first.title,
            "MAC: 00:50:56:00:00:01\nVendor: VMware, Inc.\nDominant: TCP\nPackets: 27"
        );

        let third = &graph.nodes[2];
        assert_eq!(third.protocol, ProtocolClass::Other);
        assert_eq!(third.color, "#DDA0DD");

        let heavy = &graph.edges[0];
        assert_eq!(heavy.value, 25);
        assert_eq!(heavy.width, 2.5);
        assert_eq!(heavy.protocols, vec!["TCP"]);
        assert_eq!(heavy.title, "Packets: 25\nProtocols: TCP");
        assert_eq!(graph.edges[1].width, 1.0);
        assert_eq!(graph.edges[1].protocols, vec!["IP(1)"]);

        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(
            graph
                .edges
                .iter()
                .all(|e| ids.contains(e.from.as_str()) && ids.contains(e.to.as_str()))
        );
    }
}
