//! Traffic statistics over a decoded packet sequence.
//!
//! The counter pass runs over fixed-size shards in parallel; shard partials
//! are merged in capture order so tables keep first-encounter ordering. The
//! time histogram, size histogram and throughput series need the whole
//! sequence and run alongside the counter pass.

mod counters;
mod graph;
mod histogram;
mod ordered;
mod throughput;

use rayon::prelude::*;

use crate::record::PacketRecord;
use crate::vendor::{OuiTable, VendorLookup};
use crate::{MacProtocolStats, NetworkLoad, PayloadStats, ProtocolPayload, TrafficStats};

use counters::ShardCounters;

/// Aggregation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsConfig {
    /// Entries kept in the address, port and vendor tables.
    pub top_n: usize,
    /// Packets per parallel counter shard.
    pub shard_size: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            shard_size: 4096,
        }
    }
}

/// Aggregate a packet sequence with the built-in vendor table.
///
/// # Examples
/// ```
/// use pcapscope_core::{PacketRecord, PacketTime, compute_stats};
///
/// let packets = vec![
///     PacketRecord::new(1, PacketTime::Epoch(10.0), 60),
///     PacketRecord::new(2, PacketTime::Epoch(11.0), 80),
/// ];
/// let stats = compute_stats(&packets);
/// assert_eq!(stats.total_packets, 2);
/// assert_eq!(stats.network_load.total_bytes, 140);
/// assert_eq!(stats.protocols[0].key, "Other");
/// ```
pub fn compute_stats(packets: &[PacketRecord]) -> TrafficStats {
    compute_stats_with(packets, &StatsConfig::default(), &OuiTable::builtin())
}

pub fn compute_stats_with(
    packets: &[PacketRecord],
    config: &StatsConfig,
    vendors: &dyn VendorLookup,
) -> TrafficStats {
    let shard_size = config.shard_size.max(1);
    let (counters, (time_distribution, (packet_size_distribution, throughput_stats))) =
        rayon::join(
            || {
                packets
                    .par_chunks(shard_size)
                    .map(ShardCounters::from_packets)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .fold(ShardCounters::default(), |mut acc, shard| {
                        acc.merge(shard);
                        acc
                    })
            },
            || {
                rayon::join(
                    || histogram::time_distribution(packets),
                    || {
                        rayon::join(
                            || histogram::size_distribution(packets),
                            || throughput::throughput(packets),
                        )
                    },
                )
            },
        );

    let top = Some(config.top_n);
    TrafficStats {
        total_packets: counters.packets,
        protocols: counters.protocols.top(None),
        top_ips: counters
            .ips
            .top(top)
            .into_iter()
            .map(|entry| crate::CountEntry {
                key: entry.key.to_string(),
                count: entry.count,
            })
            .collect(),
        top_ports: counters.ports.top(top),
        top_mac_addresses: counters
            .macs
            .top(top)
            .into_iter()
            .map(|entry| crate::CountEntry {
                key: entry.key.to_string(),
                count: entry.count,
            })
            .collect(),
        top_mac_vendors: counters.vendors.top(top),
        payload_stats: payload_stats(&counters),
        network_load: network_load(&counters),
        throughput_stats,
        protocol_payload: counters
            .protocol_payload
            .iter()
            .map(|(protocol, tally)| ProtocolPayload {
                protocol: protocol.clone(),
                packets: tally.packets,
                total_bytes: tally.bytes,
            })
            .collect(),
        mac_protocol_stats: counters
            .mac_protocols
            .iter()
            .map(|(mac, protocols)| MacProtocolStats {
                mac: mac.to_string(),
                protocols: *protocols,
            })
            .collect(),
        time_distribution,
        packet_size_distribution,
        network_graph: graph::ip_graph(&counters),
        mac_graph: graph::mac_graph(&counters, vendors),
        enhanced_mac_graph: graph::enhanced_mac_graph(&counters, vendors),
    }
}

fn payload_stats(counters: &ShardCounters) -> PayloadStats {
    let tally = counters.payload;
    PayloadStats {
        total_payload_bytes: tally.total,
        payload_packets: tally.packets,
        avg_payload_per_packet: if counters.packets == 0 {
            0.0
        } else {
            tally.total as f64 / counters.packets as f64
        },
        max_payload_size: tally.max,
        min_payload_size: tally.min.unwrap_or(0),
    }
}

fn network_load(counters: &ShardCounters) -> NetworkLoad {
    let total = counters.total_bytes;
    let payload = total.saturating_sub(counters.header_overhead);
    NetworkLoad {
        total_bytes: total,
        header_overhead: counters.header_overhead,
        payload_efficiency: if total == 0 {
            0.0
        } else {
            payload as f64 / total as f64 * 100.0
        },
    }
}
