//! PcapScope core library for offline capture statistics.
//!
//! This crate implements the pipeline used by the CLI: packet sources feed the
//! trace decoder, which turns every frame into a [`PacketRecord`] (link,
//! network and transport sections are decoded best-effort), and the stats
//! aggregator reduces the record sequence into a [`TrafficStats`] structure of
//! frequency tables, histograms, throughput series and relationship graphs.
//! A declarative [`FilterSpec`] selects record subsequences with the same
//! field semantics.
//!
//! All file I/O is isolated in `source` modules; header decoding lives in
//! `protocols` (layout/reader/parser), and aggregation is a pure reduction
//! over an immutable slice of records.
//!
//! Invariants:
//! - A record carries at most one of TCP/UDP, and a transport section only
//!   when a network section is present.
//! - Frequency tables and graphs keep first-encounter order for equal counts.
//! - Aggregation never fails, including on the empty sequence.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use pcapscope_core::{compute_stats, decode_trace};
//!
//! let packets = decode_trace(Path::new("capture.pcap"))?;
//! let stats = compute_stats(&packets);
//! println!("packets: {}", stats.total_packets);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
mod decode;
mod filter;
mod protocols;
mod record;
mod source;
mod stats;
mod timestamp;
mod vendor;

pub use analysis::{
    AnalysisError, AnalysisOptions, analyze_packets, analyze_pcap_file, analyze_pcap_file_with,
};
pub use decode::{
    DecodeError, DecodeOptions, FrameDecoder, PayloadMode, decode_source, decode_trace,
    decode_trace_with,
};
pub use filter::{FilterError, FilterSpec, filter_packets};
pub use record::{
    LinkLayer, MacAddr, NetworkLayer, PacketRecord, PacketTime, ParseMacError, Payload,
    ProtocolClass, TcpFlags, TcpSegment, Transport, UdpDatagram,
};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
pub use stats::{StatsConfig, compute_stats, compute_stats_with};
pub use timestamp::parse_timestamp;
pub use vendor::{NoVendors, OuiTable, UNKNOWN_VENDOR, VendorError, VendorLookup};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Analysis report: capture metadata wrapped around the traffic statistics.
///
/// # Examples
/// ```
/// use pcapscope_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcap", 123);
/// assert_eq!(report.report_version, pcapscope_core::REPORT_VERSION);
/// assert_eq!(report.stats.total_packets, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,

    /// Input capture metadata.
    pub input: InputInfo,

    /// Optional capture summary (may be empty when unavailable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Aggregate statistics over every decoded packet.
    pub stats: TrafficStats,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "pcapscope").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

impl ToolInfo {
    /// Metadata for this build of the library.
    pub fn current() -> Self {
        Self {
            name: "pcapscope".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Input capture metadata embedded in reports.
///
/// # Examples
/// ```
/// use pcapscope_core::InputInfo;
///
/// let input = InputInfo {
///     path: "capture.pcap".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Basic capture summary (timestamps may be absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Total packet count observed in the capture.
    pub packets_total: u64,
    /// RFC3339 timestamp of the earliest valid packet time (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the latest valid packet time (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Aggregate statistics over a packet sequence.
///
/// Every table and series has a defined empty value, so the `Default`
/// instance is exactly what an empty sequence aggregates to.
///
/// # Examples
/// ```
/// use pcapscope_core::compute_stats;
///
/// let stats = compute_stats(&[]);
/// assert_eq!(stats.total_packets, 0);
/// assert!(stats.top_ips.is_empty());
/// assert_eq!(stats.throughput_stats.peak_throughput, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub total_packets: u64,
    /// Packets per protocol label, all labels, descending.
    pub protocols: Vec<CountEntry<String>>,
    /// Source and destination IPv4 addresses merged.
    pub top_ips: Vec<CountEntry<String>>,
    /// Source and destination transport ports merged.
    pub top_ports: Vec<CountEntry<u16>>,
    /// Source and destination hardware addresses merged.
    pub top_mac_addresses: Vec<CountEntry<String>>,
    /// Vendors of source and destination hardware addresses merged.
    pub top_mac_vendors: Vec<CountEntry<String>>,
    pub payload_stats: PayloadStats,
    pub network_load: NetworkLoad,
    pub throughput_stats: ThroughputStats,
    pub protocol_payload: Vec<ProtocolPayload>,
    pub mac_protocol_stats: Vec<MacProtocolStats>,
    pub time_distribution: Distribution,
    pub packet_size_distribution: Distribution,
    pub network_graph: Graph,
    pub mac_graph: Graph,
    pub enhanced_mac_graph: EnhancedGraph,
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry<K> {
    pub key: K,
    pub count: u64,
}

/// Payload accounting under assumed fixed header sizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadStats {
    pub total_payload_bytes: u64,
    /// Packets whose payload estimate is positive.
    pub payload_packets: u64,
    /// Total payload divided by the number of packets (all packets).
    pub avg_payload_per_packet: f64,
    pub max_payload_size: u64,
    /// Smallest positive payload, 0 when no packet carries payload.
    pub min_payload_size: u64,
}

/// Byte totals and header overhead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkLoad {
    pub total_bytes: u64,
    pub header_overhead: u64,
    /// Percentage of bytes not attributed to headers, within `0..=100`.
    pub payload_efficiency: f64,
}

/// Throughput over fixed-width time windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputStats {
    /// Bytes per second over the valid timestamp span.
    pub avg_throughput: u64,
    /// Highest per-window byte rate.
    pub peak_throughput: u64,
    /// Window width in seconds (0 when no windowing took place).
    pub window_seconds: f64,
    pub time_labels: Vec<String>,
    pub bytes_per_second: Vec<u64>,
    pub packets_per_second: Vec<u64>,
}

/// Packet and byte totals for one protocol label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolPayload {
    pub protocol: String,
    pub packets: u64,
    pub total_bytes: u64,
}

/// Per-address transport breakdown, counted once per occurrence in either role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacProtocolStats {
    pub mac: String,
    pub protocols: ProtocolCounts,
}

/// Three-way protocol counter.
///
/// # Examples
/// ```
/// use pcapscope_core::{ProtocolClass, ProtocolCounts};
///
/// let counts = ProtocolCounts { tcp: 2, udp: 2, other: 1 };
/// assert_eq!(counts.total(), 5);
/// assert_eq!(counts.dominant(), ProtocolClass::Tcp);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolCounts {
    #[serde(rename = "TCP")]
    pub tcp: u64,
    #[serde(rename = "UDP")]
    pub udp: u64,
    #[serde(rename = "Other")]
    pub other: u64,
}

impl ProtocolCounts {
    pub fn total(&self) -> u64 {
        self.tcp + self.udp + self.other
    }

    pub fn add(&mut self, class: ProtocolClass) {
        match class {
            ProtocolClass::Tcp => self.tcp += 1,
            ProtocolClass::Udp => self.udp += 1,
            ProtocolClass::Other => self.other += 1,
        }
    }

    /// Class with the highest count; ties resolve TCP, then UDP, then Other.
    pub fn dominant(&self) -> ProtocolClass {
        let mut best = (ProtocolClass::Tcp, self.tcp);
        if self.udp > best.1 {
            best = (ProtocolClass::Udp, self.udp);
        }
        if self.other > best.1 {
            best = (ProtocolClass::Other, self.other);
        }
        best.0
    }
}

/// Labelled histogram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

/// Weighted directed multigraph over addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Packets touching this address as source or destination.
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Packets observed for this ordered pair.
    pub value: u64,
}

/// MAC graph with per-node protocol breakdown and per-edge protocol sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedGraph {
    pub nodes: Vec<EnhancedNode>,
    pub edges: Vec<EnhancedEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedNode {
    pub id: String,
    /// Trailing eight characters of the address.
    pub label: String,
    pub title: String,
    pub value: u64,
    pub color: String,
    pub protocol: ProtocolClass,
    pub protocol_stats: ProtocolCounts,
    pub vendor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedEdge {
    pub from: String,
    pub to: String,
    pub value: u64,
    pub title: String,
    /// Packet count divided by ten, clamped to `1.0..=10.0`.
    pub width: f64,
    /// Distinct protocol labels in first-seen order.
    pub protocols: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use pcapscope_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcap", 123);
/// assert_eq!(report.input.bytes, 123);
/// assert!(report.stats.protocols.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo::current(),
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        stats: TrafficStats::default(),
    }
}
