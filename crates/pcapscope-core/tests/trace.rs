mod common;

use std::fs;

use pcapscope_core::{
    AnalysisError, DecodeError, FilterSpec, Payload, Transport, analyze_pcap_file, compute_stats,
    decode_trace, filter_packets,
};

use common::{LINKTYPE_ETHERNET, classic_pcap, sample_frames, write_temp};

#[test]
fn decode_trace_yields_records_in_capture_order() {
    let bytes = classic_pcap(LINKTYPE_ETHERNET, false, &sample_frames());
    let path = write_temp("trace.pcap", &bytes);
    let packets = decode_trace(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(packets.len(), 3);
    let numbers: Vec<u64> = packets.iter().map(|p| p.packet_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let first = &packets[0];
    let link = first.link.as_ref().unwrap();
    assert_eq!(link.src_mac.to_string(), "00:50:56:0a:0b:0c");
    assert_eq!(link.src_vendor, "VMware, Inc.");
    assert_eq!(link.dst_vendor, "QEMU virtual NIC");
    let network = first.network.as_ref().unwrap();
    assert_eq!(network.src_ip.to_string(), "192.168.1.10");
    assert_eq!(network.protocol_number, 6);
    match first.transport.as_ref().unwrap() {
        Transport::Tcp(tcp) => {
            assert_eq!((tcp.src_port, tcp.dst_port), (51_000, 80));
            assert!(tcp.flags.psh && tcp.flags.ack);
        }
        other => panic!("expected TCP, got {other:?}"),
    }
    assert_eq!(
        first.payload,
        Some(Payload::Text("GET / HTTP/1.1\r\n".to_string()))
    );

    assert_eq!(packets[1].protocol_label(), "UDP");
    assert_eq!(packets[2].payload, None);
}

#[test]
fn analyze_pcap_file_builds_report() {
    let bytes = classic_pcap(LINKTYPE_ETHERNET, false, &sample_frames());
    let path = write_temp("report.pcap", &bytes);
    let report = analyze_pcap_file(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(report.input.bytes, bytes.len() as u64);
    let summary = report.capture_summary.as_ref().unwrap();
    assert_eq!(summary.packets_total, 3);
    assert_eq!(summary.time_start.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(summary.time_end.as_deref(), Some("2024-01-01T00:00:02Z"));
    assert_eq!(report.generated_at, "2024-01-01T00:00:02Z");

    let stats = &report.stats;
    assert_eq!(stats.total_packets, 3);
    assert_eq!(stats.protocols[0].key, "TCP");
    assert_eq!(stats.protocols[0].count, 2);
    assert_eq!(stats.top_ips.len(), 2);
    assert_eq!(stats.top_ips[0].count, 3);
    assert_eq!(stats.network_graph.nodes.len(), 2);
    assert_eq!(stats.network_graph.edges.len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["tool"]["name"], "pcapscope");
    assert_eq!(json["stats"]["total_packets"], 3);
}

#[test]
fn filtering_decoded_trace_matches_stats_of_subset() {
    let bytes = classic_pcap(LINKTYPE_ETHERNET, false, &sample_frames());
    let path = write_temp("filter.pcap", &bytes);
    let packets = decode_trace(&path).unwrap();
    let _ = fs::remove_file(&path);

    let spec = FilterSpec {
        protocol: Some("TCP".to_string()),
        port: Some(80),
        ..FilterSpec::default()
    };
    let matched = filter_packets(&packets, &spec);
    assert_eq!(matched.len(), 2);
    assert!(matched.iter().all(|p| p.protocol_label() == "TCP"));

    let stats = compute_stats(&matched);
    assert_eq!(stats.total_packets, 2);
    assert_eq!(stats.protocols.len(), 1);
}

#[test]
fn corrupt_capture_is_an_error() {
    let mut bytes = classic_pcap(LINKTYPE_ETHERNET, false, &sample_frames());
    bytes[0] = 0x00;
    let path = write_temp("corrupt.pcap", &bytes);
    let decode = decode_trace(&path);
    let analysis = analyze_pcap_file(&path);
    let _ = fs::remove_file(&path);

    assert!(matches!(decode, Err(DecodeError::Source(_))));
    assert!(matches!(analysis, Err(AnalysisError::Decode(_))));
}

#[test]
fn missing_capture_is_an_error() {
    let path = common::temp_path("missing.pcap");
    assert!(decode_trace(&path).is_err());
    assert!(matches!(analyze_pcap_file(&path), Err(AnalysisError::Io(_))));
}
