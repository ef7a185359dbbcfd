mod common;

use std::fs;

use pcap_parser::Linktype;
use pcapscope_core::{PacketSource, PcapFileSource, SourceError};

use common::{Frame, LINKTYPE_ETHERNET, LINKTYPE_RAW, classic_pcap, pcapng, write_temp};

fn drain(source: &mut PcapFileSource) -> Vec<pcapscope_core::PacketEvent> {
    let mut events = Vec::new();
    while let Some(event) = source.next_packet().unwrap() {
        events.push(event);
    }
    events
}

#[test]
fn pcap_source_reads_classic_microsecond_file() {
    let bytes = classic_pcap(LINKTYPE_ETHERNET, false, &common::sample_frames());
    let path = write_temp("micro.pcap", &bytes);
    let mut source = PcapFileSource::open(&path).unwrap();
    let events = drain(&mut source);
    let _ = fs::remove_file(&path);

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].ts, Some(1_704_067_200.0));
    assert_eq!(events[2].ts, Some(1_704_067_202.0));
    assert_eq!(events[0].linktype, Linktype::ETHERNET);
}

#[test]
fn pcap_source_honours_nanosecond_magic() {
    let frames = [Frame {
        ts_sec: 100,
        ts_frac: 250_000_000,
        data: vec![0x45; 20],
    }];
    let path = write_temp("nano.pcap", &classic_pcap(LINKTYPE_RAW, true, &frames));
    let mut source = PcapFileSource::open(&path).unwrap();
    let events = drain(&mut source);
    let _ = fs::remove_file(&path);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ts, Some(100.25));
    assert_eq!(events[0].linktype, Linktype::RAW);
}

#[test]
fn pcap_source_reads_pcapng_with_tsresol() {
    let frames = vec![
        (1_700_000_000_500_000_000u64, common::udp_frame(1, 2, b"a")),
        (1_700_000_001_000_000_000u64, common::udp_frame(1, 2, b"bc")),
    ];
    let path = write_temp("nano.pcapng", &pcapng(9, &frames));
    let mut source = PcapFileSource::open(&path).unwrap();
    let events = drain(&mut source);
    let _ = fs::remove_file(&path);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].ts, Some(1_700_000_000.5));
    assert_eq!(events[1].ts, Some(1_700_000_001.0));
    assert_eq!(events[0].data, frames[0].1);
    assert_eq!(events[1].data.len(), frames[1].1.len());
}

#[test]
fn pcap_source_rejects_truncated_file() {
    let path = write_temp("truncated.pcapng", &[0x0a, 0x0d, 0x0d]);
    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    let _ = fs::remove_file(&path);

    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn pcap_source_rejects_unknown_container() {
    let path = write_temp("garbage.pcap", b"this is not a capture file at all");
    let result = PcapFileSource::open(&path).and_then(|mut source| {
        while source.next_packet()?.is_some() {}
        Ok(())
    });
    let _ = fs::remove_file(&path);

    assert!(matches!(result, Err(SourceError::Pcap(_))));
}
