#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use etherparse::PacketBuilder;

pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_RAW: u32 = 101;

pub const CLIENT_MAC: [u8; 6] = [0x00, 0x50, 0x56, 0x0a, 0x0b, 0x0c];
pub const SERVER_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique path in the system temp dir.
pub fn temp_path(name: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pcapscope_{unique}_{seq}_{name}"))
}

pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path = temp_path(name);
    fs::write(&path, bytes).unwrap();
    path
}

pub struct Frame {
    pub ts_sec: u32,
    pub ts_frac: u32,
    pub data: Vec<u8>,
}

/// Little-endian classic pcap file.
pub fn classic_pcap(linktype: u32, nanosecond: bool, frames: &[Frame]) -> Vec<u8> {
    let magic: u32 = if nanosecond { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
    let mut out = Vec::new();
    out.extend_from_slice(&magic.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65_535u32.to_le_bytes());
    out.extend_from_slice(&linktype.to_le_bytes());
    for frame in frames {
        let len = frame.data.len() as u32;
        out.extend_from_slice(&frame.ts_sec.to_le_bytes());
        out.extend_from_slice(&frame.ts_frac.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&frame.data);
    }
    out
}

fn push_block(out: &mut Vec<u8>, block_type: u32, body: &[u8]) {
    let total = (12 + body.len()) as u32;
    out.extend_from_slice(&block_type.to_le_bytes());
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(&total.to_le_bytes());
}

/// Little-endian pcapng file with one Ethernet interface declaring
/// `if_tsresol`, and one Enhanced Packet Block per `(timestamp, frame)`.
pub fn pcapng(tsresol: u8, frames: &[(u64, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();

    let mut shb = Vec::new();
    shb.extend_from_slice(&0x1a2b_3c4du32.to_le_bytes());
    shb.extend_from_slice(&1u16.to_le_bytes());
    shb.extend_from_slice(&0u16.to_le_bytes());
    shb.extend_from_slice(&(-1i64).to_le_bytes());
    push_block(&mut out, 0x0a0d_0d0a, &shb);

    let mut idb = Vec::new();
    idb.extend_from_slice(&(LINKTYPE_ETHERNET as u16).to_le_bytes());
    idb.extend_from_slice(&0u16.to_le_bytes());
    idb.extend_from_slice(&65_535u32.to_le_bytes());
    idb.extend_from_slice(&9u16.to_le_bytes());
    idb.extend_from_slice(&1u16.to_le_bytes());
    idb.extend_from_slice(&[tsresol, 0, 0, 0]);
    idb.extend_from_slice(&0u16.to_le_bytes());
    idb.extend_from_slice(&0u16.to_le_bytes());
    push_block(&mut out, 1, &idb);

    for (ts, data) in frames {
        let mut epb = Vec::new();
        epb.extend_from_slice(&0u32.to_le_bytes());
        epb.extend_from_slice(&((ts >> 32) as u32).to_le_bytes());
        epb.extend_from_slice(&(*ts as u32).to_le_bytes());
        epb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        epb.extend_from_slice(&(data.len() as u32).to_le_bytes());
        epb.extend_from_slice(data);
        while epb.len() % 4 != 0 {
            epb.push(0);
        }
        push_block(&mut out, 6, &epb);
    }
    out
}

pub fn tcp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(CLIENT_MAC, SERVER_MAC)
        .ipv4([192, 168, 1, 10], [192, 168, 1, 1], 64)
        .tcp(src_port, dst_port, 1, 65_535)
        .psh()
        .ack(1);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SERVER_MAC, CLIENT_MAC)
        .ipv4([192, 168, 1, 1], [192, 168, 1, 10], 64)
        .udp(src_port, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// TCP at t=0 s, UDP at t=1 s, TCP at t=2 s after 2024-01-01T00:00:00Z.
pub fn sample_frames() -> Vec<Frame> {
    let base = 1_704_067_200;
    vec![
        Frame {
            ts_sec: base,
            ts_frac: 0,
            data: tcp_frame(51_000, 80, b"GET / HTTP/1.1\r\n"),
        },
        Frame {
            ts_sec: base + 1,
            ts_frac: 0,
            data: udp_frame(53, 40_000, b"dns"),
        },
        Frame {
            ts_sec: base + 2,
            ts_frac: 0,
            data: tcp_frame(51_000, 80, &[]),
        },
    ]
}
