use crate::ThroughputStats;
use crate::record::PacketRecord;

use super::histogram::bounds;

const SHORT_SPAN_SECONDS: f64 = 10.0;
const MINUTE: f64 = 60.0;
const HOUR: f64 = 3600.0;

/// Window width for a capture spanning `span` seconds: about fifty windows
/// under ten seconds (at least 0.1 s each), about a hundred beyond (at least
/// one second each).
fn window_width(span: f64) -> f64 {
    if span < SHORT_SPAN_SECONDS {
        (span / 50.0).max(0.1)
    } else {
        (span / 100.0).max(1.0)
    }
}

/// Label for a window starting `offset` seconds into a series spanning `span`.
fn window_label(offset: f64, span: f64) -> String {
    if span < MINUTE {
        format!("{offset:.1}s")
    } else if span < HOUR {
        let minutes = (offset / MINUTE).floor() as u64;
        let seconds = (offset % MINUTE).floor() as u64;
        format!("{minutes:02}:{seconds:02}")
    } else {
        let hours = (offset / HOUR).floor() as u64;
        let minutes = ((offset % HOUR) / MINUTE).floor() as u64;
        format!("{hours}h {minutes:02}m")
    }
}

/// Byte and packet rates over fixed-width windows.
///
/// With fewer than two distinct valid timestamps there is no span to divide
/// by, so the sequence collapses into one `0s` window holding its totals.
pub(crate) fn throughput(packets: &[PacketRecord]) -> ThroughputStats {
    if packets.is_empty() {
        return ThroughputStats::default();
    }

    let samples: Vec<(f64, u64)> = packets
        .iter()
        .filter_map(|record| Some((record.timestamp.valid_epoch()?, record.length)))
        .collect();
    let times: Vec<f64> = samples.iter().map(|(at, _)| *at).collect();

    let (start, end) = match bounds(&times) {
        Some((start, end)) if end > start => (start, end),
        _ => {
            let total: u64 = packets.iter().map(|record| record.length).sum();
            return ThroughputStats {
                avg_throughput: total,
                peak_throughput: total,
                window_seconds: 0.0,
                time_labels: vec!["0s".to_string()],
                bytes_per_second: vec![total],
                packets_per_second: vec![packets.len() as u64],
            };
        }
    };

    let span = end - start;
    let width = window_width(span);
    let windows = ((span / width).floor() as usize) + 1;

    let mut bytes = vec![0u64; windows];
    let mut counts = vec![0u64; windows];
    for (at, length) in &samples {
        let index = (((at - start) / width).floor() as usize).min(windows - 1);
        bytes[index] += length;
        counts[index] += 1;
    }

    let bytes_per_second: Vec<u64> = bytes
        .iter()
        .map(|total| (*total as f64 / width) as u64)
        .collect();
    let packets_per_second = counts
        .iter()
        .map(|total| (*total as f64 / width) as u64)
        .collect();
    let time_labels = (0..windows)
        .map(|index| window_label(index as f64 * width, span))
        .collect();

    let valid_bytes: u64 = samples.iter().map(|(_, length)| length).sum();
    ThroughputStats {
        avg_throughput: (valid_bytes as f64 / span) as u64,
        peak_throughput: bytes_per_second.iter().copied().max().unwrap_or(0),
        window_seconds: width,
        time_labels,
        bytes_per_second,
        packets_per_second,
    }
}
