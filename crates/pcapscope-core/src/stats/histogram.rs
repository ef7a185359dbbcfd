use std::collections::BTreeSet;

use crate::Distribution;
use crate::record::PacketRecord;
use crate::timestamp::{ClockPrecision, clock_label};

const MIN_TIME_BUCKETS: usize = 10;
const MAX_TIME_BUCKETS: usize = 50;
const PACKETS_PER_TIME_BUCKET: usize = 10;
const MIN_SIZE_BINS: usize = 5;
const MAX_SIZE_BINS: usize = 20;

/// Packet counts over equal-width time buckets.
///
/// Only strictly positive, parseable timestamps take part; when none remain
/// the whole sequence is reported as a single `0s` bucket.
pub(crate) fn time_distribution(packets: &[PacketRecord]) -> Distribution {
    if packets.is_empty() {
        return Distribution::default();
    }

    let times: Vec<f64> = packets
        .iter()
        .filter_map(|record| record.timestamp.valid_epoch())
        .collect();
    let Some((start, end)) = bounds(&times) else {
        return Distribution {
            labels: vec!["0s".to_string()],
            values: vec![packets.len() as u64],
        };
    };

    if start == end {
        return Distribution {
            labels: vec![clock_label(start, ClockPrecision::Seconds)],
            values: vec![times.len() as u64],
        };
    }

    let buckets = (times.len() / PACKETS_PER_TIME_BUCKET).clamp(MIN_TIME_BUCKETS, MAX_TIME_BUCKETS);
    let span = end - start;
    let width = span / buckets as f64;

    let mut values = vec![0u64; buckets];
    for at in &times {
        let index = (((at - start) / width).floor() as usize).min(buckets - 1);
        values[index] += 1;
    }

    let precision = ClockPrecision::for_span(span);
    let labels = (0..buckets)
        .map(|index| clock_label(start + index as f64 * width, precision))
        .collect();

    Distribution { labels, values }
}

/// Packet counts over equal-width frame-length bins.
pub(crate) fn size_distribution(packets: &[PacketRecord]) -> Distribution {
    let Some(min) = packets.iter().map(|record| record.length).min() else {
        return Distribution::default();
    };
    let max = packets.iter().map(|record| record.length).max().unwrap_or(min);

    if min == max {
        return Distribution {
            labels: vec![format!("{min} B")],
            values: vec![packets.len() as u64],
        };
    }

    let distinct: BTreeSet<u64> = packets.iter().map(|record| record.length).collect();
    let bins = distinct.len().clamp(MIN_SIZE_BINS, MAX_SIZE_BINS);
    let span = u128::from(max - min);
    let bins_wide = bins as u128;

    // Integer edges: the bin start of index `i` is `min + floor(span * i / bins)`.
    let edge = |index: usize| min + (span * index as u128 / bins_wide) as u64;

    let mut values = vec![0u64; bins];
    for record in packets {
        let offset = u128::from(record.length - min);
        let index = ((offset * bins_wide / span) as usize).min(bins - 1);
        values[index] += 1;
    }

    let labels = (0..bins)
        .map(|index| {
            let (start, end) = (edge(index), edge(index + 1));
            if end - start == 1 {
                format!("{start} B")
            } else {
                format!("{start}-{end} B")
            }
        })
        .collect();

    Distribution { labels, values }
}

/// Smallest and largest value, `None` for an empty slice.
pub(crate) fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &value| match acc {
        None => Some((value, value)),
        Some((low, high)) => Some((low.min(value), high.max(value))),
    })
}
