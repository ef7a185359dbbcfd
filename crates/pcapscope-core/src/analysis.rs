//! Report building: decode a capture, aggregate it, wrap it in a `Report`.

use std::path::Path;

use log::info;
use thiserror::Error;

use crate::decode::{DecodeError, DecodeOptions, decode_trace_with};
use crate::record::PacketRecord;
use crate::stats::{StatsConfig, compute_stats_with};
use crate::timestamp::ts_to_rfc3339;
use crate::vendor::{OuiTable, VendorLookup};
use crate::{CaptureSummary, DEFAULT_GENERATED_AT, Report, make_stub_report};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Settings for a full analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub decode: DecodeOptions,
    pub stats: StatsConfig,
}

/// Analyze a capture file with the built-in vendor table and defaults.
pub fn analyze_pcap_file(path: &Path) -> Result<Report, AnalysisError> {
    analyze_pcap_file_with(path, &OuiTable::builtin(), &AnalysisOptions::default())
}

pub fn analyze_pcap_file_with(
    path: &Path,
    vendors: &dyn VendorLookup,
    options: &AnalysisOptions,
) -> Result<Report, AnalysisError> {
    let input_bytes = path.metadata()?.len();
    let packets = decode_trace_with(path, vendors, options.decode)?;
    let report = analyze_packets(
        &path.display().to_string(),
        input_bytes,
        &packets,
        vendors,
        &options.stats,
    );
    info!(
        "analyzed {} packets from {}",
        report.stats.total_packets,
        path.display()
    );
    Ok(report)
}

/// Build a report over records that were already decoded.
///
/// The capture window spans the earliest and latest valid timestamps, and
/// `generated_at` is the end of that window so repeated runs are identical.
///
/// # Examples
/// ```
/// use pcapscope_core::{NoVendors, PacketRecord, PacketTime, StatsConfig, analyze_packets};
///
/// let packets = vec![
///     PacketRecord::new(1, PacketTime::Epoch(0.0), 60),
///     PacketRecord::new(2, PacketTime::Epoch(86_400.0), 60),
/// ];
/// let report = analyze_packets("memory", 0, &packets, &NoVendors, &StatsConfig::default());
/// let summary = report.capture_summary.unwrap();
/// assert_eq!(summary.packets_total, 2);
/// assert_eq!(summary.time_start.as_deref(), Some("1970-01-02T00:00:00Z"));
/// assert_eq!(report.generated_at, "1970-01-02T00:00:00Z");
/// ```
pub fn analyze_packets(
    input_path: &str,
    input_bytes: u64,
    packets: &[PacketRecord],
    vendors: &dyn VendorLookup,
    config: &StatsConfig,
) -> Report {
    let mut first_ts = None;
    let mut last_ts = None;
    for record in packets {
        update_ts_bounds(&mut first_ts, &mut last_ts, record.timestamp.valid_epoch());
    }

    let mut report = make_stub_report(input_path, input_bytes);
    report.capture_summary = Some(CaptureSummary {
        packets_total: packets.len() as u64,
        time_start: ts_to_rfc3339(first_ts),
        time_end: ts_to_rfc3339(last_ts),
    });
    report.generated_at = report
        .capture_summary
        .as_ref()
        .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.stats = compute_stats_with(packets, config, vendors);
    report
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let Some(ts) = ts else {
        return;
    };
    if first.is_none_or(|existing| ts < existing) {
        *first = Some(ts);
    }
    if last.is_none_or(|existing| ts > existing) {
        *last = Some(ts);
    }
}
