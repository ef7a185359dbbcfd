//! Declarative packet filtering.
//!
//! Every present predicate must hold; absent predicates (and empty strings)
//! impose nothing. A predicate on a layer the record lacks never matches.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::PacketRecord;
use crate::timestamp::parse_timestamp;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid {field} value {value:?}: expected an ISO-8601 timestamp")]
    InvalidTime { field: &'static str, value: String },
    #[error("length_min {min} is greater than length_max {max}")]
    InvertedLength { min: u64, max: u64 },
}

/// Predicate set applied to packet records.
///
/// # Examples
/// ```
/// use pcapscope_core::FilterSpec;
///
/// let spec: FilterSpec = serde_json::from_str(r#"{"srcIp": "192.168.", "port": 443}"#).unwrap();
/// assert_eq!(spec.src_ip_contains.as_deref(), Some("192.168."));
/// assert_eq!(spec.port, Some(443));
/// assert!(!spec.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(alias = "srcIp", skip_serializing_if = "Option::is_none")]
    pub src_ip_contains: Option<String>,
    #[serde(alias = "dstIp", skip_serializing_if = "Option::is_none")]
    pub dst_ip_contains: Option<String>,
    #[serde(alias = "srcMac", skip_serializing_if = "Option::is_none")]
    pub src_mac_contains: Option<String>,
    #[serde(alias = "dstMac", skip_serializing_if = "Option::is_none")]
    pub dst_mac_contains: Option<String>,
    /// Exact protocol label (`TCP`, `UDP`, `IP(1)`, `Other`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Matches either transport port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(alias = "lengthMin", skip_serializing_if = "Option::is_none")]
    pub length_min: Option<u64>,
    #[serde(alias = "lengthMax", skip_serializing_if = "Option::is_none")]
    pub length_max: Option<u64>,
    #[serde(alias = "timeStart", skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(alias = "timeEnd", skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

impl FilterSpec {
    /// True when no predicate constrains anything.
    pub fn is_empty(&self) -> bool {
        [
            &self.src_ip_contains,
            &self.dst_ip_contains,
            &self.src_mac_contains,
            &self.dst_mac_contains,
            &self.protocol,
            &self.time_start,
            &self.time_end,
        ]
        .into_iter()
        .all(|field| present(field).is_none())
            && self.port.is_none()
            && self.length_min.is_none()
            && self.length_max.is_none()
    }

    /// Report bounds that would make the filter reject everything by accident.
    pub fn validate(&self) -> Result<(), FilterError> {
        for (field, value) in [("time_start", &self.time_start), ("time_end", &self.time_end)] {
            if let Some(text) = present(value) {
                if parse_timestamp(text).is_none() {
                    return Err(FilterError::InvalidTime {
                        field,
                        value: text.to_string(),
                    });
                }
            }
        }
        if let (Some(min), Some(max)) = (self.length_min, self.length_max) {
            if min > max {
                return Err(FilterError::InvertedLength { min, max });
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &PacketRecord) -> bool {
        Matcher::new(self).matches(record)
    }
}

/// Records satisfying `spec`, in their original order.
///
/// # Examples
/// ```
/// use pcapscope_core::{FilterSpec, PacketRecord, PacketTime, filter_packets};
///
/// let packets = vec![PacketRecord::new(1, PacketTime::Epoch(1.0), 60)];
/// let spec = FilterSpec { length_min: Some(100), ..FilterSpec::default() };
/// assert!(filter_packets(&packets, &spec).is_empty());
/// assert_eq!(filter_packets(&packets, &FilterSpec::default()), packets);
/// ```
pub fn filter_packets(packets: &[PacketRecord], spec: &FilterSpec) -> Vec<PacketRecord> {
    let matcher = Matcher::new(spec);
    packets
        .iter()
        .filter(|record| matcher.matches(record))
        .cloned()
        .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Open,
    At(f64),
    /// Bound text that does not parse; nothing satisfies it.
    Invalid,
}

impl Bound {
    fn parse(field: &str, value: &Option<String>) -> Self {
        match present(value) {
            None => Bound::Open,
            Some(text) => match parse_timestamp(text) {
                Some(at) => Bound::At(at),
                None => {
                    warn!("{field} {text:?} is not a timestamp; no packet will match");
                    Bound::Invalid
                }
            },
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, Bound::Open)
    }
}

/// Filter with its text bounds parsed and MAC needles lowercased once.
struct Matcher<'s> {
    spec: &'s FilterSpec,
    src_mac: Option<String>,
    dst_mac: Option<String>,
    start: Bound,
    end: Bound,
}

impl<'s> Matcher<'s> {
    fn new(spec: &'s FilterSpec) -> Self {
        Self {
            spec,
            src_mac: present(&spec.src_mac_contains).map(str::to_lowercase),
            dst_mac: present(&spec.dst_mac_contains).map(str::to_lowercase),
            start: Bound::parse("time_start", &spec.time_start),
            end: Bound::parse("time_end", &spec.time_end),
        }
    }

    fn matches(&self, record: &PacketRecord) -> bool {
        self.ip_matches(record)
            && self.mac_matches(record)
            && self.protocol_matches(record)
            && self.port_matches(record)
            && self.length_matches(record)
            && self.time_matches(record)
    }

    fn ip_matches(&self, record: &PacketRecord) -> bool {
        let src = present(&self.spec.src_ip_contains);
        let dst = present(&self.spec.dst_ip_contains);
        if src.is_none() && dst.is_none() {
            return true;
        }
        let Some(network) = &record.network else {
            return false;
        };
        src.is_none_or(|needle| network.src_ip.to_string().contains(needle))
            && dst.is_none_or(|needle| network.dst_ip.to_string().contains(needle))
    }

    fn mac_matches(&self, record: &PacketRecord) -> bool {
        if self.src_mac.is_none() && self.dst_mac.is_none() {
            return true;
        }
        let Some(link) = &record.link else {
            return false;
        };
        // Display is already lowercase.
        self.src_mac
            .as_deref()
            .is_none_or(|needle| link.src_mac.to_string().contains(needle))
            && self
                .dst_mac
                .as_deref()
                .is_none_or(|needle| link.dst_mac.to_string().contains(needle))
    }

    fn protocol_matches(&self, record: &PacketRecord) -> bool {
        present(&self.spec.protocol).is_none_or(|protocol| record.protocol_label() == protocol)
    }

    fn port_matches(&self, record: &PacketRecord) -> bool {
        let Some(port) = self.spec.port else {
            return true;
        };
        record
            .ports()
            .is_some_and(|(src, dst)| src == port || dst == port)
    }

    fn length_matches(&self, record: &PacketRecord) -> bool {
        self.spec.length_min.is_none_or(|min| record.length >= min)
            && self.spec.length_max.is_none_or(|max| record.length <= max)
    }

    fn time_matches(&self, record: &PacketRecord) -> bool {
        if self.start.is_open() && self.end.is_open() {
            return true;
        }
        let Some(at) = record.timestamp.to_epoch() else {
            return false;
        };
        let after_start = match self.start {
            Bound::Open => true,
            Bound::At(start) => at >= start,
            Bound::Invalid => false,
        };
        let before_end = match self.end {
            Bound::Open => true,
            Bound::At(end) => at <= end,
            Bound::Invalid => false,
        };
        after_start && before_end
    }
}
