use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A resolved scan target. `input` is what the operator typed; `resolved`
/// is the concrete address every socket operation uses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub input: String,
    pub resolved: IpAddr,
}

/// Socket-level classification for a probe that did not find an open port.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[default]
    None,
    Timeout,
    Refused,
    Other,
}

/// One finished probe. Produced exactly once per port by the scanner and
/// never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: u16,
    pub open: bool,
    pub service: Option<String>,
    pub error: ErrorKind,
    pub latency_ms: u64,
}

/// One open-port row in a rendered report. `state` is always `"open"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenPortInfo {
    pub port: u16,
    pub service: String,
    pub state: String,
}

/// The serializable report. Field names are part of the output contract:
/// a JSON rendering must parse back into an identical value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub target: String,
    pub target_ip: IpAddr,
    pub scan_time: String,
    pub open_ports: Vec<OpenPortInfo>,
    pub total_open: usize,
}

/// Everything a scan run produced, in probe-completion order, plus
/// progress counters. The report builder imposes the final port ordering.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub target: ScanTarget,
    pub outcomes: Vec<ProbeOutcome>,
    pub ports_total: u64,
    pub ports_scanned: u64,
    pub open_count: u64,
    pub started_at: String,
    pub finished_at: String,
    pub cancelled: bool,
}
