use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a scan or a report write. Per-port socket failures
/// are not errors at this level; the scanner records them as data in each
/// `ProbeOutcome`.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("could not resolve target '{host}': {source}")]
    Resolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid port specification '{spec}': {reason}")]
    InvalidPortSpec { spec: String, reason: String },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
