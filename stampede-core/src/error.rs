use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the aggregation step.
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    /// Both the succeeded and the failed count are zero, so the error rate would be 0/0.
    #[error("run has no samples; error rate is undefined (division by zero)")]
    EmptyRun,

    #[error("run has a zero duration; throughput is undefined (division by zero)")]
    ZeroDuration,

    #[error("percentile {0} is outside of 0..=100")]
    InvalidPercentile(f64),
}

/// Failures while persisting or reading run records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to create run directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Records store whole seconds, so a fractional duration would not survive a reload.
    #[error("run duration {0:?} is not a whole number of seconds")]
    FractionalDuration(Duration),

    #[error("failed to write run record {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode run record {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed run record {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
