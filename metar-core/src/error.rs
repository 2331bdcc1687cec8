//! Error types shared across the crate.
//!
//! Per-station fetch problems are deliberately *not* errors here: a station
//! that cannot be fetched or classified degrades to the fault color and the
//! cycle carries on. Only configuration and device problems are allowed to
//! stop a run.

use thiserror::Error;

use crate::expr::ExprError;

/// Fatal configuration problems, detected at load time. The process refuses
/// to start on any of these rather than drive undefined LED positions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no flight categories configured")]
    EmptyRuleTable,

    #[error("category '{category}' has an invalid expression '{expression}': {source}")]
    InvalidExpression {
        category: String,
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("led count must be greater than zero")]
    ZeroLedCount,

    #[error("airport '{station}' is bound to LED {index}, but the strip only has {count} LEDs")]
    IndexOutOfRange {
        station: String,
        index: usize,
        count: usize,
    },

    #[error("invalid station id '{station}': expected an uppercase alphanumeric code")]
    InvalidStationId { station: String },
}

/// Non-fatal configuration findings, reported at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Several airports target the same LED; the last one configured wins.
    DuplicateIndex { index: usize, stations: Vec<String> },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::DuplicateIndex { index, stations } => write!(
                f,
                "LED {} is bound to multiple stations ({}); the last one wins",
                index,
                stations.join(", ")
            ),
        }
    }
}

/// A METAR string that could not be decoded into the fields classification
/// needs. Recovered per station: the record is dropped from the fetch result.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty METAR string")]
    Empty,

    #[error("METAR '{raw}' contains no visibility group")]
    MissingVisibility { raw: String },
}

/// LED device failures, surfaced to the caller of the render gate.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to initialize LED device: {0}")]
    Init(String),

    #[error("device write failed: {0}")]
    Write(String),
}
