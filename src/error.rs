//! Error handling for the netsweep scan orchestration engine
//!
//! Per-host probe failures are absorbed by the coordinator and logged;
//! only scan-level setup problems surface through these variants.

use thiserror::Error;

/// Main error type for scan orchestration
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid subnet: {0}")]
    InvalidSubnet(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("A scan is already running")]
    AlreadyScanning,

    #[error("Probe error: {0}")]
    ProbeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Event channel closed")]
    ChannelClosed,
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;
