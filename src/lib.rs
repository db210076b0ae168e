//! NetSweep - concurrent LAN discovery and port-scan orchestration
//!
//! The coordinator dispatches host discovery probes across a bounded worker
//! pool, serializes the optional per-host port-scan phase, and publishes a
//! stream of lifecycle events.

pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod event;
pub mod metrics;
pub mod probe;
pub mod top_ports;
pub mod utils;

// Re-export commonly used types
pub use config::{ScanConfig, ScanStrategy};
pub use coordinator::ScanCoordinator;
pub use device::{Device, OpenPort, Protocol};
pub use error::{ScanError, ScanResult};
pub use event::{EventReceiver, ScanEvent};
pub use metrics::{NamedTimer, ScanMetrics};
pub use probe::{HostProber, PortProbeUpdate, PortProber};
pub use top_ports::default_ports;

pub type Result<T> = std::result::Result<T, ScanError>;
