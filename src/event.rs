//! Scan lifecycle events published by the coordinator
//!
//! Events flow through an unbounded channel handed out at coordinator
//! construction. Ordering contract: `Started` precedes every other event of
//! the same scan generation and `Completed` follows the last one; no ordering
//! is guaranteed between `DeviceDiscovered` events for different hosts.

use crate::device::Device;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events emitted over the lifetime of a scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A scan started; `total_hosts` is the subnet's usable host count
    Started { total_hosts: usize },

    /// One host finished its discovery probe
    Progress {
        current: usize,
        total: usize,
        ip: String,
    },

    /// Terminal result for one host, emitted exactly once per host
    DeviceDiscovered(Device),

    /// The scan drained; fires exactly once per scan generation
    Completed {
        devices_found: usize,
        duration: Duration,
    },

    /// Scan-level setup failure; the scan never left Idle
    Error { message: String },

    Paused,
    Resumed,
}

/// Sender half used internally by the coordinator
pub type EventSender = mpsc::UnboundedSender<ScanEvent>;

/// Receiver half handed to the controller/UI layer
pub type EventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

/// Create the event channel pair
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
