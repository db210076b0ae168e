//! Probing collaborator interfaces
//!
//! The coordinator consumes host and port probers through these traits only;
//! the bundled implementations are best-effort conveniences for the CLI.

pub mod host;
pub mod port;

use crate::device::Device;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;

pub use host::PingHostProber;
pub use port::TcpConnectPortProber;

/// Errors a probing collaborator may report for a single host
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Probe timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Streaming updates a port prober sends while probing one host
#[derive(Debug, Clone, PartialEq)]
pub enum PortProbeUpdate {
    /// An open port was found; may fire many times per host
    PortFound { port: u16, service: Option<String> },

    /// Exactly one completion signal per probed host
    Completed,
}

/// Channel a port prober streams its updates into
pub type PortProbeSink = mpsc::UnboundedSender<PortProbeUpdate>;

/// Asynchronous host-existence prober
#[async_trait]
pub trait HostProber: Send + Sync {
    /// Probe a single host. Returns the discovered device with `ip` always
    /// set and the remaining fields best-effort; an unreachable host is an
    /// error.
    async fn probe_host(
        &self,
        ip: Ipv4Addr,
        resolve_dns: bool,
        resolve_arp: bool,
        timeout: Duration,
    ) -> Result<Device, ProbeError>;
}

/// Asynchronous per-host port prober
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Probe `ports` on `ip` (an empty list means the prober's default set),
    /// sending zero or more `PortFound` updates followed by exactly one
    /// `Completed` into the sink. Port fan-out may be internally parallel.
    async fn scan_ports(&self, ip: Ipv4Addr, ports: Vec<u16>, timeout: Duration, sink: PortProbeSink);
}
