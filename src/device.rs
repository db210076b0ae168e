//! Device model shared between the coordinator and its collaborators
//!
//! A `Device` is keyed by its IP string; every other field is populated
//! best-effort as probes report back.

use serde::{Deserialize, Serialize};

/// Transport protocol for an open port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One open port on a discovered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPort {
    pub port: u16,
    pub protocol: Protocol,
    pub service: Option<String>,
}

impl OpenPort {
    pub fn new(port: u16, protocol: Protocol) -> Self {
        Self {
            port,
            protocol,
            service: None,
        }
    }

    pub fn with_service(mut self, service: String) -> Self {
        self.service = Some(service);
        self
    }
}

/// A host discovered during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// IP address, always set
    pub ip: String,

    /// Resolved hostname, if DNS resolution succeeded
    pub hostname: Option<String>,

    /// MAC address, if ARP resolution succeeded
    pub mac: Option<String>,

    /// Hardware vendor derived from the MAC prefix
    pub vendor: Option<String>,

    /// Whether the host answered a liveness probe
    pub online: bool,

    /// Open ports found during the port-scan phase
    pub open_ports: Vec<OpenPort>,
}

impl Device {
    pub fn new(ip: String) -> Self {
        Self {
            ip,
            hostname: None,
            mac: None,
            vendor: None,
            online: false,
            open_ports: Vec::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: String) -> Self {
        self.hostname = Some(hostname);
        self
    }

    pub fn with_mac(mut self, mac: String) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_vendor(mut self, vendor: String) -> Self {
        self.vendor = Some(vendor);
        self
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }
}
