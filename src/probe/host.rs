//! Default host prober: system ping with a TCP connect fallback
//!
//! Liveness goes through the system `ping` binary first and falls back to a
//! short TCP connect sweep over a handful of common ports, so the prober
//! works without raw socket privileges. DNS and ARP resolution shell out to
//! the standard system tools and degrade to `None` on any failure.

use super::{HostProber, ProbeError};
use crate::device::Device;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

/// Ports tried by the TCP liveness fallback
const FALLBACK_PORTS: [u16; 5] = [80, 443, 22, 445, 139];

/// Small OUI prefix table for vendor lookups
static OUI_VENDORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut vendors = HashMap::new();
    vendors.insert("b8:27:eb", "Raspberry Pi Foundation");
    vendors.insert("dc:a6:32", "Raspberry Pi Trading");
    vendors.insert("00:1a:2b", "Ayecom Technology");
    vendors.insert("f0:18:98", "Apple");
    vendors.insert("3c:22:fb", "Apple");
    vendors.insert("00:15:5d", "Microsoft");
    vendors.insert("00:50:56", "VMware");
    vendors.insert("08:00:27", "Oracle VirtualBox");
    vendors.insert("52:54:00", "QEMU/KVM");
    vendors.insert("00:1b:21", "Intel");
    vendors
});

/// Host prober backed by system ping and TCP connect probes
#[derive(Debug, Default)]
pub struct PingHostProber;

impl PingHostProber {
    pub fn new() -> Self {
        Self
    }

    async fn ping(&self, ip: Ipv4Addr, probe_timeout: Duration) -> bool {
        let wait_secs = std::cmp::max(1, probe_timeout.as_secs());
        let output = Command::new("ping")
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(wait_secs.to_string())
            .arg(ip.to_string())
            .output()
            .await;

        match output {
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("ping {} failed to spawn: {}", ip, e);
                false
            }
        }
    }

    async fn tcp_fallback(&self, ip: Ipv4Addr, probe_timeout: Duration) -> bool {
        for port in FALLBACK_PORTS {
            let addr = SocketAddr::new(IpAddr::V4(ip), port);
            match timeout(probe_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(_)) => return true,
                // Refused means something answered, so the host is up
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => return true,
                _ => continue,
            }
        }
        false
    }

    async fn reverse_dns(&self, ip: Ipv4Addr, probe_timeout: Duration) -> Option<String> {
        let output = timeout(
            probe_timeout,
            Command::new("host").arg(ip.to_string()).output(),
        )
        .await
        .ok()?
        .ok()?;

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if let Some(idx) = line.find("domain name pointer ") {
                let name = line[idx + "domain name pointer ".len()..]
                    .trim()
                    .trim_end_matches('.');
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    async fn arp_lookup(&self, ip: Ipv4Addr) -> Option<String> {
        let output = Command::new("arp")
            .arg("-n")
            .arg(ip.to_string())
            .output()
            .await
            .ok()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for token in stdout.split_whitespace() {
            if token.len() == 17 && token.bytes().filter(|b| *b == b':').count() == 5 {
                return Some(token.to_ascii_lowercase());
            }
        }
        None
    }

    fn vendor_for_mac(mac: &str) -> Option<String> {
        let prefix = mac.get(..8)?;
        OUI_VENDORS.get(prefix).map(|v| v.to_string())
    }
}

#[async_trait]
impl HostProber for PingHostProber {
    async fn probe_host(
        &self,
        ip: Ipv4Addr,
        resolve_dns: bool,
        resolve_arp: bool,
        probe_timeout: Duration,
    ) -> Result<Device, ProbeError> {
        let online =
            self.ping(ip, probe_timeout).await || self.tcp_fallback(ip, probe_timeout).await;

        if !online {
            return Err(ProbeError::Unreachable(ip.to_string()));
        }

        let mut device = Device::new(ip.to_string()).with_online(true);

        if resolve_dns {
            device.hostname = self.reverse_dns(ip, probe_timeout).await;
        }

        if resolve_arp {
            if let Some(mac) = self.arp_lookup(ip).await {
                device.vendor = Self::vendor_for_mac(&mac);
                device.mac = Some(mac);
            }
        }

        Ok(device)
    }
}
