//! Default port prober: parallel TCP connect sweep for a single host

use super::{PortProbeSink, PortProbeUpdate, PortProber};
use crate::top_ports;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time::timeout;

const DEFAULT_CONCURRENCY: usize = 64;

/// TCP connect port prober; fans out over the port list internally while the
/// coordinator serializes hosts
#[derive(Debug)]
pub struct TcpConnectPortProber {
    concurrency: usize,
}

impl TcpConnectPortProber {
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Default for TcpConnectPortProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortProber for TcpConnectPortProber {
    async fn scan_ports(
        &self,
        ip: Ipv4Addr,
        ports: Vec<u16>,
        probe_timeout: Duration,
        sink: PortProbeSink,
    ) {
        let ports = if ports.is_empty() {
            top_ports::default_ports()
        } else {
            ports
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(ports.len());

        for port in ports {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let sink = sink.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let addr = SocketAddr::new(IpAddr::V4(ip), port);

                if let Ok(Ok(_stream)) = timeout(probe_timeout, TcpStream::connect(addr)).await {
                    let service = top_ports::tcp_service_name(port).map(str::to_string);
                    log::debug!(
                        "Open port {}:{} ({})",
                        ip,
                        port,
                        service.as_deref().unwrap_or("unknown")
                    );
                    let _ = sink.send(PortProbeUpdate::PortFound { port, service });
                }
            }));
        }

        let _ = futures::future::join_all(handles).await;

        let _ = sink.send(PortProbeUpdate::Completed);
    }
}
