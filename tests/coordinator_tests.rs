//! Integration tests for the scan coordinator, driven by deterministic mock
//! probers

use async_trait::async_trait;
use netsweep::{
    config::ScanConfig,
    coordinator::ScanCoordinator,
    device::Device,
    event::{EventReceiver, ScanEvent},
    metrics::ScanMetrics,
    probe::{HostProber, PortProbeSink, PortProbeUpdate, PortProber, ProbeError},
};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Host prober that reports a fixed set of IPs as online, optionally after a
/// delay
struct MockHostProber {
    online: HashSet<Ipv4Addr>,
    delay: Duration,
}

impl MockHostProber {
    fn online(ips: &[&str]) -> Self {
        Self {
            online: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl HostProber for MockHostProber {
    async fn probe_host(
        &self,
        ip: Ipv4Addr,
        _resolve_dns: bool,
        _resolve_arp: bool,
        _timeout: Duration,
    ) -> Result<Device, ProbeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.online.contains(&ip) {
            Ok(Device::new(ip.to_string()).with_online(true))
        } else {
            Err(ProbeError::Unreachable(ip.to_string()))
        }
    }
}

/// Port prober with a fixed open-port table; honors the requested port list
struct MockPortProber {
    open: HashMap<Ipv4Addr, Vec<u16>>,
}

impl MockPortProber {
    fn new(open: &[(&str, &[u16])]) -> Self {
        Self {
            open: open
                .iter()
                .map(|(ip, ports)| (ip.parse().unwrap(), ports.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl PortProber for MockPortProber {
    async fn scan_ports(
        &self,
        ip: Ipv4Addr,
        ports: Vec<u16>,
        _timeout: Duration,
        sink: PortProbeSink,
    ) {
        if let Some(open) = self.open.get(&ip) {
            for &port in open {
                if ports.is_empty() || ports.contains(&port) {
                    let _ = sink.send(PortProbeUpdate::PortFound {
                        port,
                        service: Some("mock".to_string()),
                    });
                }
            }
        }
        let _ = sink.send(PortProbeUpdate::Completed);
    }
}

/// Port prober that drops its sink without ever signalling completion
struct FaultyPortProber;

#[async_trait]
impl PortProber for FaultyPortProber {
    async fn scan_ports(
        &self,
        _ip: Ipv4Addr,
        _ports: Vec<u16>,
        _timeout: Duration,
        sink: PortProbeSink,
    ) {
        let _ = sink.send(PortProbeUpdate::PortFound {
            port: 8080,
            service: None,
        });
        // sink dropped here without Completed
    }
}

fn coordinator_with(
    host_prober: impl HostProber + 'static,
    port_prober: impl PortProber + 'static,
) -> (ScanCoordinator, EventReceiver) {
    ScanCoordinator::new(
        Arc::new(host_prober),
        Arc::new(port_prober),
        Arc::new(ScanMetrics::new()),
    )
}

/// Drain events until `Completed`, failing the test if nothing arrives
async fn run_to_completion(events: &mut EventReceiver) -> Vec<ScanEvent> {
    let mut collected = Vec::new();
    loop {
        let scan_event = timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("scan did not complete in time")
            .expect("event channel closed before completion");

        let done = matches!(scan_event, ScanEvent::Completed { .. });
        collected.push(scan_event);
        if done {
            return collected;
        }
    }
}

fn discovered_devices(events: &[ScanEvent]) -> Vec<&Device> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::DeviceDiscovered(device) => Some(device),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_scenario_a_discovery_only() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"]),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string()).with_timeout(100);
    coordinator.start_scan(config).unwrap();

    let collected = run_to_completion(&mut events).await;

    assert_eq!(
        collected.first(),
        Some(&ScanEvent::Started { total_hosts: 2 })
    );

    let progress_count = collected
        .iter()
        .filter(|e| matches!(e, ScanEvent::Progress { .. }))
        .count();
    assert_eq!(progress_count, 2);

    let devices = discovered_devices(&collected);
    assert_eq!(devices.len(), 2);
    // No port scan requested: terminal events carry no ports
    assert!(devices.iter().all(|d| d.open_ports.is_empty()));

    match collected.last() {
        Some(ScanEvent::Completed { devices_found, .. }) => assert_eq!(*devices_found, 2),
        other => panic!("expected Completed, got {:?}", other),
    }
    assert!(!coordinator.is_scanning());
}

#[tokio::test]
async fn test_scenario_b_port_scan_merge() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"]),
        MockPortProber::new(&[("192.168.1.1", &[80])]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string())
        .with_port_scan(true)
        .with_ports(vec![80])
        .with_timeout(100);
    coordinator.start_scan(config).unwrap();

    let collected = run_to_completion(&mut events).await;
    let devices = discovered_devices(&collected);
    assert_eq!(devices.len(), 2);

    let host1 = devices.iter().find(|d| d.ip == "192.168.1.1").unwrap();
    assert_eq!(host1.open_ports.len(), 1);
    assert_eq!(host1.open_ports[0].port, 80);
    assert_eq!(host1.open_ports[0].service.as_deref(), Some("mock"));

    let host2 = devices.iter().find(|d| d.ip == "192.168.1.2").unwrap();
    assert!(host2.open_ports.is_empty());
}

#[tokio::test]
async fn test_scenario_c_immediate_stop() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"])
            .with_delay(Duration::from_millis(50)),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("10.0.0.0/28".to_string()).with_timeout(100);
    coordinator.start_scan(config).unwrap();
    coordinator.stop_scan();

    let collected = run_to_completion(&mut events).await;

    let completed_count = collected
        .iter()
        .filter(|e| matches!(e, ScanEvent::Completed { .. }))
        .count();
    assert_eq!(completed_count, 1);

    // Hosts never started produce nothing; only in-flight work may report
    let progress_count = collected
        .iter()
        .filter(|e| matches!(e, ScanEvent::Progress { .. }))
        .count();
    assert!(progress_count < 14);

    assert!(!coordinator.is_scanning());
    assert!(events.try_recv().is_err(), "no events after Completed");
}

#[tokio::test]
async fn test_start_while_scanning_rejected() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"])
            .with_delay(Duration::from_millis(50)),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string()).with_timeout(100);
    coordinator.start_scan(config.clone()).unwrap();
    assert!(coordinator.is_scanning());

    let second = coordinator.start_scan(config);
    assert!(matches!(second, Err(netsweep::ScanError::AlreadyScanning)));

    // The running scan is untouched and completes with the full count
    let collected = run_to_completion(&mut events).await;
    assert_eq!(
        collected.first(),
        Some(&ScanEvent::Started { total_hosts: 2 })
    );
    match collected.last() {
        Some(ScanEvent::Completed { devices_found, .. }) => assert_eq!(*devices_found, 2),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pause_resume_reaches_same_count() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"])
            .with_delay(Duration::from_millis(20)),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string())
        .with_timeout(100)
        .with_max_threads(1);
    coordinator.start_scan(config).unwrap();

    coordinator.pause_scan();
    assert!(coordinator.is_paused());
    tokio::time::sleep(Duration::from_millis(100)).await;
    coordinator.resume_scan();
    assert!(!coordinator.is_paused());

    let collected = run_to_completion(&mut events).await;

    assert!(collected.contains(&ScanEvent::Paused));
    assert!(collected.contains(&ScanEvent::Resumed));
    match collected.last() {
        Some(ScanEvent::Completed { devices_found, .. }) => assert_eq!(*devices_found, 2),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pause_resume_noops_when_idle() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&[]),
        MockPortProber::new(&[]),
    );

    coordinator.pause_scan();
    coordinator.resume_scan();
    coordinator.stop_scan();

    assert!(!coordinator.is_scanning());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_progress_monotonic_and_bounded() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["10.1.1.1", "10.1.1.3", "10.1.1.5"]),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("10.1.1.0/29".to_string()).with_timeout(100);
    coordinator.start_scan(config).unwrap();

    let collected = run_to_completion(&mut events).await;
    assert_eq!(
        collected.first(),
        Some(&ScanEvent::Started { total_hosts: 6 })
    );

    let mut last = 0;
    for scan_event in &collected {
        if let ScanEvent::Progress { current, total, .. } = scan_event {
            assert_eq!(*total, 6);
            assert!(*current > last, "progress must be strictly increasing");
            assert!(*current <= *total);
            last = *current;
        }
    }
    assert_eq!(last, 6);
}

#[tokio::test]
async fn test_per_host_failure_absorbed() {
    // Only one of the two usable hosts answers; the other still counts
    // toward progress but yields no terminal event
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1"]),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string()).with_timeout(100);
    coordinator.start_scan(config).unwrap();

    let collected = run_to_completion(&mut events).await;

    let progress_count = collected
        .iter()
        .filter(|e| matches!(e, ScanEvent::Progress { .. }))
        .count();
    assert_eq!(progress_count, 2);

    assert_eq!(discovered_devices(&collected).len(), 1);
    match collected.last() {
        Some(ScanEvent::Completed { devices_found, .. }) => assert_eq!(*devices_found, 1),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_subnet_stays_idle() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&[]),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("not-a-subnet".to_string());
    let result = coordinator.start_scan(config);

    assert!(matches!(result, Err(netsweep::ScanError::InvalidSubnet(_))));
    assert!(!coordinator.is_scanning());

    match events.try_recv() {
        Ok(ScanEvent::Error { .. }) => {}
        other => panic!("expected Error event, got {:?}", other),
    }
    assert!(events.try_recv().is_err(), "no events beyond the error");
}

#[tokio::test]
async fn test_faulty_port_prober_degrades_gracefully() {
    // A prober that drops its sink without a completion signal must not
    // stall the queue; the host is finalized with what accumulated
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"]),
        FaultyPortProber,
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string())
        .with_port_scan(true)
        .with_timeout(100);
    coordinator.start_scan(config).unwrap();

    let collected = run_to_completion(&mut events).await;
    let devices = discovered_devices(&collected);
    assert_eq!(devices.len(), 2);
    assert!(devices
        .iter()
        .all(|d| d.open_ports.iter().all(|p| p.port == 8080)));
}

#[tokio::test]
async fn test_coordinator_reusable_across_scans() {
    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"]),
        MockPortProber::new(&[]),
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string()).with_timeout(100);

    for _ in 0..2 {
        coordinator.start_scan(config.clone()).unwrap();
        let collected = run_to_completion(&mut events).await;
        assert_eq!(
            collected.first(),
            Some(&ScanEvent::Started { total_hosts: 2 })
        );
        match collected.last() {
            Some(ScanEvent::Completed { devices_found, .. }) => assert_eq!(*devices_found, 2),
            other => panic!("expected Completed, got {:?}", other),
        }
        assert!(!coordinator.is_scanning());
    }
}

#[tokio::test]
async fn test_stop_during_port_phase_finishes_active_host() {
    // Slow port prober so the stop lands while the queue is busy
    struct SlowPortProber;

    #[async_trait]
    impl PortProber for SlowPortProber {
        async fn scan_ports(
            &self,
            _ip: Ipv4Addr,
            _ports: Vec<u16>,
            _timeout: Duration,
            sink: PortProbeSink,
        ) {
            tokio::time::sleep(Duration::from_millis(80)).await;
            let _ = sink.send(PortProbeUpdate::PortFound {
                port: 22,
                service: None,
            });
            let _ = sink.send(PortProbeUpdate::Completed);
        }
    }

    let (coordinator, mut events) = coordinator_with(
        MockHostProber::online(&["192.168.1.1", "192.168.1.2"]),
        SlowPortProber,
    );

    let config = ScanConfig::new("192.168.1.0/30".to_string())
        .with_port_scan(true)
        .with_timeout(100);
    coordinator.start_scan(config).unwrap();

    // Let discovery finish and the first port scan begin
    tokio::time::sleep(Duration::from_millis(40)).await;
    coordinator.stop_scan();

    let collected = run_to_completion(&mut events).await;

    // The active host drains to its terminal event; queued hosts are
    // released without emitting
    let devices = discovered_devices(&collected);
    assert!(devices.len() <= 2);
    let completed_count = collected
        .iter()
        .filter(|e| matches!(e, ScanEvent::Completed { .. }))
        .count();
    assert_eq!(completed_count, 1);
    assert!(!coordinator.is_scanning());
}
