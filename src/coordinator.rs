//! Scan lifecycle coordination
//!
//! The coordinator turns one subnet scan request into a bounded fan-out of
//! host discovery probes, a host-serialized port-scan phase, and an ordered
//! event stream. It is long-lived and reusable: all per-scan state is reset
//! at `start_scan` and cleared once the scan drains.
//!
//! Concurrency model: discovery tasks run in parallel behind a semaphore;
//! port probing runs for one host at a time even though a single host's port
//! fan-out may be internally parallel inside the prober. Stop and pause are
//! cooperative flags checked between work pickups; in-flight probes always
//! drain to completion.

use crate::config::{ScanConfig, ScanStrategy};
use crate::device::{Device, OpenPort, Protocol};
use crate::event::{self, EventReceiver, EventSender, ScanEvent};
use crate::metrics::ScanMetrics;
use crate::probe::{HostProber, PortProbeUpdate, PortProber, ProbeError};
use crate::utils::expand_subnet;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};

/// How often the dispatcher re-checks the pause flag between pickups
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Per-scan mutable state behind one coarse mutex. Critical sections are
/// O(1) map and queue operations, never I/O.
#[derive(Default)]
struct ScanShared {
    /// Devices that discovered successfully and await port-scan results.
    /// Invariant: every IP in `port_queue` has an entry here.
    pending_devices: HashMap<Ipv4Addr, Device>,

    /// Accumulated open ports per host, merged at port-scan completion
    port_results: HashMap<Ipv4Addr, Vec<OpenPort>>,

    /// FIFO of hosts awaiting the port-scan phase
    port_queue: VecDeque<Ipv4Addr>,

    /// The single host whose ports are being probed right now
    current_host: Option<Ipv4Addr>,

    /// Config for the running scan; set once at start, cleared at drain
    config: Option<ScanConfig>,

    started_at: Option<Instant>,
}

struct Inner {
    host_prober: Arc<dyn HostProber>,
    port_prober: Arc<dyn PortProber>,
    metrics: Arc<ScanMetrics>,
    events: EventSender,

    scanning: AtomicBool,
    paused: AtomicBool,
    stop_requested: AtomicBool,
    dispatch_done: AtomicBool,

    current_progress: AtomicUsize,
    total_progress: AtomicUsize,
    devices_found: AtomicUsize,

    /// Hosts whose pipeline (discovery, and port scan if requested) has not
    /// reached its terminal point yet
    inflight: AtomicUsize,

    shared: Mutex<ScanShared>,
}

/// Owns scan lifecycle, dispatch, and event emission
pub struct ScanCoordinator {
    inner: Arc<Inner>,
}

impl ScanCoordinator {
    /// Create a coordinator wired to its collaborators. Returns the
    /// coordinator and the receiver the controller layer consumes events
    /// from; events for every scan run on this coordinator flow through it.
    pub fn new(
        host_prober: Arc<dyn HostProber>,
        port_prober: Arc<dyn PortProber>,
        metrics: Arc<ScanMetrics>,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = event::channel();

        let inner = Arc::new(Inner {
            host_prober,
            port_prober,
            metrics,
            events,
            scanning: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            dispatch_done: AtomicBool::new(false),
            current_progress: AtomicUsize::new(0),
            total_progress: AtomicUsize::new(0),
            devices_found: AtomicUsize::new(0),
            inflight: AtomicUsize::new(0),
            shared: Mutex::new(ScanShared::default()),
        });

        (Self { inner }, receiver)
    }

    /// Start a scan. Rejected while another scan is running; a subnet that
    /// fails to parse emits `ScanEvent::Error` and leaves the coordinator
    /// idle. Must be called from within a tokio runtime.
    pub fn start_scan(&self, config: ScanConfig) -> crate::Result<()> {
        let inner = &self.inner;

        if inner.scanning.load(Ordering::SeqCst) {
            log::warn!("start_scan rejected: a scan is already running");
            return Err(crate::ScanError::AlreadyScanning);
        }

        let hosts = match config.validate().and_then(|_| expand_subnet(&config.subnet)) {
            Ok(hosts) => hosts,
            Err(e) => {
                inner.emit(ScanEvent::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        if inner
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(crate::ScanError::AlreadyScanning);
        }

        // Reset all per-scan state before the first event of this generation
        inner.paused.store(false, Ordering::SeqCst);
        inner.stop_requested.store(false, Ordering::SeqCst);
        inner.dispatch_done.store(false, Ordering::SeqCst);
        inner.current_progress.store(0, Ordering::SeqCst);
        inner.total_progress.store(hosts.len(), Ordering::SeqCst);
        inner.devices_found.store(0, Ordering::SeqCst);
        inner.inflight.store(0, Ordering::SeqCst);

        {
            let mut shared = inner.shared.lock().unwrap();
            shared.pending_devices.clear();
            shared.port_results.clear();
            shared.port_queue.clear();
            shared.current_host = None;
            shared.config = Some(config.clone());
            shared.started_at = Some(Instant::now());
        }

        log::info!(
            "Scan started: {} usable hosts in {}",
            hosts.len(),
            config.subnet
        );
        inner.emit(ScanEvent::Started {
            total_hosts: hosts.len(),
        });

        let strategy = ScanStrategy::from_config(&config);
        let probe_timeout = config.timeout_duration();
        let threads = config.effective_threads();
        let dispatcher = inner.clone();

        tokio::spawn(async move {
            Inner::dispatch_hosts(&dispatcher, hosts, strategy, probe_timeout, threads).await;
        });

        Ok(())
    }

    /// Request a cooperative stop: no new host work is picked up, in-flight
    /// probes drain, then the scan completes. No-op when idle.
    pub fn stop_scan(&self) {
        let inner = &self.inner;

        if !inner.scanning.load(Ordering::SeqCst) {
            log::debug!("stop_scan ignored: no scan running");
            return;
        }

        if inner.stop_requested.swap(true, Ordering::SeqCst) {
            log::debug!("stop_scan ignored: stop already requested");
            return;
        }

        log::info!("Scan stop requested, draining in-flight work");
        // Queued port-scan hosts are released here unless a host is active,
        // in which case its completion handler performs the drain.
        Inner::process_next_port_scan(inner);
    }

    /// Pause pickup of new host work; probes already in flight continue to
    /// completion. No-op when idle or already paused.
    pub fn pause_scan(&self) {
        let inner = &self.inner;

        if !inner.scanning.load(Ordering::SeqCst) {
            log::debug!("pause_scan ignored: no scan running");
            return;
        }

        if inner.paused.swap(true, Ordering::SeqCst) {
            log::debug!("pause_scan ignored: already paused");
            return;
        }

        log::info!("Scan paused");
        inner.emit(ScanEvent::Paused);
    }

    /// Resume a paused scan. No-op when idle or not paused.
    pub fn resume_scan(&self) {
        let inner = &self.inner;

        if !inner.scanning.load(Ordering::SeqCst) {
            log::debug!("resume_scan ignored: no scan running");
            return;
        }

        if !inner.paused.swap(false, Ordering::SeqCst) {
            log::debug!("resume_scan ignored: not paused");
            return;
        }

        log::info!("Scan resumed");
        inner.emit(ScanEvent::Resumed);
        // The port queue stalls while paused; kick it back into motion
        Inner::process_next_port_scan(inner);
    }

    /// Whether a scan is currently running; lock-free, callable anywhere
    pub fn is_scanning(&self) -> bool {
        self.inner.scanning.load(Ordering::SeqCst)
    }

    /// Whether the running scan is paused; lock-free, callable anywhere
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Progress counters for the running scan as `(current, total)`
    pub fn progress(&self) -> (usize, usize) {
        (
            self.inner.current_progress.load(Ordering::SeqCst),
            self.inner.total_progress.load(Ordering::SeqCst),
        )
    }

    /// Metrics aggregator this coordinator was constructed with
    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.inner.metrics
    }
}

impl Inner {
    fn emit(&self, scan_event: ScanEvent) {
        if self.events.send(scan_event).is_err() {
            log::debug!("event receiver dropped, discarding event");
        }
    }

    /// Dispatch one discovery task per host through the worker semaphore,
    /// honoring pause between pickups and stop before every enqueue.
    async fn dispatch_hosts(
        inner: &Arc<Inner>,
        hosts: Vec<Ipv4Addr>,
        strategy: ScanStrategy,
        probe_timeout: Duration,
        threads: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(threads.max(1)));
        let mut handles = Vec::new();

        for ip in hosts {
            while inner.paused.load(Ordering::SeqCst) && !inner.stop_requested.load(Ordering::SeqCst)
            {
                tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
            }

            if inner.stop_requested.load(Ordering::SeqCst) {
                log::debug!("Dispatch halted by stop request before {}", ip);
                break;
            }

            let permit = semaphore.clone().acquire_owned().await.unwrap();
            inner.inflight.fetch_add(1, Ordering::SeqCst);

            let task_inner = inner.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = task_inner
                    .host_prober
                    .probe_host(ip, strategy.resolve_dns, strategy.resolve_arp, probe_timeout)
                    .await;
                Inner::on_discovery_complete(&task_inner, ip, result);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        inner.dispatch_done.store(true, Ordering::SeqCst);
        inner.maybe_complete();
    }

    /// Runs on completion of one host's discovery probe, from any worker
    fn on_discovery_complete(inner: &Arc<Inner>, ip: Ipv4Addr, result: Result<Device, ProbeError>) {
        let current = inner.current_progress.fetch_add(1, Ordering::SeqCst) + 1;
        let total = inner.total_progress.load(Ordering::SeqCst);
        inner.emit(ScanEvent::Progress {
            current,
            total,
            ip: ip.to_string(),
        });

        match result {
            Err(e) => {
                // Per-host failures are absorbed; the host simply yields no
                // terminal event
                log::debug!("Discovery failed for {}: {}", ip, e);
                inner.inflight.fetch_sub(1, Ordering::SeqCst);
                inner.maybe_complete();
            }
            Ok(device) => {
                let scan_ports = {
                    let shared = inner.shared.lock().unwrap();
                    shared.config.as_ref().map(|c| c.scan_ports).unwrap_or(false)
                };

                if !scan_ports {
                    inner.devices_found.fetch_add(1, Ordering::SeqCst);
                    inner.emit(ScanEvent::DeviceDiscovered(device));
                    inner.inflight.fetch_sub(1, Ordering::SeqCst);
                    inner.maybe_complete();
                } else {
                    {
                        let mut shared = inner.shared.lock().unwrap();
                        shared.pending_devices.insert(ip, device);
                        shared.port_queue.push_back(ip);
                    }
                    Inner::process_next_port_scan(inner);
                }
            }
        }
    }

    /// Advance the host-serialized port-scan phase: pop the next queued host
    /// if none is active, or drain the queue without emitting once a stop
    /// has been requested.
    fn process_next_port_scan(inner: &Arc<Inner>) {
        let (ip, ports, probe_timeout) = {
            let mut shared = inner.shared.lock().unwrap();

            if shared.current_host.is_some() {
                return;
            }

            if inner.stop_requested.load(Ordering::SeqCst) {
                let mut released = 0usize;
                while let Some(queued) = shared.port_queue.pop_front() {
                    shared.pending_devices.remove(&queued);
                    shared.port_results.remove(&queued);
                    released += 1;
                }
                drop(shared);

                if released > 0 {
                    log::debug!("Released {} queued port scans after stop", released);
                    inner.inflight.fetch_sub(released, Ordering::SeqCst);
                }
                inner.maybe_complete();
                return;
            }

            if inner.paused.load(Ordering::SeqCst) {
                return;
            }

            let Some(ip) = shared.port_queue.pop_front() else {
                return;
            };
            shared.current_host = Some(ip);

            let (ports, probe_timeout) = match shared.config.as_ref() {
                Some(c) => (c.ports_to_scan.clone(), c.timeout_duration()),
                None => (Vec::new(), Duration::from_millis(3000)),
            };
            (ip, ports, probe_timeout)
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let prober = inner.port_prober.clone();
        tokio::spawn(async move {
            prober.scan_ports(ip, ports, probe_timeout, tx).await;
        });

        let consumer = inner.clone();
        tokio::spawn(async move {
            let mut completed = false;
            while let Some(update) = rx.recv().await {
                match update {
                    PortProbeUpdate::PortFound { port, service } => {
                        consumer.on_port_found(ip, port, service);
                    }
                    PortProbeUpdate::Completed => {
                        completed = true;
                        break;
                    }
                }
            }

            if !completed {
                // A prober that dropped its sink mid-probe still finalizes
                // the host with whatever accumulated
                log::debug!("Port prober for {} ended without completion signal", ip);
            }
            Inner::on_port_scan_completed(&consumer, ip);
        });
    }

    /// One open-port result for the active host; may fire many times
    fn on_port_found(&self, host: Ipv4Addr, port: u16, service: Option<String>) {
        let mut shared = self.shared.lock().unwrap();

        if !shared.pending_devices.contains_key(&host) {
            log::warn!("Port result for untracked host {}:{}", host, port);
            return;
        }

        shared.port_results.entry(host).or_default().push(OpenPort {
            port,
            protocol: Protocol::Tcp,
            service,
        });
    }

    /// Merge accumulated port results and emit the host's terminal event
    fn on_port_scan_completed(inner: &Arc<Inner>, host: Ipv4Addr) {
        let merged = {
            let mut shared = inner.shared.lock().unwrap();

            if shared.current_host == Some(host) {
                shared.current_host = None;
            }

            shared.pending_devices.remove(&host).map(|mut device| {
                device.open_ports = shared.port_results.remove(&host).unwrap_or_default();
                device
            })
        };

        match merged {
            Some(device) => {
                inner.devices_found.fetch_add(1, Ordering::SeqCst);
                inner.emit(ScanEvent::DeviceDiscovered(device));
                inner.inflight.fetch_sub(1, Ordering::SeqCst);
            }
            None => {
                log::warn!("Port scan completed for {} with no pending device", host);
            }
        }

        Inner::process_next_port_scan(inner);
        inner.maybe_complete();
    }

    /// Declare completion once dispatch has finished and every host reached
    /// its terminal point; fires the completion event exactly once per scan
    /// generation.
    fn maybe_complete(&self) {
        if !self.dispatch_done.load(Ordering::SeqCst) {
            return;
        }
        if self.inflight.load(Ordering::SeqCst) != 0 {
            return;
        }
        if self
            .scanning
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let duration = {
            let mut shared = self.shared.lock().unwrap();
            let duration = shared
                .started_at
                .map(|t| t.elapsed())
                .unwrap_or_default();

            shared.pending_devices.clear();
            shared.port_results.clear();
            shared.port_queue.clear();
            shared.current_host = None;
            shared.config = None;
            shared.started_at = None;
            duration
        };

        self.paused.store(false, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);

        let devices_found = self.devices_found.load(Ordering::SeqCst);
        log::info!(
            "Scan completed: {} devices found in {:?}",
            devices_found,
            duration
        );
        self.emit(ScanEvent::Completed {
            devices_found,
            duration,
        });
    }
}
