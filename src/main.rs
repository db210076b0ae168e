use clap::{Arg, ArgAction, Command};
use colored::*;
use std::process;
use std::sync::Arc;

use netsweep::{
    config::ScanConfig,
    coordinator::ScanCoordinator,
    event::ScanEvent,
    metrics::ScanMetrics,
    probe::{PingHostProber, TcpConnectPortProber},
};

fn print_banner() {
    println!(
        "{}",
        " _   _      _   ____                           ".bright_blue().bold()
    );
    println!(
        "{}",
        "| \\ | | ___| |_/ ___|_      _____  ___ _ __    ".bright_blue().bold()
    );
    println!(
        "{}",
        "|  \\| |/ _ \\ __\\___ \\ \\ /\\ / / _ \\/ _ \\ '_ \\   ".bright_blue().bold()
    );
    println!(
        "{}",
        "| |\\  |  __/ |_ ___) \\ V  V /  __/  __/ |_) |  ".bright_blue().bold()
    );
    println!(
        "{}",
        "|_| \\_|\\___|\\__|____/ \\_/\\_/ \\___|\\___| .__/   ".bright_blue().bold()
    );
    println!(
        "{}",
        "                                      |_|      ".bright_blue().bold()
    );
    println!();
}

/// Quick preset: liveness only, short timeouts, no port scan
fn quick_preset(subnet: String) -> ScanConfig {
    ScanConfig::new(subnet)
        .with_dns(false)
        .with_arp(true)
        .with_port_scan(false)
        .with_timeout(1000)
}

/// Deep preset: full resolution plus the default port set
fn deep_preset(subnet: String) -> ScanConfig {
    ScanConfig::new(subnet)
        .with_dns(true)
        .with_arp(true)
        .with_port_scan(true)
        .with_timeout(5000)
}

fn parse_port_list(spec: &str) -> anyhow::Result<Vec<u16>> {
    spec.split(',')
        .map(|p| {
            p.trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("invalid port: {}", p))
        })
        .collect()
}

fn build_config(matches: &clap::ArgMatches) -> anyhow::Result<ScanConfig> {
    let subnet = matches
        .get_one::<String>("subnet")
        .cloned()
        .unwrap_or_default();

    let mut config = if let Some(path) = matches.get_one::<String>("config") {
        let mut file_config = ScanConfig::from_toml_file(path)?;
        if !subnet.is_empty() {
            file_config.subnet = subnet;
        }
        file_config
    } else if matches.get_flag("quick") {
        quick_preset(subnet)
    } else if matches.get_flag("deep") {
        deep_preset(subnet)
    } else {
        let mut defaults = ScanConfig::load_default_config();
        defaults.subnet = subnet;
        defaults
    };

    if let Some(ports) = matches.get_one::<String>("ports") {
        config = config
            .with_port_scan(true)
            .with_ports(parse_port_list(ports)?);
    }
    if matches.get_flag("scan-ports") {
        config = config.with_port_scan(true);
    }
    if matches.get_flag("no-dns") {
        config = config.with_dns(false);
    }
    if matches.get_flag("no-arp") {
        config = config.with_arp(false);
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config = config.with_timeout(*timeout);
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config = config.with_max_threads(*threads);
    }

    Ok(config)
}

fn format_device(device: &netsweep::Device) -> String {
    let mut line = format!("{}", device.ip.bright_green().bold());

    if let Some(hostname) = &device.hostname {
        line.push_str(&format!(" ({})", hostname.bright_cyan()));
    }
    if let Some(mac) = &device.mac {
        line.push_str(&format!(" [{}]", mac));
    }
    if let Some(vendor) = &device.vendor {
        line.push_str(&format!(" {}", vendor.bright_black()));
    }
    if !device.open_ports.is_empty() {
        let ports: Vec<String> = device
            .open_ports
            .iter()
            .map(|p| match &p.service {
                Some(service) => format!("{}/{} ({})", p.port, p.protocol, service),
                None => format!("{}/{}", p.port, p.protocol),
            })
            .collect();
        line.push_str(&format!("\n    open: {}", ports.join(", ").yellow()));
    }

    line
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("netsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Concurrent LAN discovery and port-scan orchestration")
        .arg(
            Arg::new("subnet")
                .help("Target subnet in CIDR notation, e.g. 192.168.1.0/24")
                .required_unless_present("config")
                .index(1),
        )
        .arg(
            Arg::new("ports")
                .long("ports")
                .short('p')
                .help("Comma-separated ports for the port-scan phase (implies --scan-ports)"),
        )
        .arg(
            Arg::new("scan-ports")
                .long("scan-ports")
                .action(ArgAction::SetTrue)
                .help("Probe discovered hosts for open ports (default port set)"),
        )
        .arg(
            Arg::new("no-dns")
                .long("no-dns")
                .action(ArgAction::SetTrue)
                .help("Skip hostname resolution"),
        )
        .arg(
            Arg::new("no-arp")
                .long("no-arp")
                .action(ArgAction::SetTrue)
                .help("Skip MAC address resolution"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u64))
                .help("Per-probe timeout in milliseconds [default: 3000]"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('T')
                .value_parser(clap::value_parser!(usize))
                .help("Discovery worker count; 0 picks the CPU count [default: 0]"),
        )
        .arg(
            Arg::new("quick")
                .long("quick")
                .action(ArgAction::SetTrue)
                .conflicts_with("deep")
                .help("Quick preset: liveness only, 1s timeout"),
        )
        .arg(
            Arg::new("deep")
                .long("deep")
                .action(ArgAction::SetTrue)
                .help("Deep preset: DNS + ARP + default port set, 5s timeout"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Load scan configuration from a TOML file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit discovered devices as JSON lines instead of text"),
        )
        .get_matches();

    let json_output = matches.get_flag("json");
    if !json_output {
        print_banner();
    }

    let config = build_config(&matches)?;

    let metrics = Arc::new(ScanMetrics::new());
    let (coordinator, mut events) = ScanCoordinator::new(
        Arc::new(PingHostProber::new()),
        Arc::new(TcpConnectPortProber::new()),
        metrics.clone(),
    );
    let coordinator = Arc::new(coordinator);

    // Ctrl-C requests a cooperative stop; in-flight probes drain
    let stopper = coordinator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "[!] Stop requested, draining...".bright_yellow());
            stopper.stop_scan();
        }
    });

    let mut scan_timer = Some(metrics.start_timer("scan"));
    if let Err(e) = coordinator.start_scan(config) {
        eprintln!("{} {}", "[!]".bright_red(), e);
        process::exit(1);
    }

    let mut devices = Vec::new();
    while let Some(scan_event) = events.recv().await {
        match scan_event {
            ScanEvent::Started { total_hosts } => {
                if !json_output {
                    println!(
                        "{} Scanning {} hosts...",
                        "[~]".bright_blue(),
                        total_hosts.to_string().bright_cyan()
                    );
                }
            }
            ScanEvent::Progress { current, total, ip } => {
                log::debug!("progress {}/{} ({})", current, total, ip);
            }
            ScanEvent::DeviceDiscovered(device) => {
                if json_output {
                    println!("{}", serde_json::to_string(&device)?);
                } else {
                    println!("{} {}", "[+]".bright_green(), format_device(&device));
                }
                devices.push(device);
            }
            ScanEvent::Paused => {
                println!("{}", "[~] Scan paused".bright_yellow());
            }
            ScanEvent::Resumed => {
                println!("{}", "[~] Scan resumed".bright_yellow());
            }
            ScanEvent::Error { message } => {
                eprintln!("{} {}", "[!]".bright_red(), message);
            }
            ScanEvent::Completed {
                devices_found,
                duration,
            } => {
                if let Some(timer) = scan_timer.take() {
                    metrics.record(timer);
                }
                metrics.incr("scans_completed", 1);

                if !json_output {
                    println!();
                    println!(
                        "{} {} devices found in {:.2}s ({})",
                        "[✓]".bright_green().bold(),
                        devices_found.to_string().bright_cyan().bold(),
                        duration.as_secs_f64(),
                        chrono::Local::now().format("%H:%M:%S")
                    );
                }
                break;
            }
        }
    }

    Ok(())
}
