//! Configuration module for netsweep scans

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration for one scan; immutable once a scan starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Target subnet in CIDR notation (a bare IPv4 address is also accepted)
    pub subnet: String,

    /// Resolve hostnames over DNS during discovery
    pub resolve_dns: bool,

    /// Resolve MAC addresses over ARP during discovery
    pub resolve_arp: bool,

    /// Run the secondary port-scan phase for discovered hosts
    pub scan_ports: bool,

    /// Ports probed during the port-scan phase; empty means the port
    /// prober's default set
    pub ports_to_scan: Vec<u16>,

    /// Timeout per probe in milliseconds
    pub timeout: u64,

    /// Number of concurrent discovery workers; 0 picks the available
    /// parallelism
    pub max_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            subnet: String::new(),
            resolve_dns: true,
            resolve_arp: true,
            scan_ports: false,
            ports_to_scan: Vec::new(),
            timeout: 3000,
            max_threads: 0,
        }
    }
}

impl ScanConfig {
    /// Create a new scan configuration for the given subnet
    pub fn new(subnet: String) -> Self {
        Self {
            subnet,
            ..Default::default()
        }
    }

    /// Enable or disable DNS resolution
    pub fn with_dns(mut self, resolve_dns: bool) -> Self {
        self.resolve_dns = resolve_dns;
        self
    }

    /// Enable or disable ARP resolution
    pub fn with_arp(mut self, resolve_arp: bool) -> Self {
        self.resolve_arp = resolve_arp;
        self
    }

    /// Enable or disable the port-scan phase
    pub fn with_port_scan(mut self, scan_ports: bool) -> Self {
        self.scan_ports = scan_ports;
        self
    }

    /// Set the ports to probe during the port-scan phase
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports_to_scan = ports;
        self
    }

    /// Set the per-probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the discovery worker count
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Get the probe timeout as a Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Worker count actually used: `max_threads`, or the machine's logical
    /// CPU count when 0
    pub fn effective_threads(&self) -> usize {
        if self.max_threads == 0 {
            num_cpus::get()
        } else {
            self.max_threads
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.subnet.trim().is_empty() {
            return Err(crate::ScanError::ConfigError(
                "Subnet cannot be empty".to_string(),
            ));
        }

        if self.timeout == 0 {
            return Err(crate::ScanError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            crate::ScanError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| crate::ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the default location (~/.netsweep.toml),
    /// falling back to defaults when no file exists
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".netsweep.toml");

        if config_path.exists() {
            if let Ok(config) = Self::from_toml_file(&config_path) {
                log::info!("Loaded config from {}", config_path.display());
                return config;
            }
        }

        Self::default()
    }
}

/// Discovery capabilities derived structurally from the config flags.
///
/// There is no closed "scan type" enum here: named presets like quick or
/// deep live in the CLI layer and merely populate differing `ScanConfig`
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStrategy {
    pub resolve_dns: bool,
    pub resolve_arp: bool,
    pub scan_ports: bool,
}

impl ScanStrategy {
    /// Derive the strategy from a scan configuration
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            resolve_dns: config.resolve_dns,
            resolve_arp: config.resolve_arp,
            scan_ports: config.scan_ports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.resolve_dns);
        assert!(config.resolve_arp);
        assert!(!config.scan_ports);
        assert!(config.ports_to_scan.is_empty());
        assert_eq!(config.timeout, 3000);
        assert_eq!(config.max_threads, 0);
    }

    #[test]
    fn test_builder_chain() {
        let config = ScanConfig::new("10.0.0.0/24".to_string())
            .with_dns(false)
            .with_port_scan(true)
            .with_ports(vec![22, 80])
            .with_timeout(500)
            .with_max_threads(16);

        assert_eq!(config.subnet, "10.0.0.0/24");
        assert!(!config.resolve_dns);
        assert!(config.scan_ports);
        assert_eq!(config.ports_to_scan, vec![22, 80]);
        assert_eq!(config.timeout, 500);
        assert_eq!(config.effective_threads(), 16);
    }

    #[test]
    fn test_effective_threads_auto() {
        let config = ScanConfig::new("10.0.0.0/24".to_string());
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    fn test_validate_rejects_empty_subnet() {
        let config = ScanConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ScanConfig::new("10.0.0.0/24".to_string()).with_timeout(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_follows_flags() {
        let config = ScanConfig::new("10.0.0.0/24".to_string())
            .with_dns(false)
            .with_arp(true)
            .with_port_scan(true);
        let strategy = ScanStrategy::from_config(&config);

        assert!(!strategy.resolve_dns);
        assert!(strategy.resolve_arp);
        assert!(strategy.scan_ports);
    }
}
