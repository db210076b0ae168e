//! Default port list and service names for the port-scan phase

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Ports probed when a scan config leaves `ports_to_scan` empty
static DEFAULT_PORTS: Lazy<Vec<u16>> = Lazy::new(|| {
    vec![
        21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 161, 389, 443, 445, 465, 587, 631, 636,
        993, 995, 1433, 1521, 1723, 2049, 3128, 3306, 3389, 5060, 5432, 5900, 6379, 8000, 8080,
        8443, 8888, 9000, 9090, 9100, 27017,
    ]
});

/// Well-known TCP service names keyed by port
static TCP_SERVICES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut services = HashMap::new();
    services.insert(21, "ftp");
    services.insert(22, "ssh");
    services.insert(23, "telnet");
    services.insert(25, "smtp");
    services.insert(53, "dns");
    services.insert(80, "http");
    services.insert(110, "pop3");
    services.insert(111, "rpcbind");
    services.insert(135, "msrpc");
    services.insert(139, "netbios-ssn");
    services.insert(143, "imap");
    services.insert(161, "snmp");
    services.insert(389, "ldap");
    services.insert(443, "https");
    services.insert(445, "microsoft-ds");
    services.insert(465, "smtps");
    services.insert(587, "submission");
    services.insert(631, "ipp");
    services.insert(636, "ldaps");
    services.insert(993, "imaps");
    services.insert(995, "pop3s");
    services.insert(1433, "ms-sql-s");
    services.insert(1521, "oracle");
    services.insert(1723, "pptp");
    services.insert(2049, "nfs");
    services.insert(3128, "squid-http");
    services.insert(3306, "mysql");
    services.insert(3389, "ms-wbt-server");
    services.insert(5060, "sip");
    services.insert(5432, "postgresql");
    services.insert(5900, "vnc");
    services.insert(6379, "redis");
    services.insert(8000, "http-alt");
    services.insert(8080, "http-proxy");
    services.insert(8443, "https-alt");
    services.insert(8888, "http-alt");
    services.insert(9000, "cslistener");
    services.insert(9090, "websm");
    services.insert(9100, "jetdirect");
    services.insert(27017, "mongodb");
    services
});

/// Get the default port set for the port-scan phase
pub fn default_ports() -> Vec<u16> {
    DEFAULT_PORTS.clone()
}

/// Look up a well-known TCP service name
pub fn tcp_service_name(port: u16) -> Option<&'static str> {
    TCP_SERVICES.get(&port).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports_sorted_and_unique() {
        let ports = default_ports();
        assert!(!ports.is_empty());
        let mut sorted = ports.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ports, sorted);
    }

    #[test]
    fn test_service_lookup() {
        assert_eq!(tcp_service_name(22), Some("ssh"));
        assert_eq!(tcp_service_name(80), Some("http"));
        assert_eq!(tcp_service_name(60000), None);
    }
}
