//! Subnet expansion helpers

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Expand a CIDR subnet into its usable host addresses.
///
/// Network and broadcast addresses are excluded for prefixes shorter than
/// /31; a /31 yields both addresses and a /32 yields one. A bare IPv4
/// address without a prefix is accepted as a single-host list.
pub fn expand_subnet(subnet: &str) -> crate::Result<Vec<Ipv4Addr>> {
    let spec = subnet.trim();

    if spec.is_empty() {
        return Err(crate::ScanError::InvalidSubnet(
            "subnet is empty".to_string(),
        ));
    }

    if !spec.contains('/') {
        let ip: Ipv4Addr = spec
            .parse()
            .map_err(|_| crate::ScanError::InvalidSubnet(format!("Invalid IP: {}", spec)))?;
        return Ok(vec![ip]);
    }

    let network: Ipv4Network = spec
        .parse()
        .map_err(|e| crate::ScanError::InvalidSubnet(format!("{}: {}", spec, e)))?;

    if network.prefix() >= 31 {
        // Point-to-point and host routes have no network/broadcast addresses
        return Ok(network.iter().collect());
    }

    let net_addr = network.network();
    let broadcast = network.broadcast();

    Ok(network
        .iter()
        .filter(|ip| *ip != net_addr && *ip != broadcast)
        .collect())
}

/// Number of usable hosts in a subnet without materializing the list
pub fn usable_host_count(subnet: &str) -> crate::Result<usize> {
    Ok(expand_subnet(subnet)?.len())
}
