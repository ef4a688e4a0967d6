//! Local/dev passthrough classification.
//!
//! Requests targeting the developer's own machine bypass the cache entirely
//! so local iteration never pollutes it. Loopback IPs always bypass;
//! additional host names and CIDR blocks come from configuration.

use ipnet::IpNet;
use std::net::IpAddr;
use url::Host;

/// Predicate over request targets that must bypass the cache.
#[derive(Debug, Clone, Default)]
pub struct Passthrough {
    hosts: Vec<String>,
    networks: Vec<IpNet>,
}

impl Passthrough {
    /// Build from configured entries: each is a host name ("localhost"),
    /// a single IP ("::1"), or a CIDR block ("192.168.0.0/16").
    pub fn new(entries: &[String]) -> Self {
        let mut hosts = Vec::new();
        let mut networks = Vec::new();
        for entry in entries {
            if let Ok(net) = entry.parse::<IpNet>() {
                networks.push(net);
            } else if let Ok(ip) = entry.parse::<IpAddr>() {
                networks.push(IpNet::from(ip));
            } else {
                hosts.push(entry.to_ascii_lowercase());
            }
        }
        Self { hosts, networks }
    }

    /// Whether the URL targets a local/dev origin.
    pub fn matches(&self, url: &url::Url) -> bool {
        match url.host() {
            Some(Host::Domain(domain)) => {
                let domain = domain.to_ascii_lowercase();
                self.hosts.iter().any(|h| *h == domain)
            }
            Some(Host::Ipv4(ip)) => self.matches_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => self.matches_ip(IpAddr::V6(ip)),
            None => false,
        }
    }

    fn matches_ip(&self, ip: IpAddr) -> bool {
        ip.is_loopback() || self.networks.iter().any(|net| net.contains(&ip))
    }
}
