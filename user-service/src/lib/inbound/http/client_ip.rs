use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::str::FromStr;

use axum::http::HeaderMap;
use thiserror::Error;

/// Forwarded-IP header set by the reverse proxy.
const REAL_IP_HEADER: &str = "x-real-ip";

/// Values proxies are known to write when they could not determine the
/// client address. Treated the same as an unparseable header.
const INVALID_HEADER_VALUES: &[&str] = &["unknown", "unavailable", "0.0.0.0", "::"];

#[derive(Debug, Error)]
pub enum ClientIpError {
    #[error("Invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("Request did not arrive through a trusted proxy")]
    UntrustedPeer,
}

/// An IPv4 or IPv6 network in CIDR notation. A bare address parses as a
/// host route (/32 or /128).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: IpAddr,
    prefix: u8,
}

impl FromStr for CidrBlock {
    type Err = ClientIpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClientIpError::InvalidCidr(s.to_string());

        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
                (addr, prefix)
            }
            None => {
                let addr: IpAddr = s.parse().map_err(|_| invalid())?;
                let prefix = match addr {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                (addr, prefix)
            }
        };

        let max_prefix = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max_prefix {
            return Err(invalid());
        }

        Ok(Self {
            network: addr,
            prefix,
        })
    }
}

impl CidrBlock {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(ip)) => {
                Self::prefix_matches_v4(network, ip, self.prefix)
            }
            (IpAddr::V6(network), IpAddr::V6(ip)) => {
                Self::prefix_matches_v6(network, ip, self.prefix)
            }
            // Mixed families never match
            _ => false,
        }
    }

    fn prefix_matches_v4(network: Ipv4Addr, ip: Ipv4Addr, prefix: u8) -> bool {
        if prefix == 0 {
            return true;
        }
        let shift = 32 - u32::from(prefix);
        (u32::from(network) >> shift) == (u32::from(ip) >> shift)
    }

    fn prefix_matches_v6(network: Ipv6Addr, ip: Ipv6Addr, prefix: u8) -> bool {
        if prefix == 0 {
            return true;
        }
        let shift = 128 - u32::from(prefix);
        (u128::from(network) >> shift) == (u128::from(ip) >> shift)
    }
}

/// Resolves the real client address behind an optional reverse proxy.
///
/// The `X-Real-IP` header is only believed when the immediate peer falls
/// inside a configured trusted-proxy network; anyone can send the header,
/// so honoring it from arbitrary peers would let clients spoof their way
/// past per-IP limits.
pub struct IpResolver {
    trusted_proxies: Vec<CidrBlock>,
    require_proxy: bool,
}

impl IpResolver {
    pub fn new(trusted_proxies: &[String], require_proxy: bool) -> Result<Self, ClientIpError> {
        let trusted_proxies = trusted_proxies
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trusted_proxies,
            require_proxy,
        })
    }

    pub fn resolve(&self, peer: IpAddr, headers: &HeaderMap) -> Result<IpAddr, ClientIpError> {
        let peer_is_trusted = self.trusted_proxies.iter().any(|cidr| cidr.contains(peer));

        if peer_is_trusted {
            if let Some(forwarded) = Self::forwarded_ip(headers) {
                return Ok(forwarded);
            }
            // Trusted proxy without a usable header: fall back to the peer
            return Ok(peer);
        }

        if self.require_proxy {
            tracing::warn!(%peer, "Rejecting direct connection, proxy required");
            return Err(ClientIpError::UntrustedPeer);
        }

        Ok(peer)
    }

    fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
        let value = headers.get(REAL_IP_HEADER)?.to_str().ok()?.trim();

        if INVALID_HEADER_VALUES.contains(&value.to_ascii_lowercase().as_str()) {
            return None;
        }

        match value.parse::<IpAddr>() {
            Ok(ip) if !ip.is_unspecified() => Some(ip),
            _ => {
                tracing::debug!(value, "Ignoring unusable X-Real-IP header");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with_real_ip(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_cidr_parses_bare_address_as_host_route() {
        let cidr: CidrBlock = "10.0.0.5".parse().unwrap();
        assert!(cidr.contains("10.0.0.5".parse().unwrap()));
        assert!(!cidr.contains("10.0.0.6".parse().unwrap()));
    }

    #[test]
    fn test_cidr_v4_prefix_matching() {
        let cidr: CidrBlock = "10.0.0.0/8".parse().unwrap();
        assert!(cidr.contains("10.255.1.2".parse().unwrap()));
        assert!(!cidr.contains("11.0.0.1".parse().unwrap()));
        assert!(!cidr.contains("::1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_v6_prefix_matching() {
        let cidr: CidrBlock = "fd00::/8".parse().unwrap();
        assert!(cidr.contains("fd12:3456::1".parse().unwrap()));
        assert!(!cidr.contains("fe80::1".parse().unwrap()));
    }

    #[test]
    fn test_cidr_rejects_garbage() {
        assert!("not-a-cidr".parse::<CidrBlock>().is_err());
        assert!("10.0.0.0/33".parse::<CidrBlock>().is_err());
        assert!("::/129".parse::<CidrBlock>().is_err());
    }

    #[test]
    fn test_trusted_proxy_header_is_honored() {
        let resolver = IpResolver::new(&["10.0.0.0/8".to_string()], false).unwrap();
        let headers = headers_with_real_ip("203.0.113.9");

        let resolved = resolver.resolve("10.1.2.3".parse().unwrap(), &headers);
        assert_eq!(resolved.unwrap(), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_untrusted_peer_header_is_ignored() {
        let resolver = IpResolver::new(&["10.0.0.0/8".to_string()], false).unwrap();
        let headers = headers_with_real_ip("203.0.113.9");

        let resolved = resolver.resolve("198.51.100.4".parse().unwrap(), &headers);
        assert_eq!(resolved.unwrap(), "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_garbage_header_values_fall_back_to_peer() {
        let resolver = IpResolver::new(&["10.0.0.0/8".to_string()], false).unwrap();
        let peer: IpAddr = "10.1.2.3".parse().unwrap();

        for value in ["unknown", "Unavailable", "0.0.0.0", "::", "not-an-ip"] {
            let resolved = resolver.resolve(peer, &headers_with_real_ip(value));
            assert_eq!(resolved.unwrap(), peer, "value: {value}");
        }
    }

    #[test]
    fn test_missing_header_falls_back_to_peer() {
        let resolver = IpResolver::new(&["10.0.0.0/8".to_string()], false).unwrap();
        let peer: IpAddr = "10.1.2.3".parse().unwrap();

        assert_eq!(resolver.resolve(peer, &HeaderMap::new()).unwrap(), peer);
    }

    #[test]
    fn test_require_proxy_rejects_direct_connections() {
        let resolver = IpResolver::new(&["10.0.0.0/8".to_string()], true).unwrap();

        let direct = resolver.resolve("198.51.100.4".parse().unwrap(), &HeaderMap::new());
        assert!(matches!(direct, Err(ClientIpError::UntrustedPeer)));

        let proxied = resolver.resolve("10.1.2.3".parse().unwrap(), &HeaderMap::new());
        assert!(proxied.is_ok());
    }
}
