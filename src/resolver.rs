//! Host address resolution
//!
//! The frontier only admits a host to the ready scheduler once its address
//! is known. Resolution itself is delegated to a [`DnsResolver`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use crate::frontier::authority::Authority;
use crate::utils::error::ResolveError;

/// Resolves an authority to the address its fetches will use
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, authority: &Authority) -> Result<IpAddr, ResolveError>;
}

/// Strip IPv6 brackets and return the address if the host is a literal
fn literal_address(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()
}

/// Resolver backed by the operating system (`getaddrinfo`)
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, authority: &Authority) -> Result<IpAddr, ResolveError> {
        let host = authority.host();
        if let Some(ip) = literal_address(host) {
            return Ok(ip);
        }

        let lookup = tokio::net::lookup_host((host, authority.port()));
        let mut addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| ResolveError::Timeout {
                host: host.to_string(),
            })?
            .map_err(|e| ResolveError::LookupFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| ResolveError::NoAddress {
                host: host.to_string(),
            })
    }
}

/// Resolver with a fixed host table, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
    fallback: Option<IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `host` to `ip`
    pub fn with_host(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.hosts.insert(host.into().to_ascii_lowercase(), ip);
        self
    }

    /// Address returned for hosts missing from the table
    pub fn with_fallback(mut self, ip: IpAddr) -> Self {
        self.fallback = Some(ip);
        self
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn resolve(&self, authority: &Authority) -> Result<IpAddr, ResolveError> {
        let host = authority.host();
        self.hosts
            .get(host)
            .copied()
            .or_else(|| literal_address(host))
            .or(self.fallback)
            .ok_or_else(|| ResolveError::NoAddress {
                host: host.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[tokio::test]
    async fn test_static_resolver_table_and_fallback() {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let resolver = StaticResolver::new().with_host("a.com", ip);

        let a = Authority::parse("http://a.com").unwrap();
        assert_eq!(resolver.resolve(&a).await.unwrap(), ip);

        let b = Authority::parse("http://b.com").unwrap();
        assert!(matches!(
            resolver.resolve(&b).await,
            Err(ResolveError::NoAddress { .. })
        ));

        let resolver = resolver.with_fallback(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(
            resolver.resolve(&b).await.unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[tokio::test]
    async fn test_system_resolver_literals() {
        let resolver = SystemResolver::default();

        let v4 = Authority::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(
            resolver.resolve(&v4).await.unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );

        let v6 = Authority::parse("http://[::1]/").unwrap();
        assert_eq!(
            resolver.resolve(&v6).await.unwrap(),
            IpAddr::V6(Ipv6Addr::LOCALHOST)
        );
    }
}
