//! Host resolution and address classification.
//!
//! Two resolvers live here:
//!
//! * [`HostResolver`] / [`SystemResolver`]: used by the validator to look a
//!   host up *before* any request is made. The trait is the injection seam
//!   tests use to simulate DNS answers.
//! * [`GuardedResolver`]: installed into the reqwest client so the addresses
//!   handed to the connector are filtered again at connect time. A host that
//!   answered with a public address during validation and a private one a
//!   moment later (DNS rebinding) is refused here.

use async_trait::async_trait;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::{debug, warn};

/// Resolves a host name to the set of addresses a connection could use.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }
}

/// True if `ip` must never be fetched.
///
/// Covers private, loopback, link-local, multicast, unspecified, broadcast
/// and shared (CGNAT) IPv4 ranges, plus `0.0.0.0/8`; for IPv6 the loopback,
/// unspecified, unique-local, link-local, site-local and multicast ranges,
/// and any IPv6 address embedding an IPv4 address that is blocked.
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || a == 0
        // 100.64.0.0/10 shared address space
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = embedded_ipv4(ip) {
        return is_blocked_ipv4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
        // fec0::/10 site-local (deprecated, still routed internally)
        || (first & 0xffc0) == 0xfec0
}

/// The IPv4 address carried inside an IPv6 one, if any.
///
/// Handles IPv4-mapped `::ffff:a.b.c.d`, IPv4-compatible `::a.b.c.d`, the
/// NAT64 well-known prefix `64:ff9b::/96` and 6to4 `2002::/16`.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }
    let seg = ip.segments();
    let [.., a, b, c, d] = ip.octets();
    match seg {
        // Also catches `::` and `::1`, which land in 0.0.0.0/8.
        [0, 0, 0, 0, 0, 0, _, _] => Some(Ipv4Addr::new(a, b, c, d)),
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(Ipv4Addr::new(a, b, c, d)),
        [0x2002, hi, lo, ..] => {
            let [a, b] = hi.to_be_bytes();
            let [c, d] = lo.to_be_bytes();
            Some(Ipv4Addr::new(a, b, c, d))
        }
        _ => None,
    }
}

/// reqwest DNS resolver that refuses to return blocked addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardedResolver;

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(guarded_lookup(name.as_str().to_string()))
    }
}

async fn guarded_lookup(host: String) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .collect();
    if let Some(bad) = addrs.iter().find(|a| is_blocked_ip(a.ip())) {
        warn!(
            "Refusing connection: {} resolved to private IP {}",
            host,
            bad.ip()
        );
        return Err(Box::new(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("Blocked domain resolving to private IP: {} ({})", host, bad.ip()),
        )));
    }
    debug!("{} resolved to {} address(es)", host, addrs.len());
    Ok(Box::new(addrs.into_iter()))
}
