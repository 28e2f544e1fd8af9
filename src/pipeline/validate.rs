//! URL validation: scheme allow-list and private-address blocking.
//!
//! Runs before every request, including each redirect hop. The only side
//! effect is the DNS lookup performed through the injected
//! [`HostResolver`].

use crate::config::SchemePolicy;
use crate::error::ValidationError;
use crate::pipeline::resolve::{is_blocked_ip, HostResolver};
use std::net::IpAddr;
use tracing::debug;
use url::{Host, Url};

/// Validate `raw` against `policy` and the private-address rules.
///
/// Returns the parsed URL on success so callers never re-parse.
pub async fn validate_url(
    raw: &str,
    policy: SchemePolicy,
    resolver: &dyn HostResolver,
) -> Result<Url, ValidationError> {
    let url = check_scheme(raw, policy)?;

    let host = url.host().ok_or_else(|| ValidationError::MissingHost {
        url: raw.to_string(),
    })?;

    let domain = match host {
        Host::Ipv4(ip) => return check_literal(IpAddr::V4(ip)).map(|_| url),
        Host::Ipv6(ip) => return check_literal(IpAddr::V6(ip)).map(|_| url),
        Host::Domain(d) => d.to_string(),
    };

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs = resolver
        .resolve(&domain, port)
        .await
        .map_err(|e| ValidationError::Unresolvable {
            host: domain.clone(),
            reason: e.to_string(),
        })?;

    if addrs.is_empty() {
        return Err(ValidationError::Unresolvable {
            host: domain,
            reason: "no addresses returned".into(),
        });
    }

    if let Some(ip) = addrs.iter().copied().find(|ip| is_blocked_ip(*ip)) {
        return Err(ValidationError::PrivateResolution { host: domain, ip });
    }

    debug!("{} validated ({} address(es))", domain, addrs.len());
    Ok(url)
}

/// Parse `raw` and check its scheme only. No network access.
pub fn check_scheme(raw: &str, policy: SchemePolicy) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim()).map_err(|_| ValidationError::NotAbsolute {
        input: raw.to_string(),
    })?;
    if !policy.allows(url.scheme()) {
        return Err(ValidationError::InvalidScheme {
            scheme: url.scheme().to_string(),
            allowed: policy.describe(),
        });
    }
    Ok(url)
}

fn check_literal(ip: IpAddr) -> Result<(), ValidationError> {
    if is_blocked_ip(ip) {
        Err(ValidationError::PrivateIp { ip })
    } else {
        Ok(())
    }
}
