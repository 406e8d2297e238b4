use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv6Addr};

use log::debug;

use crate::error::ResolveError;

/// Longest host string handed to the lookup capability.
pub const MAX_HOST_LEN: usize = 255;

const ADDRESS_PARAMETER: &str = "hostNameOrAddress";

pub type ResolutionResult = Result<IpAddr, ResolveError>;

/// Name-to-address capability. Returns every candidate the lookup produced.
pub trait HostLookup {
    fn lookup(&self, host: &str) -> impl Future<Output = io::Result<Vec<IpAddr>>>;
}

/// Lookup backed by the operating system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolve a user supplied host into exactly one target address.
///
/// IP literals are returned without consulting `lookup`. For names, the first
/// candidate returned by the lookup wins. A single attempt is made.
pub async fn resolve<L: HostLookup>(lookup: &L, host_text: &str) -> ResolutionResult {
    let host = host_text.trim();
    if host.is_empty() {
        return Err(ResolveError::NoInputProvided);
    }

    let len = host.chars().count();
    if len > MAX_HOST_LEN {
        return Err(ResolveError::InputTooLong { len, max: MAX_HOST_LEN });
    }

    if let Some(ip) = parse_ip_literal(host) {
        if ip.is_unspecified() {
            return Err(ResolveError::InvalidAddressFormat {
                parameter: Some(ADDRESS_PARAMETER.to_string()),
                detail: format!("{ip} is not a routable address"),
            });
        }
        return Ok(ip);
    }

    validate_hostname(host)?;

    let candidates = lookup
        .lookup(host)
        .await
        .map_err(|e| ResolveError::NameResolution(e.to_string()))?;
    debug!("{host} resolved to {candidates:?}");

    candidates
        .first()
        .copied()
        .ok_or_else(|| ResolveError::NameResolution(format!("No addresses found for {host}")))
}

fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }
    host.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<Ipv6Addr>().ok())
        .map(IpAddr::V6)
}

/// Host names may only carry alphanumerics (internationalized ones included),
/// dots, hyphens and underscores.
fn validate_hostname(host: &str) -> Result<(), ResolveError> {
    match host
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        Some(c) => Err(ResolveError::InvalidAddressFormat {
            parameter: Some(ADDRESS_PARAMETER.to_string()),
            detail: format!("unexpected character {c:?} in {host:?}"),
        }),
        None => Ok(()),
    }
}
