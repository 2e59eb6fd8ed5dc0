use crate::error::ScanError;
use crate::types::ScanTarget;
use std::io;
use std::net::IpAddr;
use tokio::net::lookup_host;

/// Resolve a hostname or address literal into the concrete address used
/// for every probe in the scan.
///
/// Literals (`192.168.1.45`, `::1`) are parsed directly without touching
/// the resolver. Hostnames go through the platform resolver; when a name
/// maps to both families the first IPv4 address wins.
pub async fn resolve_target(input: &str) -> Result<ScanTarget, ScanError> {
    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(ScanTarget {
            input: input.to_string(),
            resolved: ip,
        });
    }

    // `lookup_host` wants a port; 0 is a placeholder, only the IP is kept.
    let addrs: Vec<IpAddr> = lookup_host((input, 0u16))
        .await
        .map_err(|source| ScanError::Resolution {
            host: input.to_string(),
            source,
        })?
        .map(|sa| sa.ip())
        .collect();

    let resolved = addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ScanError::Resolution {
            host: input.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        })?;

    Ok(ScanTarget {
        input: input.to_string(),
        resolved,
    })
}
