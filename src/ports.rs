use crate::detect::SERVICE_TABLE;
use crate::error::ScanError;

/// Parse a port specification into an ascending, deduplicated list of
/// TCP ports (1..=65535).
///
/// Supported terms, comma-separated:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
///
/// Whitespace around terms is tolerated. Any malformed or out-of-range
/// term rejects the whole specification; no partial port set is produced.
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>, ScanError> {
    let mut out: Vec<u16> = Vec::new();

    for term in spec.split(',') {
        let term = term.trim();
        if term.is_empty() {
            return Err(invalid(spec, "empty term"));
        }

        // Range `start-end`
        if let Some((a, b)) = term.split_once('-') {
            let start = parse_port(spec, a.trim())?;
            let end = parse_port(spec, b.trim())?;
            if start > end {
                return Err(invalid(
                    spec,
                    format!("invalid range {start}-{end} (start > end)"),
                ));
            }
            out.extend(start..=end);
            continue;
        }

        // Single number
        out.push(parse_port(spec, term)?);
    }

    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// The built-in default scan set: every port the service table knows,
/// in ascending order.
pub fn common_ports() -> Vec<u16> {
    let mut ports: Vec<u16> = SERVICE_TABLE.iter().map(|(port, _)| *port).collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

/// The full TCP port space, 1..=65535.
pub fn all_ports() -> Vec<u16> {
    (1..=u16::MAX).collect()
}

fn parse_port(spec: &str, s: &str) -> Result<u16, ScanError> {
    let val: u32 = s
        .parse()
        .map_err(|_| invalid(spec, format!("invalid port value: {s}")))?;
    if val == 0 || val > 65535 {
        return Err(invalid(spec, format!("port out of range: {val}")));
    }
    Ok(val as u16)
}

fn invalid(spec: &str, reason: impl Into<String>) -> ScanError {
    ScanError::InvalidPortSpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_ports() {
        let ports = parse_port_spec("80, 22,443").unwrap();
        assert_eq!(ports, vec![22, 80, 443]);
    }

    #[test]
    fn parse_ranges_dedup_and_sort() {
        let ports = parse_port_spec("8000-8002,80,8001").unwrap();
        assert_eq!(ports, vec![80, 8000, 8001, 8002]);
    }

    #[test]
    fn duplicates_collapse_across_terms() {
        let ports = parse_port_spec("80,80,1-3").unwrap();
        assert_eq!(ports, vec![1, 2, 3, 80]);
    }

    #[test]
    fn non_numeric_term_rejects_everything() {
        assert!(parse_port_spec("80,abc,443").is_err());
    }

    #[test]
    fn out_of_range_values_error() {
        assert!(parse_port_spec("70000").is_err());
        assert!(parse_port_spec("0").is_err());
    }

    #[test]
    fn backwards_range_errors() {
        let err = parse_port_spec("5-3").unwrap_err();
        assert!(matches!(err, ScanError::InvalidPortSpec { .. }));
    }

    #[test]
    fn empty_term_errors() {
        assert!(parse_port_spec("80,,443").is_err());
        assert!(parse_port_spec("").is_err());
    }

    #[test]
    fn common_ports_cover_the_service_table() {
        let d = common_ports();
        assert!(d.windows(2).all(|w| w[0] < w[1]));
        for (port, _) in SERVICE_TABLE {
            assert!(d.contains(port));
        }
    }

    #[test]
    fn all_ports_span_the_full_range() {
        let all = all_ports();
        assert_eq!(all.len(), 65535);
        assert_eq!(all.first(), Some(&1));
        assert_eq!(all.last(), Some(&65535));
    }
}
