use crate::error::ScanError;
use crate::types::{OpenPortInfo, ScanOutcome, ScanReport};
use std::fs;
use std::path::Path;

const RULE_WIDTH: usize = 60;

/// Rendered report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Fold a finished scan into the serializable report: open outcomes only,
/// sorted ascending by port regardless of completion order.
pub fn build_report(outcome: &ScanOutcome) -> ScanReport {
    let mut open: Vec<OpenPortInfo> = outcome
        .outcomes
        .iter()
        .filter(|o| o.open)
        .map(|o| OpenPortInfo {
            port: o.port,
            service: o.service.clone().unwrap_or_else(|| "Unknown".to_string()),
            state: "open".to_string(),
        })
        .collect();
    open.sort_by_key(|info| info.port);

    ScanReport {
        target: outcome.target.input.clone(),
        target_ip: outcome.target.resolved,
        scan_time: outcome.finished_at.clone(),
        total_open: open.len(),
        open_ports: open,
    }
}

/// Render a report in the requested format.
pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String, ScanError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(report),
    }
}

/// Human-readable rendering: header, port table, security recommendations.
pub fn render_text(report: &ScanReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let dash = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("{rule}\n"));
    out.push_str("Scan Report\n");
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!(
        "Target: {} ({})\n",
        report.target, report.target_ip
    ));
    out.push_str(&format!("Scan completed: {}\n", report.scan_time));
    out.push_str(&format!("Open ports found: {}\n", report.total_open));
    out.push_str(&format!("{rule}\n\n"));

    if report.open_ports.is_empty() {
        out.push_str("No open ports found.\n");
    } else {
        out.push_str("PORT\tSTATE\tSERVICE\n");
        out.push_str(&format!("{dash}\n"));
        for info in &report.open_ports {
            out.push_str(&format!("{}\t{}\t{}\n", info.port, info.state, info.service));
        }
    }

    out.push_str("\nSecurity Recommendations:\n");
    out.push_str(&format!("{dash}\n"));
    let warnings = security_warnings(&report.open_ports);
    if warnings.is_empty() {
        out.push_str("No obvious security concerns detected\n");
    } else {
        for warning in &warnings {
            out.push_str(&format!("[!] {warning}\n"));
        }
    }

    out
}

/// Machine-readable rendering; parses back into an identical `ScanReport`.
pub fn render_json(report: &ScanReport) -> Result<String, ScanError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Deterministic security heuristics over the open-port list.
pub fn security_warnings(open_ports: &[OpenPortInfo]) -> Vec<String> {
    let mut warnings = Vec::new();
    for info in open_ports {
        match info.port {
            21 | 23 => warnings.push(format!(
                "Port {} ({}) uses unencrypted communication",
                info.port, info.service
            )),
            3389 => warnings.push(format!(
                "Port {} ({}) exposed - ensure strong authentication",
                info.port, info.service
            )),
            3306 | 5432 | 27017 => warnings.push(format!(
                "Port {} ({}) - database should not be publicly accessible",
                info.port, info.service
            )),
            _ => {}
        }
    }
    warnings
}

/// Write an already-rendered report to a file. A failure here never voids
/// the stdout rendering that already happened; callers report it and move on.
pub fn write_report(path: impl AsRef<Path>, rendered: &str) -> Result<(), ScanError> {
    fs::write(path.as_ref(), rendered).map_err(|source| ScanError::OutputWrite {
        path: path.as_ref().to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, ProbeOutcome, ScanTarget};
    use std::net::{IpAddr, Ipv4Addr};

    fn outcome_with(ports: &[(u16, &str)]) -> ScanOutcome {
        let outcomes = ports
            .iter()
            .map(|&(port, service)| ProbeOutcome {
                port,
                open: true,
                service: Some(service.to_string()),
                error: ErrorKind::None,
                latency_ms: 3,
            })
            .collect();
        ScanOutcome {
            target: ScanTarget {
                input: "192.168.1.45".to_string(),
                resolved: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 45)),
            },
            outcomes,
            ports_total: ports.len() as u64,
            ports_scanned: ports.len() as u64,
            open_count: ports.len() as u64,
            started_at: "2026-08-07T10:00:00Z".to_string(),
            finished_at: "2026-08-07T10:00:05Z".to_string(),
            cancelled: false,
        }
    }

    #[test]
    fn unencrypted_warning_without_database_or_rdp_noise() {
        let report = build_report(&outcome_with(&[(21, "FTP"), (80, "HTTP")]));
        let text = render_text(&report);
        assert!(text.contains("Port 21 (FTP) uses unencrypted communication"));
        assert!(!text.contains("database"));
        assert!(!text.contains("strong authentication"));
    }

    #[test]
    fn clean_scan_reports_no_concerns() {
        let report = build_report(&outcome_with(&[(443, "HTTPS")]));
        let text = render_text(&report);
        assert!(text.contains("No obvious security concerns detected"));
    }

    #[test]
    fn no_open_ports_replaces_the_table() {
        let report = build_report(&outcome_with(&[]));
        let text = render_text(&report);
        assert!(text.contains("No open ports found."));
        assert!(!text.contains("PORT\tSTATE\tSERVICE"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let report = build_report(&outcome_with(&[(21, "FTP"), (3306, "MySQL")]));
        assert_eq!(render_text(&report), render_text(&report));
        assert_eq!(
            render_json(&report).unwrap(),
            render_json(&report).unwrap()
        );
    }

    #[test]
    fn database_warnings_cover_all_three_engines() {
        let open = build_report(&outcome_with(&[
            (3306, "MySQL"),
            (5432, "PostgreSQL"),
            (27017, "MongoDB"),
        ]))
        .open_ports;
        let warnings = security_warnings(&open);
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|w| w.contains("database should not be publicly accessible")));
    }

    #[test]
    fn closed_outcomes_never_reach_the_report() {
        let mut outcome = outcome_with(&[(80, "HTTP")]);
        outcome.outcomes.push(ProbeOutcome {
            port: 81,
            open: false,
            service: None,
            error: ErrorKind::Refused,
            latency_ms: 1,
        });
        let report = build_report(&outcome);
        assert_eq!(report.total_open, 1);
        assert_eq!(report.open_ports[0].port, 80);
    }
}
