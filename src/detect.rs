use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

/// Well-known TCP port to service name mappings. Read-only for the life
/// of the process; the default scan set is derived from these keys.
pub const SERVICE_TABLE: &[(u16, &str)] = &[
    (20, "FTP-Data"),
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (8080, "HTTP-Proxy"),
    (8443, "HTTPS-Alt"),
    (27017, "MongoDB"),
];

/// Look up the well-known service name for a port, if any.
pub fn lookup(port: u16) -> Option<&'static str> {
    SERVICE_TABLE
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Strategy seam for banner-based detection on ports the table does not
/// cover. Implementations open their own short-lived connection and return
/// whatever raw banner text they managed to read.
#[async_trait]
pub trait BannerProbe: Send + Sync {
    async fn probe(&self, addr: SocketAddr) -> Option<String>;
}

/// Default probe: a minimal HTTP HEAD request followed by one bounded
/// read. Enough to coax a response out of web servers, and protocols like
/// SSH and FTP announce themselves on connect anyway.
#[derive(Debug, Clone)]
pub struct HttpHeadProbe {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for HttpHeadProbe {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(500),
        }
    }
}

#[async_trait]
impl BannerProbe for HttpHeadProbe {
    async fn probe(&self, addr: SocketAddr) -> Option<String> {
        let mut stream = time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .ok()?
            .ok()?;

        // A write failure is not fatal; the peer may still volunteer a banner.
        let _ = time::timeout(
            self.read_timeout,
            stream.write_all(b"HEAD / HTTP/1.0\r\n\r\n"),
        )
        .await;

        let mut buf = vec![0u8; 1024];
        match time::timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => {
                buf.truncate(n);
                Some(String::from_utf8_lossy(&buf).trim().to_string())
            }
            _ => None,
        }
    }
}

/// Map a raw banner to a service label. Substring matches are
/// case-sensitive and checked in priority order: HTTP, then SSH, then FTP.
/// A non-empty banner that matches nothing keeps its first 20 characters
/// as a hint for manual inspection.
pub fn classify_banner(banner: Option<&str>) -> String {
    match banner {
        Some(b) if b.contains("HTTP") => "HTTP/Web Server".to_string(),
        Some(b) if b.contains("SSH") => "SSH".to_string(),
        Some(b) if b.contains("FTP") => "FTP".to_string(),
        Some(b) if !b.is_empty() => {
            let snippet: String = b.chars().take(20).collect();
            format!("Unknown ({snippet}...)")
        }
        _ => "Unknown".to_string(),
    }
}

/// Full detection path for a port that just proved open: table lookup
/// first (no network I/O), banner grab only for unmapped ports.
pub async fn detect_service(probe: &dyn BannerProbe, addr: SocketAddr) -> String {
    if let Some(name) = lookup(addr.port()) {
        return name.to_string();
    }
    let banner = probe.probe(addr).await;
    classify_banner(banner.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn table_lookup_hits() {
        assert_eq!(lookup(21), Some("FTP"));
        assert_eq!(lookup(3389), Some("RDP"));
        assert_eq!(lookup(27017), Some("MongoDB"));
        assert_eq!(lookup(12345), None);
    }

    #[test]
    fn http_banners_win_over_ssh_and_ftp() {
        assert_eq!(
            classify_banner(Some("HTTP/1.1 200 OK\r\nServer: nginx")),
            "HTTP/Web Server"
        );
        // Priority order: a banner mentioning both is classified as HTTP.
        assert_eq!(
            classify_banner(Some("SSH tunnel over HTTP")),
            "HTTP/Web Server"
        );
    }

    #[test]
    fn ssh_and_ftp_banners_classify() {
        assert_eq!(classify_banner(Some("SSH-2.0-OpenSSH_9.6")), "SSH");
        assert_eq!(classify_banner(Some("220 FTP service ready")), "FTP");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(
            classify_banner(Some("http lowercase only")),
            "Unknown (http lowercase only...)"
        );
    }

    #[test]
    fn unknown_banners_keep_a_snippet() {
        let label = classify_banner(Some("MYSTERY-PROTOCOL v4 hello from somewhere"));
        assert_eq!(label, "Unknown (MYSTERY-PROTOCOL v4 ...)");
    }

    #[test]
    fn empty_or_missing_banner_is_unknown() {
        assert_eq!(classify_banner(Some("")), "Unknown");
        assert_eq!(classify_banner(None), "Unknown");
    }

    #[tokio::test]
    async fn table_hit_never_touches_the_network() {
        // Port 22 is in the table; nothing listens on this address, so any
        // banner-grab attempt would come back Unknown instead.
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 22);
        let probe = HttpHeadProbe::default();
        assert_eq!(detect_service(&probe, addr).await, "SSH");
    }
}
