use crate::detect::{self, BannerProbe, HttpHeadProbe};
use crate::types::{ErrorKind, ProbeOutcome, ScanOutcome, ScanTarget};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use ::time::{format_description::well_known, OffsetDateTime};

/// Probe engine knobs. `Default` matches the CLI defaults: 100 concurrent
/// connects, 1 second per attempt, banner grabs via HTTP HEAD.
#[derive(Clone)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub connect_timeout: Duration,
    pub verbose: bool,
    pub banner_probe: Arc<dyn BannerProbe>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 100,
            connect_timeout: Duration::from_secs(1),
            verbose: false,
            banner_probe: Arc::new(HttpHeadProbe::default()),
        }
    }
}

/// Live progress counters shared between the scan and an observer.
#[derive(Clone, Debug, Default)]
pub struct Progress {
    scanned_done: Arc<AtomicU64>,
    open_count: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    max_in_flight: Arc<AtomicU64>,
    outcomes: Arc<Mutex<Vec<ProbeOutcome>>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scanned_done(&self) -> u64 {
        self.scanned_done.load(Ordering::Relaxed)
    }

    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }

    /// High-water mark of simultaneously in-flight probes.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::Relaxed)
    }
}

/// Probe every port in `ports` on the target with bounded concurrency.
///
/// - A `Semaphore` caps simultaneous connect attempts.
/// - `tokio::time::timeout` bounds each attempt.
/// - Open ports get service detection inside the same worker task; a table
///   hit costs no I/O, anything else goes through the banner probe under
///   its own short timeout.
///
/// Outcomes land in the shared sink in completion order; callers that need
/// port order sort afterwards (the report builder does).
pub async fn scan_ports(target: &ScanTarget, ports: &[u16], opts: &ScanOptions) -> ScanOutcome {
    scan_ports_internal(target, ports, opts, CancellationToken::new(), Progress::new()).await
}

/// Variant that accepts a `CancellationToken`. Cancelling stops dispatch of
/// new probes; whatever already completed is returned.
pub async fn scan_ports_with_cancel(
    target: &ScanTarget,
    ports: &[u16],
    opts: &ScanOptions,
    cancel: CancellationToken,
) -> ScanOutcome {
    scan_ports_internal(target, ports, opts, cancel, Progress::new()).await
}

/// Variant that also shares live progress counters with the caller.
pub async fn scan_ports_with_progress(
    target: &ScanTarget,
    ports: &[u16],
    opts: &ScanOptions,
    cancel: CancellationToken,
    progress: Progress,
) -> ScanOutcome {
    scan_ports_internal(target, ports, opts, cancel, progress).await
}

async fn scan_ports_internal(
    target: &ScanTarget,
    ports: &[u16],
    opts: &ScanOptions,
    cancel: CancellationToken,
    progress: Progress,
) -> ScanOutcome {
    let started_at = now_rfc3339();
    let sem = Arc::new(Semaphore::new(opts.concurrency.clamp(1, 5_000)));
    let mut set = JoinSet::new();

    for &port in ports {
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let progress = progress.clone();
        let cancel = cancel.clone();
        let probe = opts.banner_probe.clone();
        let addr = SocketAddr::new(target.resolved, port);
        let connect_timeout = opts.connect_timeout;
        let verbose = opts.verbose;

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes

            if cancel.is_cancelled() {
                return;
            }

            let current = progress.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            progress.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let outcome = probe_port(addr, connect_timeout, probe.as_ref()).await;

            progress.in_flight.fetch_sub(1, Ordering::SeqCst);

            if verbose {
                print_probe_line(&outcome);
            }
            if outcome.open {
                progress.open_count.fetch_add(1, Ordering::Relaxed);
            }
            progress.outcomes.lock().await.push(outcome);
            progress.scanned_done.fetch_add(1, Ordering::Relaxed);
        });
    }

    while let Some(_res) = set.join_next().await {}

    // All workers are done; take the sink contents without cloning.
    let outcomes = std::mem::take(&mut *progress.outcomes.lock().await);

    ScanOutcome {
        target: target.clone(),
        outcomes,
        ports_total: ports.len() as u64,
        ports_scanned: progress.scanned_done(),
        open_count: progress.open_count(),
        started_at,
        finished_at: now_rfc3339(),
        cancelled: cancel.is_cancelled(),
    }
}

/// One connect attempt, classified. The connection that proves a port open
/// is dropped immediately; banner detection opens its own.
async fn probe_port(
    addr: SocketAddr,
    connect_timeout: Duration,
    probe: &dyn BannerProbe,
) -> ProbeOutcome {
    let port = addr.port();
    let start = Instant::now();
    match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            let latency_ms = start.elapsed().as_millis() as u64;
            let service = detect::detect_service(probe, addr).await;
            ProbeOutcome {
                port,
                open: true,
                service: Some(service),
                error: ErrorKind::None,
                latency_ms,
            }
        }
        Ok(Err(e)) => {
            let error = if e.kind() == io::ErrorKind::ConnectionRefused {
                ErrorKind::Refused
            } else {
                ErrorKind::Other
            };
            ProbeOutcome {
                port,
                open: false,
                service: None,
                error,
                latency_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(_elapsed) => ProbeOutcome {
            port,
            open: false,
            service: None,
            error: ErrorKind::Timeout,
            latency_ms: connect_timeout.as_millis() as u64,
        },
    }
}

fn print_probe_line(outcome: &ProbeOutcome) {
    if outcome.open {
        let service = outcome.service.as_deref().unwrap_or("Unknown");
        println!("[+] Port {} is OPEN - {}", outcome.port, service);
    } else if outcome.error == ErrorKind::Timeout {
        println!("[!] Port {} timed out", outcome.port);
    } else {
        println!("[-] Port {} is CLOSED", outcome.port);
    }
}

/// RFC3339 UTC timestamp for scan metadata.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
