use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use port_scan_rs::report::{self, ReportFormat};
use port_scan_rs::scanner::{self, ScanOptions};
use port_scan_rs::{ports, resolver};

const EXIT_INTERRUPTED: u8 = 130;

/// port-scan-rs — concurrent TCP port scanner with service detection.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "port-scan-rs",
    version,
    about = "Concurrent TCP port scanner with service detection and security reporting.",
    long_about = "Concurrent TCP port scanner with service detection and security reporting.\n\n\
        Only scan hosts you own or have explicit permission to test. Unauthorized\n\
        port scanning may be illegal in your jurisdiction."
)]
struct Cli {
    /// Target hostname or IP address.
    #[arg(short = 't', long)]
    target: String,

    /// Ports to scan: single ports, ranges, comma lists (e.g. 80,443,8000-8100).
    #[arg(short = 'p', long, conflicts_with = "all")]
    ports: Option<String>,

    /// Scan all 65535 ports (slow!). Default is the built-in common-port list.
    #[arg(long, default_value_t = false)]
    all: bool,

    /// Per-connection timeout in seconds.
    #[arg(long, default_value_t = 1.0)]
    timeout: f64,

    /// Max concurrent connection attempts.
    #[arg(long, default_value_t = 100)]
    threads: usize,

    /// Print each port's result as probes complete.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,

    /// Write the rendered report to this file in addition to stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    ensure!(cli.timeout > 0.0, "timeout must be positive");
    ensure!(cli.threads > 0, "threads must be at least 1");

    let port_list = if cli.all {
        println!("[!] Scanning all 65535 ports - this will take a while!");
        ports::all_ports()
    } else if let Some(spec) = cli.ports.as_deref() {
        ports::parse_port_spec(spec)?
    } else {
        ports::common_ports()
    };

    let target = resolver::resolve_target(&cli.target).await?;

    println!("port-scan-rs configuration:");
    println!("  target      : {} ({})", target.input, target.resolved);
    println!("  ports       : {}", port_list.len());
    println!("  timeout     : {:.1}s", cli.timeout);
    println!("  threads     : {}", cli.threads);
    println!("Scan started: {}", scanner::now_rfc3339());

    // Ctrl-C stops dispatching new probes; completed results still get reported.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        eprintln!("\n[!] Scan interrupted by user");
        cancel_ctrlc.cancel();
    });

    let opts = ScanOptions {
        concurrency: cli.threads,
        connect_timeout: Duration::from_secs_f64(cli.timeout),
        verbose: cli.verbose,
        ..Default::default()
    };
    let outcome = scanner::scan_ports_with_cancel(&target, &port_list, &opts, cancel).await;

    let scan_report = report::build_report(&outcome);
    let rendered = report::render(&scan_report, cli.format.into())?;
    println!("{rendered}");

    if let Some(path) = cli.output.as_deref() {
        match report::write_report(path, &rendered) {
            Ok(()) => println!("[+] Report saved to: {}", path.display()),
            Err(e) => eprintln!("Warning: {e}"),
        }
    }

    if outcome.cancelled {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
