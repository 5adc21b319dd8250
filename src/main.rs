use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dirscan_rs::controller::ScanController;
use dirscan_rs::types::{ProbeOutcome, ScanEvent, ScanOptions, ScanReport, ScanSummary};
use dirscan_rs::wordlist::{self, WordlistSource};
use dirscan_rs::server;
use std::fs::File;

use anyhow::{bail, Result};
use clap::Parser;

const DEFAULT_WORDLIST: &str = "wordlist.txt";

/// dirscan-rs — Fast async web directory/path discovery scanner with sensitive-content detection.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dirscan-rs",
    version,
    about = "Fast async web directory/path discovery scanner with sensitive-content detection.",
    long_about = None
)]
struct Cli {
    /// Target base URL (e.g., https://lab.example:8443). Required unless --serve-ui.
    #[arg(long)]
    target: Option<String>,

    /// Path to wordlist file (one candidate path per line).
    #[arg(long, default_value = DEFAULT_WORDLIST)]
    wordlist: PathBuf,

    /// Number of concurrent probe workers.
    #[arg(long, default_value_t = 10)]
    threads: usize,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", default_value_t = 5.0)]
    timeout_secs: f64,

    /// Comma-separated extension suffixes appended to extensionless candidates (e.g., .bak,.old).
    #[arg(long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Skip TLS certificate verification (self-signed lab targets only).
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Scan qualifying response bodies for leaked secrets.
    #[arg(long = "detect-sensitive", default_value_t = false)]
    detect_sensitive: bool,

    /// Log individual probe failures.
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Write the final report as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Start the embedded HTTP control API instead of scanning directly.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Bind address for the control API.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    println!("dirscan-rs configuration:");
    println!(
        "  target           : {}",
        cli.target.as_deref().unwrap_or("<none>")
    );
    println!("  wordlist         : {}", cli.wordlist.display());
    println!("  threads          : {}", cli.threads);
    println!("  timeout_secs     : {}", cli.timeout_secs);
    println!("  extensions       : {:?}", cli.extensions);
    println!("  insecure         : {}", cli.insecure);
    println!("  detect_sensitive : {}", cli.detect_sensitive);
    println!(
        "  output           : {}",
        cli.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );

    if cli.serve_ui {
        println!("Control API starting at http://{} (Ctrl+C to stop)", cli.bind);
        server::spawn_server(&cli.bind).await?;
        return Ok(());
    }

    let Some(target) = cli.target.clone() else {
        bail!("--target is required unless --serve-ui is set");
    };

    let source = wordlist_source(&cli.wordlist, DEFAULT_WORDLIST);
    if matches!(source, WordlistSource::Inline(_)) {
        println!(
            "Wordlist {} not found; using the built-in default list.",
            cli.wordlist.display()
        );
    }

    let options = ScanOptions {
        threads: cli.threads,
        timeout: Duration::from_secs_f64(cli.timeout_secs),
        insecure_tls: cli.insecure,
        extensions: cli.extensions.clone(),
        detect_sensitive: cli.detect_sensitive,
        verbose: cli.verbose,
    };

    let (controller, mut events) = ScanController::new();
    let controller = Arc::new(controller);
    controller.start(&target, source, options)?;

    // Ctrl-C requests a cooperative stop; the run still ends with Finished.
    let ctl = controller.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctl.stop();
    });

    let mut entries: Vec<ProbeOutcome> = Vec::new();
    let (mut processed, mut total) = (0u64, 0u64);
    while let Some(ev) = events.recv().await {
        match ev {
            ScanEvent::Log { message } => println!("[*] {message}"),
            ScanEvent::Progress {
                processed: p,
                total: t,
            } => {
                processed = p;
                total = t;
                println!("[*] progress: {p}/{t}");
            }
            ScanEvent::Result { outcome } => entries.push(outcome),
            ScanEvent::Finished => break,
        }
    }

    let report = ScanReport {
        summary: ScanSummary {
            scanned_total: total,
            scanned_done: processed,
            hit_count: entries.len() as u64,
        },
        entries,
    };

    print_results_table(&report);
    if let Some(path) = cli.output.as_deref() {
        if let Err(e) = write_report_json(path, &report) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON report to {}", path.display());
        }
    }

    Ok(())
}

/// Pick the wordlist source for the run. Only the untouched default path may
/// fall back to the built-in list; an explicitly requested file that is
/// missing stays a file source so the unreadable-wordlist configuration error
/// surfaces instead of a silent swap.
fn wordlist_source(path: &Path, default_name: &str) -> WordlistSource {
    if path.as_os_str() == default_name && !path.exists() {
        WordlistSource::Inline(wordlist::default_wordlist().lines().map(Into::into).collect())
    } else {
        WordlistSource::FilePath(path.to_path_buf())
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn print_results_table(report: &ScanReport) {
    let mut url_w = 3usize.max("url".len());
    let mut sens_w = 9usize.max("sensitive".len());
    for e in &report.entries {
        url_w = url_w.max(e.url.len().min(80));
        sens_w = sens_w.max(e.sensitive.join(",").len().min(40));
    }
    let status_w = 6usize.max("status".len());
    let size_w = 8usize.max("size".len());

    println!(
        "\nHits: {} (probed: {}/{})",
        report.summary.hit_count, report.summary.scanned_done, report.summary.scanned_total
    );
    println!(
        "{:<url_w$}  {:>status_w$}  {:>size_w$}  {:<sens_w$}",
        "url",
        "status",
        "size",
        "sensitive",
        url_w = url_w,
        status_w = status_w,
        size_w = size_w,
        sens_w = sens_w
    );
    println!(
        "{:-<url_w$}  {:-<status_w$}  {:-<size_w$}  {:-<sens_w$}",
        "",
        "",
        "",
        "",
        url_w = url_w,
        status_w = status_w,
        size_w = size_w,
        sens_w = sens_w
    );
    for e in &report.entries {
        let mut url = e.url.clone();
        if url.len() > 80 {
            url.truncate(80);
        }
        let mut sens = e.sensitive.join(",");
        if sens.len() > 40 {
            sens.truncate(40);
        }
        println!(
            "{:<url_w$}  {:>status_w$}  {:>size_w$}  {:<sens_w$}",
            url,
            e.status,
            e.size,
            sens,
            url_w = url_w,
            status_w = status_w,
            size_w = size_w,
            sens_w = sens_w
        );
    }
}

fn write_report_json(path: &std::path::Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
