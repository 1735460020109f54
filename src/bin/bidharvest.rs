//! CLI binary for bidharvest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ScrapeConfig` and persists results.

use anyhow::{Context, Result};
use clap::Parser;
use bidharvest::{
    scrape, scrape_to_file, HttpPortal, ScrapeConfig, ScrapeProgress, DEFAULT_API_BASE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar tracking enriched bids plus a log
/// line per bid.
struct CliProgress {
    bar: ProgressBar,
    degraded: AtomicUsize,
}

impl CliProgress {
    fn new(target: usize) -> Arc<Self> {
        let bar = ProgressBar::new(target as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} bids  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Harvesting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            degraded: AtomicUsize::new(0),
        })
    }
}

impl ScrapeProgress for CliProgress {
    fn on_page_fetched(&self, page: u32, extracted: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            dim(&format!("listing page {page}: {extracted} bids"))
        ));
    }

    fn on_bid_start(&self, bid_number: &str, _processed: usize, _target: usize) {
        self.bar.set_message(bid_number.to_string());
    }

    fn on_bid_complete(&self, bid_number: &str, matched_city: &str) {
        // Sentinels are lowercase phrases; resolved districts are names.
        let degraded = matched_city.contains(' ')
            && matched_city
                .chars()
                .all(|c| c.is_lowercase() || c.is_whitespace());
        if degraded {
            self.degraded.fetch_add(1, Ordering::SeqCst);
        }
        self.bar.println(format!(
            "  {} {:<24}  {}",
            green("✓"),
            bid_number,
            dim(matched_city),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize) {
        self.bar.finish_and_clear();
        let degraded = self.degraded.load(Ordering::SeqCst);
        if degraded == 0 {
            eprintln!("{} {} bids harvested", green("✔"), bold(&total.to_string()));
        } else {
            eprintln!(
                "{} {} bids harvested  ({} without a resolved district)",
                cyan("⚠"),
                bold(&total.to_string()),
                degraded,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Harvest 20 ongoing bids to stdout (JSON array)
  bidharvest --csrf-token $TOKEN --session $SESSION

  # Write 50 bids to a file, resolving districts
  bidharvest -n 50 --districts districts.txt -o bids.json

  # Stop when a previously seen bid appears (incremental-ish runs)
  bidharvest --stop-bid-number GEM/2025/B/1234567 -o new_bids.json

  # Full-text search, verbose logging
  bidharvest --search "solar panel" -v -o solar.json

ENVIRONMENT VARIABLES:
  GEM_CSRF_TOKEN          CSRF token from an authenticated portal session
  GEM_SESSION             ci_session cookie value
  BIDHARVEST_API_BASE     Portal base URL override
  BIDHARVEST_DISTRICTS    Path to the district reference list

SETUP:
  1. Log into the portal in a browser and copy the csrf_gem_cookie and
     ci_session cookie values.
  2. export GEM_CSRF_TOKEN=...  GEM_SESSION=...
  3. bidharvest -n 50 --districts districts.txt -o bids.json
"#;

/// Harvest procurement bid listings and their PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "bidharvest",
    version,
    about = "Harvest procurement bid listings, their PDF documents, and consignee districts",
    arg_required_else_help = false,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Write the JSON array to this file instead of stdout.
    #[arg(short, long, env = "BIDHARVEST_OUTPUT")]
    output: Option<PathBuf>,

    /// CSRF token from an authenticated portal session.
    #[arg(long, env = "GEM_CSRF_TOKEN", hide_env_values = true)]
    csrf_token: String,

    /// ci_session cookie value.
    #[arg(long = "session", env = "GEM_SESSION", hide_env_values = true)]
    session_cookie: String,

    /// Portal base URL.
    #[arg(long, env = "BIDHARVEST_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Number of bids to harvest.
    #[arg(short = 'n', long, default_value_t = 20)]
    count: usize,

    /// Stop immediately when this portal-internal bid id is seen.
    #[arg(long)]
    stop_bid_id: Option<String>,

    /// Stop immediately when this bid number is seen.
    #[arg(long)]
    stop_bid_number: Option<String>,

    /// District reference list, one name per line.
    #[arg(long = "districts", env = "BIDHARVEST_DISTRICTS")]
    district_file: Option<PathBuf>,

    /// Directory for temporary PDF downloads.
    #[arg(long, default_value = "pdfs")]
    work_dir: PathBuf,

    /// Full-text search term.
    #[arg(long, default_value = "")]
    search: String,

    /// Retries for transient network failures.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Initial retry backoff in milliseconds.
    #[arg(long, default_value_t = 2000)]
    backoff_ms: u64,

    /// Listing API timeout in seconds.
    #[arg(long, default_value_t = 90)]
    api_timeout: u64,

    /// Document download timeout in seconds.
    #[arg(long, default_value_t = 60)]
    download_timeout: u64,

    /// Minimum pause between listing pages in milliseconds.
    #[arg(long, default_value_t = 1000)]
    page_delay_min: u64,

    /// Maximum pause between listing pages in milliseconds.
    #[arg(long, default_value_t = 3000)]
    page_delay_max: u64,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the progress bar is active;
    // the bar provides the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ScrapeConfig::builder()
        .api_base(&cli.api_base)
        .csrf_token(&cli.csrf_token)
        .session_cookie(&cli.session_cookie)
        .target_bid_count(cli.count)
        .max_retries(cli.max_retries)
        .initial_backoff_ms(cli.backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .page_delay_ms(cli.page_delay_min, cli.page_delay_max)
        .work_dir(&cli.work_dir)
        .search_term(&cli.search);

    if let Some(ref id) = cli.stop_bid_id {
        builder = builder.stop_bid_id(id);
    }
    if let Some(ref number) = cli.stop_bid_number {
        builder = builder.stop_bid_number(number);
    }
    if let Some(ref path) = cli.district_file {
        builder = builder.district_file(path);
    }
    if show_progress {
        builder = builder.progress_callback(CliProgress::new(cli.count));
    }

    let config = builder.build().context("Invalid configuration")?;
    let portal = HttpPortal::new(&config).context("Failed to build HTTP client")?;

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let records = scrape_to_file(&portal, &config, output_path)
            .await
            .context("Harvest failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} records  →  {}",
                green("✔"),
                records.len(),
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let records = scrape(&portal, &config).await.context("Harvest failed")?;
        let json = serde_json::to_string_pretty(&records).context("Failed to serialise output")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();

        if !cli.quiet && !show_progress {
            eprintln!("{} records harvested", records.len());
        }
    }

    Ok(())
}
