//! # bidharvest
//!
//! Acquire public procurement bid listings, extract structure from their PDF
//! documents, and resolve the district each bid ships to.
//!
//! ## Why this crate?
//!
//! The bid portal exposes listings through a paginated JSON API and buries
//! the interesting facts — the standard bid document, attached drawings and
//! BOQs, the consignee district — inside linked PDFs. This crate does the
//! whole round trip resiliently: transient network failures are retried with
//! backoff, broken documents degrade to sentinel text instead of dropping
//! the bid, and the output is persisted atomically so a crashed run never
//! leaves a half-written file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! listing API
//!  │
//!  ├─ 1. Fetch     page the JSON listing with retry/backoff
//!  ├─ 2. Extract   filter to future-dated bids, derive document URLs
//!  ├─ 3. Download  per-bid primary PDF (bounded retries, no partial files)
//!  ├─ 4. Parse     text lines + hyperlinks with spatial labels (spawn_blocking)
//!  ├─ 5. District  exact token match against a reference list
//!  └─ 6. Persist   atomic JSON array of enriched records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bidharvest::{scrape_to_file, HttpPortal, ScrapeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScrapeConfig::builder()
//!         .csrf_token(std::env::var("GEM_CSRF_TOKEN")?)
//!         .session_cookie(std::env::var("GEM_SESSION")?)
//!         .district_file("districts.txt")
//!         .target_bid_count(50)
//!         .build()?;
//!     let portal = HttpPortal::new(&config)?;
//!     let records = scrape_to_file(&portal, &config, "bids.json").await?;
//!     eprintln!("{} bids written", records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bidharvest` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! bidharvest = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod portal;
pub mod progress;
pub mod records;
pub mod scrape;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScrapeConfig, ScrapeConfigBuilder, DEFAULT_API_BASE};
pub use error::{DownloadError, FetchError, HarvestError, ParseError};
pub use pipeline::district::DistrictIndex;
pub use portal::{BidPortal, HttpPortal};
pub use progress::{NoopScrapeProgress, ProgressCallback, ScrapeProgress};
pub use records::{
    BidRecord, DistrictMatch, EnrichedBidRecord, HyperlinkEntry, PageText, PdfStructure,
};
pub use scrape::{scrape, scrape_sync, scrape_to_file};
