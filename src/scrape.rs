//! Top-level acquisition entry points.
//!
//! [`scrape`] drives the whole pipeline sequentially: page through the
//! listing API, extract bid records, download and parse each bid's
//! documents, and resolve a district for each. The per-bid work never
//! aborts the run — any failure below the bid level is recorded as sentinel
//! text on that bid and processing continues. Only an invalid configuration
//! or an unreachable first page is fatal.
//!
//! Bids are processed one at a time on purpose: the portal throttles
//! aggressive sessions, and a run of a few dozen bids finishes in minutes
//! anyway.

use crate::config::ScrapeConfig;
use crate::error::HarvestError;
use crate::pipeline::district::DistrictIndex;
use crate::pipeline::download::download_document;
use crate::pipeline::extract::extract_bids;
use crate::pipeline::fetch::fetch_page_with_retries;
use crate::pipeline::parse::parse_structure;
use crate::pipeline::retry::RetryPolicy;
use crate::portal::BidPortal;
use crate::records::{
    BidRecord, DistrictMatch, EnrichedBidRecord, PdfStructure, SENTINEL_BID_DOC_DOWNLOAD_FAILED,
    SENTINEL_BID_DOC_NOT_FOUND, SENTINEL_BID_DOC_PARSE_FAILED, SENTINEL_DISTRICT_LIST_UNAVAILABLE,
    SENTINEL_DISTRICT_NOT_FOUND, SENTINEL_NO_PRIMARY_URL, SENTINEL_PRIMARY_DOWNLOAD_FAILED,
};
use chrono::Utc;
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Acquire and enrich bids until the target count, a stop bid, or the end
/// of the listing is reached.
///
/// # Returns
/// `Ok(Vec<EnrichedBidRecord>)` with everything accumulated, even when
/// individual bids degraded to sentinel text.
///
/// # Errors
/// Returns `Err(HarvestError)` only when the very first listing page cannot
/// be fetched — with nothing accumulated there is nothing worth persisting.
pub async fn scrape(
    portal: &dyn BidPortal,
    config: &ScrapeConfig,
) -> Result<Vec<EnrichedBidRecord>, HarvestError> {
    let policy = RetryPolicy::new(
        config.max_retries,
        Duration::from_millis(config.initial_backoff_ms),
    );

    // ── Step 1: Load the district reference list ─────────────────────────
    let district_index = match &config.district_file {
        Some(path) => match DistrictIndex::load(path) {
            Ok(index) => {
                info!(districts = index.len(), file = %path.display(), "district list loaded");
                Some(index)
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "district list unavailable");
                None
            }
        },
        None => None,
    };

    // ── Step 2: Page through the listing ─────────────────────────────────
    let mut results: Vec<EnrichedBidRecord> = Vec::new();
    let mut page: u32 = 1;

    'pages: loop {
        let raw_page = match fetch_page_with_retries(portal, page, &policy).await {
            Ok(body) => body,
            Err(e) if page == 1 => {
                return Err(HarvestError::FirstPageUnavailable { source: e });
            }
            Err(e) => {
                warn!(page, error = %e, "listing page unavailable; keeping what was accumulated");
                break;
            }
        };

        let bids = extract_bids(&raw_page, Utc::now(), &config.api_base);
        info!(page, extracted = bids.len(), "listing page processed");
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_fetched(page, bids.len());
        }

        if bids.is_empty() {
            debug!(page, "empty listing page; end of listing");
            break;
        }

        // ── Step 3: Enrich each bid ───────────────────────────────────────
        for bid in bids {
            if is_stop_bid(config, &bid) {
                info!(bid_number = %bid.bid_number, "stop bid reached");
                break 'pages;
            }
            if results.len() >= config.target_bid_count {
                break 'pages;
            }

            if let Some(ref cb) = config.progress_callback {
                cb.on_bid_start(&bid.bid_number, results.len(), config.target_bid_count);
            }

            let enriched = enrich_bid(
                portal,
                config,
                &policy,
                district_index.as_ref(),
                bid,
                results.len(),
            )
            .await;

            if let Some(ref cb) = config.progress_callback {
                cb.on_bid_complete(&enriched.bid.bid_number, &enriched.matched_city_info.matched_city);
            }
            results.push(enriched);
        }

        if results.len() >= config.target_bid_count {
            break;
        }

        // ── Step 4: Pace the next page ────────────────────────────────────
        page_pause(config.page_delay_ms).await;
        page += 1;
    }

    info!(total = results.len(), "acquisition finished");
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(results.len());
    }

    Ok(results)
}

/// Run [`scrape`] and persist the results as a JSON array.
///
/// Uses atomic write (temp file + rename) so readers never observe a
/// partially written output file.
pub async fn scrape_to_file(
    portal: &dyn BidPortal,
    config: &ScrapeConfig,
    output_path: impl AsRef<Path>,
) -> Result<Vec<EnrichedBidRecord>, HarvestError> {
    let results = scrape(portal, config).await?;
    let path = output_path.as_ref();

    let json = serde_json::to_vec_pretty(&results)
        .map_err(|e| HarvestError::Internal(format!("serialising results: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HarvestError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| HarvestError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| HarvestError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(records = results.len(), output = %path.display(), "results written");
    Ok(results)
}

/// Synchronous wrapper around [`scrape`].
///
/// Creates a temporary tokio runtime internally.
pub fn scrape_sync(
    portal: &dyn BidPortal,
    config: &ScrapeConfig,
) -> Result<Vec<EnrichedBidRecord>, HarvestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| HarvestError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(scrape(portal, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn is_stop_bid(config: &ScrapeConfig, bid: &BidRecord) -> bool {
    config.stop_bid_id.as_deref() == Some(bid.bid_id.as_str())
        || config.stop_bid_number.as_deref() == Some(bid.bid_number.as_str())
}

async fn page_pause(range_ms: (u64, u64)) {
    let (min, max) = range_ms;
    if max == 0 {
        return;
    }
    let ms = if min == max {
        min
    } else {
        rand::rng().random_range(min..=max)
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Download and parse one bid's documents, resolving its district.
///
/// Never fails: every error path degrades to sentinel text on the returned
/// record. All temporary files are removed before returning, success or not.
async fn enrich_bid(
    portal: &dyn BidPortal,
    config: &ScrapeConfig,
    policy: &RetryPolicy,
    district_index: Option<&DistrictIndex>,
    bid: BidRecord,
    index: usize,
) -> EnrichedBidRecord {
    let mut rec = EnrichedBidRecord::new(bid);

    let primary_url = match rec.bid.download_url.clone().filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => {
            rec.matched_city_info = DistrictMatch::sentinel(SENTINEL_NO_PRIMARY_URL);
            return rec;
        }
    };

    let primary_path = config
        .work_dir
        .join(format!("primary_{}_{}.pdf", rec.bid.bid_id, index));
    let addr_path = config
        .work_dir
        .join(format!("addr_{}_{}.pdf", rec.bid.bid_id, index));

    enrich_from_documents(
        portal,
        config,
        policy,
        district_index,
        &mut rec,
        &primary_url,
        &primary_path,
        &addr_path,
    )
    .await;

    remove_temp(&primary_path).await;
    remove_temp(&addr_path).await;
    rec
}

#[allow(clippy::too_many_arguments)]
async fn enrich_from_documents(
    portal: &dyn BidPortal,
    config: &ScrapeConfig,
    policy: &RetryPolicy,
    district_index: Option<&DistrictIndex>,
    rec: &mut EnrichedBidRecord,
    primary_url: &str,
    primary_path: &Path,
    addr_path: &Path,
) {
    if let Err(e) = download_document(portal, primary_url, primary_path, policy).await {
        warn!(bid = %rec.bid.bid_number, error = %e, "primary document download failed");
        rec.matched_city_info = DistrictMatch::sentinel(SENTINEL_PRIMARY_DOWNLOAD_FAILED);
        return;
    }

    // Reverse auctions serve an RA notice as the primary; the standard bid
    // document is linked from inside it. Everything else serves the bid
    // document directly.
    if primary_url.contains("showradocumentPdf") {
        rec.reverse_auction_url = Some(primary_url.to_string());
    } else {
        rec.bid_doc_url = Some(primary_url.to_string());
    }

    let primary = match parse_structure(primary_path).await {
        Ok(structure) => Some(structure),
        Err(e) => {
            warn!(bid = %rec.bid.bid_number, error = %e, "primary document parse failed");
            None
        }
    };

    if let Some(ref structure) = primary {
        for link in &structure.links {
            if link.uri.contains("showbidDocument") {
                if rec.bid_doc_url.is_none() {
                    rec.bid_doc_url = Some(link.uri.clone());
                }
            } else if link.uri.to_lowercase().ends_with(".pdf") {
                rec.extra_docs.insert(doc_slug(&link.uri), link.uri.clone());
            }
        }
    }

    let matched = resolve_district(
        portal,
        policy,
        district_index,
        rec,
        primary.as_ref(),
        primary_url,
        addr_path,
    )
    .await;
    rec.matched_city_info = matched;
}

/// Decide which document to scan for a district and scan it.
///
/// When the standard bid document is the primary itself, its already-parsed
/// structure is reused instead of downloading the same bytes again.
///
/// The returned [`DistrictMatch`] carries the labelled hyperlinks of the
/// document that was actually scanned; when no document could be obtained
/// or parsed, the sentinel outcome carries an empty list.
async fn resolve_district(
    portal: &dyn BidPortal,
    policy: &RetryPolicy,
    district_index: Option<&DistrictIndex>,
    rec: &EnrichedBidRecord,
    primary: Option<&PdfStructure>,
    primary_url: &str,
    addr_path: &Path,
) -> DistrictMatch {
    let index = match district_index {
        Some(index) => index,
        None => return DistrictMatch::sentinel(SENTINEL_DISTRICT_LIST_UNAVAILABLE),
    };

    let bid_doc_url = match rec.bid_doc_url.as_deref() {
        Some(url) => url,
        None => return DistrictMatch::sentinel(SENTINEL_BID_DOC_NOT_FOUND),
    };

    let downloaded;
    let structure = if bid_doc_url == primary_url {
        match primary {
            Some(structure) => structure,
            None => return DistrictMatch::sentinel(SENTINEL_BID_DOC_PARSE_FAILED),
        }
    } else {
        if let Err(e) = download_document(portal, bid_doc_url, addr_path, policy).await {
            warn!(bid = %rec.bid.bid_number, error = %e, "bid document download failed");
            return DistrictMatch::sentinel(SENTINEL_BID_DOC_DOWNLOAD_FAILED);
        }
        match parse_structure(addr_path).await {
            Ok(structure) => {
                downloaded = structure;
                &downloaded
            }
            Err(e) => {
                warn!(bid = %rec.bid.bid_number, error = %e, "bid document parse failed");
                return DistrictMatch::sentinel(SENTINEL_BID_DOC_PARSE_FAILED);
            }
        }
    };

    let matched_city = match index.resolve(structure.lines()) {
        Some(name) => name,
        None => SENTINEL_DISTRICT_NOT_FOUND.to_string(),
    };
    DistrictMatch {
        matched_city,
        hyperlinks: structure.links.clone(),
    }
}

/// Key for `extra_docs`: the link target's filename up to its first dot,
/// slugged.
fn doc_slug(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.split('.').next().unwrap_or(name);
    stem.to_lowercase().replace('-', "_")
}

async fn remove_temp(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "failed to remove temporary file");
        }
    }
}
