//! Data model: listing records, enriched output records, and the
//! intermediate PDF structure.
//!
//! [`BidRecord`] is what the listing API yields after extraction and
//! filtering. [`EnrichedBidRecord`] is the persisted shape: the listing
//! fields plus everything harvested from the bid's PDF documents. Failures
//! during enrichment never drop a record; they are encoded as sentinel
//! strings in [`DistrictMatch::matched_city`] so downstream consumers see
//! every bid that passed extraction together with how far it got.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Sentinel values ───────────────────────────────────────────────────────
// `matched_city` is always a string; these stand in for "no district" so the
// output schema never needs a null.

/// Enrichment has not run for this record yet.
pub const SENTINEL_NOT_PROCESSED: &str = "not processed";
/// The listing entry carried no primary document URL.
pub const SENTINEL_NO_PRIMARY_URL: &str = "no primary document url";
/// The primary document could not be downloaded.
pub const SENTINEL_PRIMARY_DOWNLOAD_FAILED: &str = "primary document download failed";
/// No standard bid document link was found in the primary document.
pub const SENTINEL_BID_DOC_NOT_FOUND: &str = "bid document not found";
/// The standard bid document could not be downloaded.
pub const SENTINEL_BID_DOC_DOWNLOAD_FAILED: &str = "bid document download failed";
/// The standard bid document downloaded but could not be parsed.
pub const SENTINEL_BID_DOC_PARSE_FAILED: &str = "bid document parse failed";
/// No reference district list was configured or it failed to load.
pub const SENTINEL_DISTRICT_LIST_UNAVAILABLE: &str = "district list unavailable";
/// The document parsed cleanly but no district token matched.
pub const SENTINEL_DISTRICT_NOT_FOUND: &str = "district not found";

// ── Listing records ───────────────────────────────────────────────────────

/// One bid as extracted from a raw listing page.
///
/// `quantity` keeps whatever JSON value the API sent (number or string);
/// the pipeline never interprets it. `end_date` is guaranteed by the
/// extractor to be a `Z`-suffixed RFC 3339 timestamp in the future at
/// extraction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub bid_id: String,
    pub bid_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Human-facing listing page for this bid, when the number is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_url: Option<String>,
    /// Direct URL of the primary PDF (reverse-auction or standard).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

// ── Enriched records ──────────────────────────────────────────────────────

/// A hyperlink found in a PDF, with its best-effort label.
///
/// `text` is the spatially associated label when that label contains a
/// document-ish keyword, otherwise the link's own visible on-page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperlinkEntry {
    /// 1-indexed page the link appears on.
    pub page: usize,
    pub uri: String,
    pub text: String,
}

/// Outcome of district resolution, plus the hyperlinks that were scanned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictMatch {
    /// Canonically cased district name, or one of the sentinel strings.
    pub matched_city: String,
    pub hyperlinks: Vec<HyperlinkEntry>,
}

impl DistrictMatch {
    /// Fresh state before enrichment runs.
    pub fn not_processed() -> Self {
        DistrictMatch {
            matched_city: SENTINEL_NOT_PROCESSED.to_string(),
            hyperlinks: Vec::new(),
        }
    }

    /// A sentinel outcome with no harvested hyperlinks.
    pub fn sentinel(text: &str) -> Self {
        DistrictMatch {
            matched_city: text.to_string(),
            hyperlinks: Vec::new(),
        }
    }
}

/// The persisted output shape: listing fields plus document-derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBidRecord {
    #[serde(flatten)]
    pub bid: BidRecord,
    /// Primary document URL when the bid is a reverse auction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_auction_url: Option<String>,
    /// URL of the standard bid document (the primary itself, or a link
    /// harvested from the reverse-auction document).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_doc_url: Option<String>,
    /// Other `.pdf` links found in the primary document, keyed by a slug of
    /// the target filename. Later links with the same slug overwrite earlier
    /// ones.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra_docs: BTreeMap<String, String>,
    pub matched_city_info: DistrictMatch,
}

impl EnrichedBidRecord {
    /// Wrap a freshly extracted listing record, enrichment pending.
    pub fn new(bid: BidRecord) -> Self {
        EnrichedBidRecord {
            bid,
            reverse_auction_url: None,
            bid_doc_url: None,
            extra_docs: BTreeMap::new(),
            matched_city_info: DistrictMatch::not_processed(),
        }
    }
}

// ── PDF structure ─────────────────────────────────────────────────────────

/// Text lines of a single page, in reading (encounter) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page: usize,
    pub lines: Vec<String>,
}

/// Everything the parser extracts from one PDF document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfStructure {
    pub pages: Vec<PageText>,
    pub links: Vec<HyperlinkEntry>,
}

impl PdfStructure {
    /// Iterate all text lines across all pages in document order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
    }
}
