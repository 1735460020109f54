//! Turn a raw listing page into filtered [`BidRecord`]s.
//!
//! The listing API wraps most document fields in single-element arrays and
//! omits fields freely, so every access here is defensive: a malformed
//! entry is skipped with a debug log, never fatal. Entries are dropped when
//! they lack a bid id, or when their end date is missing, unparseable, or
//! already past — closed bids have no documents worth downloading.
//!
//! The extraction instant is a parameter so the cutoff is deterministic
//! under test.

use crate::records::BidRecord;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Extract future-dated bid records from one raw listing page.
pub fn extract_bids(raw_page: &serde_json::Value, now: DateTime<Utc>, api_base: &str) -> Vec<BidRecord> {
    let docs = match raw_page
        .get("response")
        .and_then(|r| r.get("response"))
        .and_then(|r| r.get("docs"))
        .and_then(|d| d.as_array())
    {
        Some(docs) => docs,
        None => {
            debug!("listing page has no response.response.docs array");
            return Vec::new();
        }
    };

    let mut bids = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Some(bid) = extract_one(doc, now, api_base) {
            bids.push(bid);
        }
    }
    bids
}

fn extract_one(doc: &serde_json::Value, now: DateTime<Utc>, api_base: &str) -> Option<BidRecord> {
    let bid_id = first_str(doc, "b_id")?;

    let end_date = match first_str(doc, "final_end_date_sort") {
        Some(d) if d.ends_with('Z') => d,
        _ => {
            debug!(bid_id, "skipping bid without a UTC end date");
            return None;
        }
    };
    match DateTime::parse_from_rfc3339(&end_date) {
        Ok(end) if end.with_timezone(&Utc) >= now => {}
        Ok(_) => {
            debug!(bid_id, %end_date, "skipping expired bid");
            return None;
        }
        Err(e) => {
            debug!(bid_id, %end_date, error = %e, "skipping bid with unparseable end date");
            return None;
        }
    }

    let bid_number = first_str(doc, "b_bid_number").unwrap_or_default();

    // Reverse auctions are served from a different document endpoint.
    let download_url = if bid_number.contains("/R/") {
        format!("{api_base}/showradocumentPdf/{bid_id}")
    } else {
        format!("{api_base}/showbidDocument/{bid_id}")
    };
    let bid_url = if bid_number.is_empty() {
        None
    } else {
        Some(format!("{api_base}/bidlists?bid_no={bid_number}"))
    };

    Some(BidRecord {
        bid_id,
        bid_number,
        category: first_str(doc, "b_category_name"),
        quantity: first_value(doc, "b_total_quantity"),
        start_date: first_str(doc, "final_start_date_sort"),
        end_date,
        ministry: first_str(doc, "ba_official_details_minName"),
        department: first_str(doc, "ba_official_details_deptName"),
        bid_url,
        download_url: Some(download_url),
    })
}

/// First element when the field is an array, the value itself otherwise.
fn first_value(doc: &serde_json::Value, key: &str) -> Option<serde_json::Value> {
    let v = doc.get(key)?;
    match v {
        serde_json::Value::Array(items) => items.first().cloned(),
        other => Some(other.clone()),
    }
}

fn first_str(doc: &serde_json::Value, key: &str) -> Option<String> {
    match first_value(doc, key)? {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://portal.test";

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn page(docs: serde_json::Value) -> serde_json::Value {
        json!({ "response": { "response": { "docs": docs } } })
    }

    fn doc(id: &str, number: &str, end: &str) -> serde_json::Value {
        json!({
            "b_id": [id],
            "b_bid_number": [number],
            "final_end_date_sort": [end],
            "b_category_name": ["Office Chairs"],
            "b_total_quantity": [40],
            "final_start_date_sort": ["2025-08-01T00:00:00Z"],
            "ba_official_details_minName": ["Ministry of Railways"],
            "ba_official_details_deptName": ["Northern Railway"],
        })
    }

    #[test]
    fn extracts_fields_and_derives_urls() {
        let p = page(json!([doc("101", "GEM/2025/B/55", "2025-09-01T00:00:00Z")]));
        let bids = extract_bids(&p, now(), BASE);
        assert_eq!(bids.len(), 1);
        let b = &bids[0];
        assert_eq!(b.bid_id, "101");
        assert_eq!(b.bid_number, "GEM/2025/B/55");
        assert_eq!(b.category.as_deref(), Some("Office Chairs"));
        assert_eq!(b.quantity, Some(json!(40)));
        assert_eq!(b.ministry.as_deref(), Some("Ministry of Railways"));
        assert_eq!(
            b.download_url.as_deref(),
            Some("https://portal.test/showbidDocument/101")
        );
        assert_eq!(
            b.bid_url.as_deref(),
            Some("https://portal.test/bidlists?bid_no=GEM/2025/B/55")
        );
    }

    #[test]
    fn reverse_auction_numbers_use_ra_endpoint() {
        let p = page(json!([doc("202", "GEM/2025/R/77", "2025-09-01T00:00:00Z")]));
        let bids = extract_bids(&p, now(), BASE);
        assert_eq!(
            bids[0].download_url.as_deref(),
            Some("https://portal.test/showradocumentPdf/202")
        );
    }

    #[test]
    fn never_emits_past_end_dates() {
        let p = page(json!([
            doc("1", "GEM/2025/B/1", "2025-08-01T00:00:00Z"),
            doc("2", "GEM/2025/B/2", "2025-09-01T00:00:00Z"),
            doc("3", "GEM/2025/B/3", "2024-01-01T00:00:00Z"),
        ]));
        let bids = extract_bids(&p, now(), BASE);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].bid_id, "2");
        for b in &bids {
            let end = DateTime::parse_from_rfc3339(&b.end_date).unwrap();
            assert!(end.with_timezone(&Utc) >= now());
        }
    }

    #[test]
    fn skips_non_utc_and_unparseable_end_dates() {
        let p = page(json!([
            doc("1", "GEM/2025/B/1", "2025-09-01T00:00:00+05:30"),
            doc("2", "GEM/2025/B/2", "next tuesdayZ"),
        ]));
        assert!(extract_bids(&p, now(), BASE).is_empty());
    }

    #[test]
    fn skips_docs_without_bid_id() {
        let p = page(json!([
            { "b_bid_number": ["GEM/2025/B/9"], "final_end_date_sort": ["2025-09-01T00:00:00Z"] },
        ]));
        assert!(extract_bids(&p, now(), BASE).is_empty());
    }

    #[test]
    fn unwrapped_scalar_fields_are_accepted() {
        let p = page(json!([{
            "b_id": "303",
            "b_bid_number": "GEM/2025/B/88",
            "final_end_date_sort": "2025-09-01T00:00:00Z",
        }]));
        let bids = extract_bids(&p, now(), BASE);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].bid_id, "303");
        assert!(bids[0].category.is_none());
    }

    #[test]
    fn missing_docs_array_yields_empty() {
        assert!(extract_bids(&json!({}), now(), BASE).is_empty());
        assert!(extract_bids(&json!({ "response": {} }), now(), BASE).is_empty());
    }
}
