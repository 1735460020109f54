//! Exact-match district resolution over extracted text lines.
//!
//! The reference list is one district name per line; matching is
//! case-insensitive on whole tokens (maximal runs of 3+ ASCII letters, so
//! short noise like "of" or "NR" never matches). The first token in reading
//! order that appears in the list wins and scanning stops entirely.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Maximal runs of 3+ ASCII letters.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{3,}").expect("valid regex"));

/// Loaded reference district list.
///
/// Keys are lowercased tokens; values keep the canonical casing from the
/// file so output is presentable regardless of how the PDF spells the name.
#[derive(Debug, Clone)]
pub struct DistrictIndex {
    by_lower: HashMap<String, String>,
}

impl DistrictIndex {
    /// Load a district list, one name per line. A leading `District` header
    /// row and blank lines are skipped.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(content.lines()))
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut by_lower = HashMap::new();
        for (i, line) in lines.into_iter().enumerate() {
            let name = line.trim();
            if name.is_empty() || (i == 0 && name.eq_ignore_ascii_case("district")) {
                continue;
            }
            by_lower.insert(name.to_lowercase(), name.to_string());
        }
        DistrictIndex { by_lower }
    }

    pub fn len(&self) -> usize {
        self.by_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }

    /// First district mentioned in the lines, in reading order.
    ///
    /// Returns the canonical casing from the reference list. Scanning stops
    /// at the first hit.
    pub fn resolve<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
        for line in lines {
            for token in TOKEN_RE.find_iter(line) {
                let lowered = token.as_str().to_lowercase();
                if let Some(canonical) = self.by_lower.get(&lowered) {
                    debug!(district = %canonical, "district matched");
                    return Some(canonical.clone());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DistrictIndex {
        DistrictIndex::from_lines(["District", "Pune", "Nashik", "Nagpur"])
    }

    #[test]
    fn header_row_is_skipped() {
        let idx = index();
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.resolve(["district of nowhere"]), None);
    }

    #[test]
    fn matches_are_case_insensitive_with_canonical_output() {
        let idx = index();
        assert_eq!(
            idx.resolve(["Consignee location: PUNE, Maharashtra"]),
            Some("Pune".to_string())
        );
    }

    #[test]
    fn first_match_in_reading_order_wins() {
        let idx = index();
        let lines = ["Office address Nashik Road", "Delivery at Pune depot"];
        assert_eq!(idx.resolve(lines), Some("Nashik".to_string()));
    }

    #[test]
    fn reference_list_order_does_not_affect_the_result() {
        let a = DistrictIndex::from_lines(["Pune", "Nashik"]);
        let b = DistrictIndex::from_lines(["Nashik", "Pune"]);
        let lines = ["ship to Nashik then Pune"];
        assert_eq!(a.resolve(lines), b.resolve(lines));
        assert_eq!(a.resolve(lines), Some("Nashik".to_string()));
    }

    #[test]
    fn tokens_shorter_than_three_letters_never_match() {
        let idx = DistrictIndex::from_lines(["Goa"]);
        assert_eq!(idx.resolve(["GOA warehouse"]), Some("Goa".to_string()));
        let two = DistrictIndex::from_lines(["Xy"]);
        assert_eq!(two.resolve(["Xy depot"]), None);
    }

    #[test]
    fn substrings_inside_longer_tokens_do_not_match() {
        let idx = index();
        // "Punekar" tokenises as one 7-letter run, not as "Pune".
        assert_eq!(idx.resolve(["Punekar Industries Ltd"]), None);
    }

    #[test]
    fn digits_split_tokens() {
        let idx = index();
        assert_eq!(idx.resolve(["zone4Pune sector"]), Some("Pune".to_string()));
    }

    #[test]
    fn empty_index_never_matches() {
        let idx = DistrictIndex::from_lines([]);
        assert!(idx.is_empty());
        assert_eq!(idx.resolve(["Pune"]), None);
    }
}
