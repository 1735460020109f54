//! Structural PDF extraction: text lines and labelled hyperlinks.
//!
//! Parsing is CPU-bound, so the public entry point wraps the work in
//! `tokio::task::spawn_blocking`. A document that cannot be opened is an
//! explicit error; a single page whose span extraction fails degrades to an
//! empty page with a warning, so one bad page cannot discard the rest of
//! the document's text or links.
//!
//! ## Label association
//!
//! Portal documents render link tables as `label text …… [link]`. For each
//! Link annotation we look for the first text span (in page scan order)
//! that sits within [`LABEL_VERTICAL_TOLERANCE`] layout units of the link's
//! top edge and ends left of the link's start. If that label contains a
//! document-ish keyword it becomes the link's text; otherwise we fall back
//! to whatever text is visibly inside the link's own rectangle.

use crate::error::ParseError;
use crate::records::{HyperlinkEntry, PageText, PdfStructure};
use pdf_oxide::{AnnotationSubtype, LinkAction, PdfDocument};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Maximum vertical distance between a label span and a link for the span
/// to count as that link's label.
const LABEL_VERTICAL_TOLERANCE: f32 = 10.0;

/// Spans within this vertical distance of each other belong to one visual line.
const LINE_GROUP_TOLERANCE: f32 = 2.0;

/// A label qualifies as the link's text only when it names a document.
const LABEL_KEYWORDS: [&str; 7] = [
    "document",
    "specification",
    "details",
    "file",
    "certificate",
    "drawing",
    "report",
];

/// A text span reduced to what the association rules need.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpanBox {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

/// A link annotation reduced to its URI and bounds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkBox {
    pub uri: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Extract text lines and hyperlinks from a PDF on disk.
pub async fn parse_structure(path: &Path) -> Result<PdfStructure, ParseError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || parse_structure_blocking(&path))
        .await
        .map_err(|e| ParseError::Internal(e.to_string()))?
}

fn parse_structure_blocking(path: &PathBuf) -> Result<PdfStructure, ParseError> {
    let open_err = |e: pdf_oxide::Error| ParseError::Open {
        path: path.clone(),
        detail: e.to_string(),
    };

    let mut doc = PdfDocument::open(path).map_err(open_err)?;
    let page_count = doc.page_count().map_err(open_err)?;

    let mut structure = PdfStructure::default();

    for idx in 0..page_count {
        let page_num = idx + 1;

        let spans: Vec<SpanBox> = match doc.extract_spans(idx) {
            Ok(spans) => spans
                .into_iter()
                .map(|s| SpanBox {
                    x0: s.bbox.x,
                    x1: s.bbox.x + s.bbox.width,
                    top: s.bbox.y,
                    bottom: s.bbox.y + s.bbox.height,
                    text: s.text,
                })
                .collect(),
            Err(e) => {
                warn!(page = page_num, error = %e, "span extraction failed; page treated as empty");
                Vec::new()
            }
        };

        structure.pages.push(PageText {
            page: page_num,
            lines: lines_from_spans(&spans),
        });

        let annotations = match doc.get_annotations(idx) {
            Ok(a) => a,
            Err(e) => {
                warn!(page = page_num, error = %e, "annotation extraction failed");
                Vec::new()
            }
        };

        for ann in annotations {
            if ann.subtype_enum != AnnotationSubtype::Link {
                continue;
            }
            let uri = match ann.action {
                Some(LinkAction::Uri(uri)) if !uri.is_empty() => uri,
                _ => continue,
            };
            let rect = match ann.rect {
                Some(r) => r,
                None => continue,
            };
            let link = LinkBox {
                uri,
                x0: rect[0].min(rect[2]) as f32,
                x1: rect[0].max(rect[2]) as f32,
                top: rect[1].min(rect[3]) as f32,
                bottom: rect[1].max(rect[3]) as f32,
            };

            let text = display_text(label_for_link(&spans, &link), visible_text(&spans, &link));
            structure.links.push(HyperlinkEntry {
                page: page_num,
                uri: link.uri,
                text,
            });
        }
    }

    Ok(structure)
}

/// Group spans into visual lines in encounter order.
///
/// A new line starts whenever a span's top edge drifts more than
/// [`LINE_GROUP_TOLERANCE`] from the current line's anchor. Lines that are
/// empty after trimming are dropped.
pub(crate) fn lines_from_spans(spans: &[SpanBox]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut anchor: Option<f32> = None;

    for span in spans {
        let same_line = anchor.is_some_and(|y| (span.top - y).abs() < LINE_GROUP_TOLERANCE);
        if !same_line {
            push_line(&mut lines, &mut current);
            anchor = Some(span.top);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(span.text.trim());
    }
    push_line(&mut lines, &mut current);
    lines
}

fn push_line(lines: &mut Vec<String>, current: &mut String) {
    let line = std::mem::take(current);
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
}

/// The first span (in page scan order) vertically level with the link and
/// wholly left of it. First qualifying span wins.
pub(crate) fn label_for_link(spans: &[SpanBox], link: &LinkBox) -> Option<String> {
    spans
        .iter()
        .find(|s| (s.top - link.top).abs() < LABEL_VERTICAL_TOLERANCE && s.x1 < link.x0)
        .map(|s| s.text.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Text of the spans overlapping the link's own rectangle.
pub(crate) fn visible_text(spans: &[SpanBox], link: &LinkBox) -> String {
    let mut out = String::new();
    for span in spans {
        let overlaps = span.x0 < link.x1
            && span.x1 > link.x0
            && span.top < link.bottom
            && span.bottom > link.top;
        if overlaps {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(span.text.trim());
        }
    }
    out.trim().to_string()
}

/// A label wins only when it names a document; otherwise the link's own
/// visible text is used.
pub(crate) fn display_text(label: Option<String>, visible: String) -> String {
    if let Some(label) = label {
        let lowered = label.to_lowercase();
        if LABEL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return label;
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, ObjectId};

    fn span(text: &str, x0: f32, x1: f32, top: f32) -> SpanBox {
        SpanBox {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom: top + 12.0,
        }
    }

    fn link(x0: f32, top: f32) -> LinkBox {
        LinkBox {
            uri: "https://portal.test/doc.pdf".into(),
            x0,
            x1: x0 + 80.0,
            top,
            bottom: top + 14.0,
        }
    }

    // ── Line grouping ─────────────────────────────────────────────────────

    #[test]
    fn spans_on_one_baseline_join_into_one_line() {
        let spans = [
            span("Bid", 50.0, 70.0, 100.0),
            span("Number:", 75.0, 120.0, 100.5),
            span("GEM/2025/B/1", 125.0, 220.0, 99.8),
        ];
        assert_eq!(lines_from_spans(&spans), vec!["Bid Number: GEM/2025/B/1"]);
    }

    #[test]
    fn vertical_drift_starts_a_new_line() {
        let spans = [
            span("Ministry of Railways", 50.0, 200.0, 100.0),
            span("District: Pune", 50.0, 160.0, 118.0),
        ];
        assert_eq!(
            lines_from_spans(&spans),
            vec!["Ministry of Railways", "District: Pune"]
        );
    }

    #[test]
    fn whitespace_only_spans_produce_no_lines() {
        let spans = [span("   ", 50.0, 60.0, 100.0), span("", 65.0, 66.0, 130.0)];
        assert!(lines_from_spans(&spans).is_empty());
    }

    // ── Label association ─────────────────────────────────────────────────

    #[test]
    fn label_must_be_level_and_left_of_link() {
        let spans = [
            span("Unrelated heading", 50.0, 180.0, 40.0),
            span("Tender Document", 50.0, 180.0, 101.0),
        ];
        let l = link(300.0, 100.0);
        assert_eq!(label_for_link(&spans, &l).as_deref(), Some("Tender Document"));
    }

    #[test]
    fn first_qualifying_span_wins_over_nearer_ones() {
        // Both qualify; the second is vertically closer but scans later.
        let spans = [
            span("Specification Annex", 50.0, 150.0, 92.0),
            span("Corrigendum File", 50.0, 150.0, 100.0),
        ];
        let l = link(300.0, 100.0);
        assert_eq!(
            label_for_link(&spans, &l).as_deref(),
            Some("Specification Annex")
        );
    }

    #[test]
    fn span_overlapping_link_horizontally_is_not_a_label() {
        let spans = [span("Click here", 290.0, 340.0, 100.0)];
        let l = link(300.0, 100.0);
        assert_eq!(label_for_link(&spans, &l), None);
    }

    #[test]
    fn span_outside_vertical_tolerance_is_not_a_label() {
        let spans = [span("Tender Document", 50.0, 180.0, 115.0)];
        let l = link(300.0, 100.0);
        assert_eq!(label_for_link(&spans, &l), None);
    }

    // ── Display text ──────────────────────────────────────────────────────

    #[test]
    fn keyword_label_overrides_visible_text() {
        let text = display_text(Some("Tender Document".into()), "click".into());
        assert_eq!(text, "Tender Document");
    }

    #[test]
    fn non_keyword_label_falls_back_to_visible_text() {
        let text = display_text(Some("Sr. No. 4".into()), "Download".into());
        assert_eq!(text, "Download");
    }

    #[test]
    fn missing_label_falls_back_to_visible_text() {
        assert_eq!(display_text(None, "Download".into()), "Download");
    }

    #[test]
    fn visible_text_collects_overlapping_spans_only() {
        let l = link(300.0, 100.0);
        let spans = [
            span("Download", 305.0, 360.0, 101.0),
            span("elsewhere", 500.0, 560.0, 101.0),
        ];
        assert_eq!(visible_text(&spans, &l), "Download");
    }

    // ── Whole-document parsing ────────────────────────────────────────────

    /// One-page PDF with a single URI link annotation, no content stream.
    fn pdf_with_uri_link(uri: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();

        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![
                Object::Real(300.0),
                Object::Real(700.0),
                Object::Real(400.0),
                Object::Real(715.0),
            ],
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => Object::Dictionary(dictionary! {
                "Type" => "Action",
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            }),
        });

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => vec![Object::from(annot_id)],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save fixture PDF");
        buf
    }

    #[tokio::test]
    async fn parses_uri_links_from_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.pdf");
        std::fs::write(&path, pdf_with_uri_link("https://portal.test/showbidDocument/42")).unwrap();

        let structure = parse_structure(&path).await.unwrap();
        assert_eq!(structure.links.len(), 1);
        assert_eq!(structure.links[0].page, 1);
        assert_eq!(
            structure.links[0].uri,
            "https://portal.test/showbidDocument/42"
        );
    }

    #[tokio::test]
    async fn parsing_the_same_file_twice_yields_equal_structures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.pdf");
        std::fs::write(&path, pdf_with_uri_link("https://portal.test/docs/boq.pdf")).unwrap();

        let first = parse_structure(&path).await.unwrap();
        let second = parse_structure(&path).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let err = parse_structure(Path::new("/nonexistent/never.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::Open { .. }));
    }

    #[tokio::test]
    async fn garbage_bytes_are_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        let err = parse_structure(&path).await.unwrap_err();
        assert!(matches!(err, ParseError::Open { .. }));
    }
}
