//! Pipeline stages for bid acquisition and enrichment.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ download ──▶ parse ──▶ district
//! (listing) (records)   (PDFs)      (structure) (match)
//! ```
//!
//! 1. [`fetch`]    — pull one listing page with retry/backoff
//! 2. [`extract`]  — turn the raw JSON page into filtered [`crate::records::BidRecord`]s
//! 3. [`download`] — fetch one bid document to disk, cleaning up partials
//! 4. [`parse`]    — extract text lines and labelled hyperlinks from a PDF;
//!    runs in `spawn_blocking` because parsing is CPU-bound
//! 5. [`district`] — resolve a district name from the parsed text
//!
//! [`retry`] holds the shared backoff policy used by `fetch` and `download`.

pub mod district;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod retry;
