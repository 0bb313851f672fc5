//! Assembly, scoring and pagination of recommendation candidates.
//!
//! This crate provides:
//! - `ResultAssembler` for building a deduplicated list tier by tier
//! - `ScoreBoard` for combining signal hits into ranked, scored posts
//! - `Page` for cutting a result list into offset pages
//!
//! ## Architecture
//! Results are processed in stages:
//! 1. Candidate sources (see the `sources` crate) produce items or hits
//! 2. The assembler (artworks) or score board (posts) merges them into one
//!    ordered list without duplicates
//! 3. The list is sliced into the requested page
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{Page, ScoreBoard};
//!
//! let mut board = ScoreBoard::new();
//! for (kind, hits) in signal_results {
//!     board.add(kind, hits);
//! }
//! let ranked = board.into_ranked(&context, now);
//! let page = Page::slice(ranked, 0, 20);
//! ```

pub mod assembler;
pub mod page;
pub mod scoring;

pub use assembler::ResultAssembler;
pub use page::Page;
pub use scoring::{freshness_score, CandidateScore, ScoreBoard, ScoredPost, VIEWED_PENALTY};
