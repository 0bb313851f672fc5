//! # Sources Crate
//!
//! Candidate generation for artwork and post recommendations.
//!
//! ## Components
//!
//! ### Personalized Source
//! Reads the currently published ranking model:
//! - "Items similar to what you rated highly"
//! - Over-fetches 1.5-2x so filtering never under-fills a page
//!
//! ### Fallback Pools
//! Non-personalized top-up for sparse or cold users:
//! - Curated: editorial picks, most recently updated first
//! - Popular: highest average score, then most viewed
//! - Recent: newest first
//!
//! ### Signals
//! Five bounded generators feeding the post scorer: interest, history,
//! like, hot and recent. Each reads a [`UserContext`] built once per
//! request and returns at most 50 hits.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{build_user_context, standard_signals, ContextLimits, PersonalizedSource};
//!
//! let context = build_user_context(store.as_ref(), user_id, ContextLimits::default())?;
//! for signal in standard_signals(posts.clone(), 50, 10) {
//!     let hits = signal.generate(&context, chrono::Utc::now())?;
//! }
//!
//! let personalized = PersonalizedSource::new(registry, artworks);
//! let items = personalized.candidates(user_id, 20)?;
//! ```

pub mod fallback;
pub mod personalized;
pub mod signals;
pub mod types;
pub mod user_context;

pub use fallback::FallbackPools;
pub use personalized::PersonalizedSource;
pub use signals::{
    standard_signals, HistorySignal, HotSignal, InterestSignal, LikeSignal, RecentSignal, Signal,
    DEFAULT_HISTORY_WINDOW, DEFAULT_SIGNAL_CAP,
};
pub use types::{CandidateSource, SignalHit, SignalKind, UserContext};
pub use user_context::{build_user_context, ContextLimits};
