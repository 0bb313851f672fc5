//! Server crate for the artwork and post recommendation engine.
//!
//! This crate wires candidate sources, the model lifecycle and the result
//! pipeline into the two public recommendation paths.

pub mod composer;
pub mod config;
pub mod scorer;
pub mod service;

pub use composer::{HybridComposer, QuotaPolicy};
pub use config::Config;
pub use scorer::MultiSignalScorer;
pub use service::RecommendationService;
