//! # ML Model Crate
//!
//! Trains, publishes and periodically refreshes the collaborative-filtering
//! model behind personalized artwork recommendations.
//!
//! ## Components
//!
//! - **traits**: `Trainer` / `RankingModel` seams around the algorithm
//! - **knn**: Item-based k-nearest-neighbours implementation
//! - **registry**: `ModelRegistry`, the single owner of the live model
//! - **builder**: `ModelBuilder::rebuild` with the sufficiency gate
//! - **scheduler**: Background task rebuilding on a fixed interval
//!
//! ## Example Usage
//!
//! ```ignore
//! let registry = Arc::new(ModelRegistry::new());
//! let builder = Arc::new(ModelBuilder::new(store, Arc::new(ItemKnnTrainer::new()), registry.clone()));
//! let (shutdown_tx, handle) = RebuildScheduler::new(builder, DEFAULT_REBUILD_INTERVAL).spawn();
//!
//! if let Some(snapshot) = registry.snapshot() {
//!     let top = snapshot.model.rank(user_id, 40);
//! }
//! ```

pub mod builder;
pub mod error;
pub mod knn;
pub mod registry;
pub mod scheduler;
pub mod traits;

pub use builder::{ModelBuilder, RebuildOutcome, SufficiencyGate};
pub use error::{ModelError, Result};
pub use knn::{ItemKnnModel, ItemKnnTrainer};
pub use registry::{ModelRegistry, ModelSnapshot, TrainingStats};
pub use scheduler::{RebuildScheduler, DEFAULT_REBUILD_INTERVAL};
pub use traits::{RankingModel, ScoredItem, Trainer};
