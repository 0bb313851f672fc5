//! # Recommendation Service
//!
//! Single entry point wiring the stores, the model lifecycle and both
//! recommendation paths together:
//! - artworks: collaborative filtering with fallback pools ([`HybridComposer`])
//! - posts: multi-signal scoring ([`MultiSignalScorer`])

use crate::composer::HybridComposer;
use crate::config::Config;
use crate::scorer::MultiSignalScorer;
use data_loader::{CatalogView, ContentCatalog, ContentKind, DataIndex, InteractionStore, Item, UserId};
use ml_model::{ItemKnnTrainer, ModelBuilder, ModelRegistry, RebuildOutcome, RebuildScheduler};
use pipeline::{Page, ScoredPost};
use sources::{standard_signals, ContextLimits, FallbackPools, PersonalizedSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub struct RecommendationService {
    registry: Arc<ModelRegistry>,
    builder: Arc<ModelBuilder>,
    composer: HybridComposer,
    scorer: MultiSignalScorer,
    rebuild_interval: Duration,
}

impl RecommendationService {
    /// Wire a service over explicit stores
    ///
    /// # Arguments
    /// * `store` - Ratings, browses, likes and interests
    /// * `artworks` - Catalog served by [`Self::get_recommendations`]
    /// * `posts` - Catalog served by [`Self::get_recommended_posts`]
    /// * `config` - Tuning knobs (see [`Config`])
    pub fn new(
        store: Arc<dyn InteractionStore>,
        artworks: Arc<dyn ContentCatalog>,
        posts: Arc<dyn ContentCatalog>,
        config: &Config,
    ) -> Self {
        let registry = Arc::new(ModelRegistry::new());
        let trainer = ItemKnnTrainer::new().with_neighbors(config.knn_neighbors);
        let builder = Arc::new(ModelBuilder::new(store.clone(), Arc::new(trainer), registry.clone()));

        let personalized = PersonalizedSource::new(registry.clone(), artworks.clone())
            .with_overfetch_factor(config.overfetch_factor);
        let composer = HybridComposer::new(personalized, FallbackPools::new(artworks));

        let signals = standard_signals(posts.clone(), config.signal_cap, config.history_window);
        let scorer = MultiSignalScorer::new(store, posts)
            .with_signals(signals)
            .with_limits(ContextLimits {
                viewed_lookback: config.viewed_lookback,
                exclusion_lookback: config.exclusion_lookback,
                ..ContextLimits::default()
            });

        Self {
            registry,
            builder,
            composer,
            scorer,
            rebuild_interval: config.rebuild_interval(),
        }
    }

    /// Serve both content kinds out of one in-memory index
    pub fn from_index(index: Arc<DataIndex>, config: &Config) -> Self {
        let artworks = Arc::new(CatalogView::new(index.clone(), ContentKind::Artwork));
        let posts = Arc::new(CatalogView::new(index.clone(), ContentKind::Post));
        Self::new(index, artworks, posts, config)
    }

    /// One page of artworks: personalized first, then fallback pools
    pub fn get_recommendations(&self, user_id: UserId, page: usize, page_size: usize) -> Page<Item> {
        self.composer.recommend(user_id, page, page_size)
    }

    /// One page of posts ranked by the multi-signal scorer
    pub fn get_recommended_posts(&self, user_id: UserId, page: usize, page_size: usize) -> Page<ScoredPost> {
        self.scorer.recommend_posts(user_id, page, page_size)
    }

    /// Retrain now on the calling thread
    pub fn rebuild_now(&self) -> RebuildOutcome {
        self.builder.rebuild()
    }

    /// Start the periodic rebuild task; the first rebuild runs immediately
    pub fn spawn_rebuild_scheduler(&self) -> (watch::Sender<()>, JoinHandle<()>) {
        info!(
            interval_hours = self.rebuild_interval.as_secs() / 3600,
            "Spawning model rebuild scheduler"
        );
        RebuildScheduler::new(self.builder.clone(), self.rebuild_interval).spawn()
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn scorer(&self) -> &MultiSignalScorer {
        &self.scorer
    }

    /// Generation of the model currently serving (0 when none)
    pub fn model_generation(&self) -> u64 {
        self.registry.generation()
    }
}
