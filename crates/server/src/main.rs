//! Simple test harness for the recommendation service.
//!
//! Loads the configured data directory, starts the rebuild scheduler and
//! requests both kinds of recommendations for one user.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use data_loader::DataIndex;
use server::{Config, RecommendationService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,server=debug,sources=debug,pipeline=debug,ml_model=debug",
                )
            }),
        )
        .init();

    info!("Starting recommendation service test harness");

    let config = Config::from_env()?;
    info!(data_dir = %config.data_dir.display(), "Loading data index...");
    let data_index = Arc::new(
        DataIndex::load_from_files(&config.data_dir).context("Failed to load data directory")?,
    );
    info!("Data index loaded successfully");

    let service = Arc::new(RecommendationService::from_index(data_index, &config));
    let (shutdown_tx, scheduler) = service.spawn_rebuild_scheduler();

    // The first rebuild fires immediately; give it a moment to publish
    for _ in 0..50 {
        if service.model_generation() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if service.model_generation() == 0 {
        warn!("No model published yet, artworks come from fallback pools only");
    }

    let user_id = 1;
    let page_size = 20;

    let artworks = {
        let service = service.clone();
        tokio::task::spawn_blocking(move || service.get_recommendations(user_id, 0, page_size)).await?
    };
    info!("Received {} artwork recommendations (total {}):", artworks.len(), artworks.total);
    for (i, item) in artworks.items.iter().enumerate() {
        info!(
            "{}. artwork {} - avg score {:.1}, {} views{}",
            i + 1,
            item.id,
            item.average_score,
            item.view_count,
            if item.curated { " [curated]" } else { "" }
        );
    }

    let posts = {
        let service = service.clone();
        tokio::task::spawn_blocking(move || service.get_recommended_posts(user_id, 0, page_size)).await?
    };
    info!("Received {} post recommendations (total {}):", posts.len(), posts.total);
    for (i, post) in posts.items.iter().enumerate() {
        info!(
            "{}. post {} - Score: {:.3} (interest {:.0}, history {:.0}, like {:.0}, hot {:.1}, fresh {:.1}, x{:.1})",
            i + 1,
            post.item.id,
            post.score.total,
            post.score.interest,
            post.score.history,
            post.score.like,
            post.score.hot,
            post.score.freshness,
            post.score.viewed_penalty
        );
    }

    let _ = shutdown_tx.send(());
    scheduler.await?;
    info!("Harness finished");

    Ok(())
}
