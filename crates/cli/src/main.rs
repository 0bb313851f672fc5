use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{DataIndex, InteractionStore, Item, UserId};
use ml_model::RebuildOutcome;
use pipeline::{Page, ScoredPost};
use server::{Config, RecommendationService};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// ArtRecs - Artwork and Post Recommendation Engine
#[derive(Parser)]
#[command(name = "artrecs")]
#[command(about = "Hybrid artwork and post recommendations from ratings and activity", long_about = None)]
struct Cli {
    /// Directory with the .dat files (overrides ARTRECS_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get artwork recommendations (collaborative filtering + fallback pools)
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: usize,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Get post recommendations (multi-signal scoring)
    Posts {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: usize,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Show the per-signal score breakdown for each post
        #[arg(long)]
        explain: bool,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the ranking model once and report the outcome
    Rebuild,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        /// Benchmark the post scorer instead of the artwork composer
        #[arg(long)]
        posts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    println!("Loading dataset from {}...", config.data_dir.display());
    let start = Instant::now();
    let data_index = Arc::new(
        DataIndex::load_from_files(&config.data_dir).context("Failed to load dataset")?,
    );
    let (items, ratings, browses, likes) = data_index.counts();
    println!(
        "{} Loaded {} items, {} ratings, {} browses, {} likes in {:?}",
        "✓".green(),
        items,
        ratings,
        browses,
        likes,
        start.elapsed()
    );

    let service = Arc::new(RecommendationService::from_index(data_index.clone(), &config));

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            user_id,
            page,
            page_size,
        } => handle_recommend(&service, user_id, page, page_size),
        Commands::Posts {
            user_id,
            page,
            page_size,
            explain,
            json,
        } => handle_posts(&service, user_id, page, page_size, explain, json)?,
        Commands::Rebuild => handle_rebuild(&service)?,
        Commands::Benchmark {
            requests,
            concurrent,
            posts,
        } => handle_benchmark(service, data_index, requests, concurrent, posts).await?,
    }

    Ok(())
}

/// Train a model so the personalized tier has something to serve
fn train(service: &RecommendationService) {
    let outcome = service.rebuild_now();
    print_outcome(&outcome);
}

/// Handle the 'recommend' command
fn handle_recommend(service: &RecommendationService, user_id: UserId, page: usize, page_size: usize) {
    train(service);
    let result = service.get_recommendations(user_id, page, page_size);
    print_artworks(user_id, &result);
}

/// Handle the 'posts' command
fn handle_posts(
    service: &RecommendationService,
    user_id: UserId,
    page: usize,
    page_size: usize,
    explain: bool,
    json: bool,
) -> Result<()> {
    let result = service.get_recommended_posts(user_id, page, page_size);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_posts(user_id, &result, explain);
    }
    Ok(())
}

/// Handle the 'rebuild' command
fn handle_rebuild(service: &RecommendationService) -> Result<()> {
    let outcome = service.rebuild_now();
    print_outcome(&outcome);
    if let RebuildOutcome::Failed { reason } = outcome {
        bail!("Rebuild failed: {}", reason);
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: Arc<RecommendationService>,
    data_index: Arc<DataIndex>,
    requests: usize,
    concurrent: usize,
    posts: bool,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }
    train(&service);

    // Sample from users that actually rated something
    let users: Vec<UserId> = data_index
        .all_ratings()?
        .iter()
        .map(|r| r.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if users.is_empty() {
        bail!("Dataset has no rated users to benchmark with");
    }
    let user_ids: Vec<UserId> = (0..requests)
        .map(|_| users[rand::random::<u32>() as usize % users.len()])
        .collect();

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for user in user_ids {
        let service = service.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let elapsed = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                if posts {
                    service.get_recommended_posts(user, 0, 20);
                } else {
                    service.get_recommendations(user, 0, 20);
                }
                start.elapsed()
            })
            .await?;
            Ok::<Duration, anyhow::Error>(elapsed)
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = wall.elapsed();

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f32 / wall_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Path: {}", if posts { "posts (multi-signal)" } else { "artworks (hybrid)" });
    println!("Wall time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

fn print_outcome(outcome: &RebuildOutcome) {
    match outcome {
        RebuildOutcome::Published {
            generation,
            stats,
            elapsed,
        } => println!(
            "{} Model generation {} trained on {} in {:?}",
            "✓".green(),
            generation,
            stats,
            elapsed
        ),
        RebuildOutcome::Skipped { stats } => println!(
            "{} Not enough data to train ({}), using fallback pools",
            "!".yellow(),
            stats
        ),
        RebuildOutcome::Failed { reason } => println!("{} Rebuild failed: {}", "✗".red(), reason),
    }
}

fn print_page_header<T>(title: &str, user_id: UserId, page: &Page<T>) {
    println!(
        "{}",
        format!(
            "{} for user {} (page {}, {} of {} shown):",
            title,
            user_id,
            page.page,
            page.len(),
            page.total
        )
        .bold()
        .blue()
    );
}

fn describe(item: &Item) -> String {
    let tags = item
        .tags
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "#{} [tags {}] {} views, {} likes, {} comments, created {}",
        item.id,
        if tags.is_empty() { "-".to_string() } else { tags },
        item.view_count,
        item.like_count,
        item.comment_count,
        item.created_at.format("%Y-%m-%d %H:%M")
    )
}

fn print_artworks(user_id: UserId, page: &Page<Item>) {
    print_page_header("Artwork recommendations", user_id, page);
    for (i, item) in page.items.iter().enumerate() {
        let rank = page.offset() + i + 1;
        let curated = if item.curated { " ★".yellow().to_string() } else { String::new() };
        println!(
            "{}. {} avg {:.1}{}",
            rank.to_string().green(),
            describe(item),
            item.average_score,
            curated
        );
    }
}

fn print_posts(user_id: UserId, page: &Page<ScoredPost>, explain: bool) {
    print_page_header("Post recommendations", user_id, page);
    for (i, post) in page.items.iter().enumerate() {
        let rank = page.offset() + i + 1;
        println!(
            "{}. {} - Score: {:.3}",
            rank.to_string().green(),
            describe(&post.item),
            post.score.total
        );
        if explain {
            let s = &post.score;
            println!(
                "   interest {:.1} · history {:.1} · like {:.1} · hot {:.1} · freshness {:.2}{}",
                s.interest,
                s.history,
                s.like,
                s.hot,
                s.freshness,
                if s.viewed_penalty < 1.0 {
                    format!(" · viewed ×{:.1}", s.viewed_penalty).dimmed().to_string()
                } else {
                    String::new()
                }
            );
        }
    }
}
