use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use post_pulse::config::AnalyticsConfig;
use post_pulse::engine::AnalyticsEngine;
use post_pulse::ingest::RawSample;
use post_pulse::recommend::{RecommendationItem, ThresholdType};
use post_pulse::store::MemoryStore;
use post_pulse::synthetic::generate_synthetic_channel;
use post_pulse::{format_float, format_number, format_signed_percent};

#[derive(Parser)]
#[command(name = "post-pulse", about = "Post performance analytics")]
struct Cli {
    /// Path to the TOML config (defaults to $ANALYTICS_CONFIG_PATH or config/analytics.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a JSON array of raw samples for one item.
    Ingest(IngestArgs),
    /// Compute aggregates for items that have telemetry but none yet.
    Backfill,
    Recommend(RecommendArgs),
    Series(SeriesArgs),
    /// Fill the store with a synthetic channel history.
    Seed(SeedArgs),
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct IngestArgs {
    #[arg(long)]
    item: String,
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct RecommendArgs {
    #[arg(long, default_value = "views")]
    threshold_type: String,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct SeriesArgs {
    #[arg(long)]
    item: String,
    /// Cut the curve after its growth plateau, as charts show it.
    #[arg(long)]
    trim: bool,
}

#[derive(Args, Debug, Clone)]
struct SeedArgs {
    #[arg(long, default_value_t = 40)]
    posts: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/analytics.toml")]
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = AnalyticsConfig::load(cli.config).map_err(|err| err.to_string())?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    if let Command::InitConfig(args) = &cli.command {
        config.write(&args.path).map_err(|err| err.to_string())?;
        println!("Wrote {}", args.path.display());
        return Ok(());
    }

    let store = MemoryStore::load(config.store.path.clone())
        .await
        .map_err(|err| format!("failed to open store: {}", err))?;
    let engine = AnalyticsEngine::new(store, config);

    match cli.command {
        Command::Ingest(args) => run_ingest(&engine, args).await,
        Command::Backfill => run_backfill(&engine).await,
        Command::Recommend(args) => run_recommend(&engine, args).await,
        Command::Series(args) => run_series(&engine, args).await,
        Command::Seed(args) => run_seed(&engine, args).await,
        Command::InitConfig(_) => Ok(()),
    }
}

async fn run_ingest(engine: &AnalyticsEngine<MemoryStore>, args: IngestArgs) -> Result<(), String> {
    let data = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| format!("failed reading {}: {}", args.file.display(), err))?;
    let batch: Vec<RawSample> =
        serde_json::from_str(&data).map_err(|err| format!("invalid sample batch: {}", err))?;

    let datapoints = engine
        .ingest(&args.item, &batch)
        .await
        .map_err(|err| err.to_string())?;
    println!("Upserted {} datapoints for {}", datapoints.len(), args.item);
    Ok(())
}

async fn run_backfill(engine: &AnalyticsEngine<MemoryStore>) -> Result<(), String> {
    let report = engine
        .backfill_aggregates()
        .await
        .map_err(|err| err.to_string())?;
    println!(
        "Backfill: {} processed | {} succeeded | {} failed",
        report.processed,
        report.succeeded,
        report.failed.len()
    );
    for failure in report.failed {
        println!("- {}: {}", failure.item_id, failure.error);
    }
    Ok(())
}

async fn run_recommend(engine: &AnalyticsEngine<MemoryStore>, args: RecommendArgs) -> Result<(), String> {
    let threshold_type = ThresholdType::parse(&args.threshold_type)
        .ok_or_else(|| format!("invalid threshold type: {}", args.threshold_type))?;
    let recommendations = engine
        .recommend(threshold_type, args.threshold)
        .await
        .map_err(|err| err.to_string())?;

    if args.json {
        let payload = serde_json::to_string_pretty(&recommendations)
            .map_err(|err| format!("failed to serialize recommendations: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }

    println!(
        "Baseline: {} views | {}s engagement | {} active posts",
        format_number(recommendations.baseline_views),
        format_float(recommendations.baseline_engagement, 1),
        recommendations.active_count
    );

    println!("\nConsider removing ({}):", recommendations.consider_removing.len());
    for item in &recommendations.consider_removing {
        print_recommendation(item);
    }
    println!("\nReady to repost ({}):", recommendations.ready_to_repost.len());
    for item in &recommendations.ready_to_repost {
        print_recommendation(item);
    }
    Ok(())
}

fn print_recommendation(item: &RecommendationItem) {
    let plateau = item
        .plateau_days_since_posted
        .map(|days| format!("plateau day {}", days))
        .unwrap_or_else(|| "no plateau".to_string());
    println!(
        "- {} / {} | {} views | {} vs avg | {} days old | {}",
        item.post_id,
        item.media_id,
        format_number(item.total_views as f64),
        format_signed_percent(item.percent_vs_average),
        item.days_since_posted,
        plateau
    );
}

async fn run_series(engine: &AnalyticsEngine<MemoryStore>, args: SeriesArgs) -> Result<(), String> {
    let series = if args.trim {
        engine.display_series(&args.item).await
    } else {
        engine.performance_series(&args.item).await
    }
    .map_err(|err| err.to_string())?;

    for point in series {
        println!(
            "{} day {:>3} | {:>9} views | {:>6}s | {:>5}%",
            point.date,
            point.days_since_post,
            format_number(point.cumulative_views as f64),
            format_float(point.avg_watch_seconds, 1),
            format_float(point.avg_watch_percent, 1)
        );
    }
    Ok(())
}

async fn run_seed(engine: &AnalyticsEngine<MemoryStore>, args: SeedArgs) -> Result<(), String> {
    let platform = engine.config().recommendation.platform.clone();
    let synthetic = generate_synthetic_channel(args.seed, &platform, args.posts, chrono::Utc::now());
    let store = engine.store();

    store
        .insert_channel(synthetic.channel.clone())
        .await
        .map_err(|err| err.to_string())?;
    for post in synthetic.posts {
        store.insert_post(post).await.map_err(|err| err.to_string())?;
    }
    for item in synthetic.items {
        store.insert_item(item).await.map_err(|err| err.to_string())?;
    }
    // oldest first so later posts score against a populated baseline
    for (item_id, batch) in synthetic.batches.iter().rev() {
        engine
            .ingest(item_id, batch)
            .await
            .map_err(|err| err.to_string())?;
    }

    println!(
        "Seeded {} posts on channel {}",
        synthetic.batches.len(),
        synthetic.channel.id
    );
    Ok(())
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
