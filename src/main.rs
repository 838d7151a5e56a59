use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use cafe_reviews::config::{AreaCatalog, Settings};
use cafe_reviews::provider::google::GoogleClient;
use cafe_reviews::{aggregate, pipeline, report, snapshot};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "cafe-reviews", about = "Collect and clean cafe reviews from Google Places")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect places and reviews for every area, then write a snapshot
    Run {
        /// Area catalog file (default: settings.areas_path)
        #[arg(short, long)]
        areas: Option<PathBuf>,
        /// Snapshot directory (default: settings.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the configured areas
    Areas {
        #[arg(short, long)]
        areas: Option<PathBuf>,
    },
    /// Summarize the newest snapshot
    Summary {
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Sample reviews to show
        #[arg(short = 'n', long, default_value = "3")]
        samples: usize,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;
    info!(options = ?settings.collect_options(), "settings loaded");

    match cli.command {
        Commands::Run { areas, out } => {
            let t0 = Instant::now();
            let areas_path = areas.unwrap_or_else(|| settings.areas_path.clone());
            let catalog = AreaCatalog::from_file(&areas_path)
                .with_context(|| format!("Failed to load areas from {:?}", areas_path))?;

            let Some(api_key) = settings
                .api_key
                .clone()
                .or_else(|| std::env::var("GOOGLE_MAPS_API_KEY").ok())
                .filter(|k| !k.is_empty())
            else {
                bail!("No API key: set CAFES_API_KEY or GOOGLE_MAPS_API_KEY");
            };
            let client = GoogleClient::with_base_url(
                api_key,
                settings.request_timeout(),
                settings.base_url.clone(),
            )?;

            println!("Collecting cafes for {} areas\n", catalog.len());
            let dataset = pipeline::run(&client, &catalog, &settings.collect_options())?;

            let out_dir = out.unwrap_or_else(|| settings.output_dir.clone());
            let path = snapshot::write_snapshot(&out_dir, &dataset)
                .with_context(|| format!("Failed to write snapshot to {:?}", out_dir))?;

            println!("{}", "=".repeat(50));
            println!("Collection complete in {:.1}s", t0.elapsed().as_secs_f64());
            println!("Total unique cafes: {}", dataset.places.len());
            println!("Total reviews: {}", dataset.reviews.len());
            println!("Duplicates removed: {}", dataset.duplicates_removed);
            if !dataset.failed_places.is_empty() {
                println!("Places with failed review fetch: {}", dataset.failed_places.len());
                for id in &dataset.failed_places {
                    println!("  - {}", id);
                }
            }
            println!("Snapshot: {}", path.display());
            println!("{}\n", "=".repeat(50));
            println!("{}", report::render_markdown(&dataset.summary));
        }
        Commands::Areas { areas } => {
            let areas_path = areas.unwrap_or_else(|| settings.areas_path.clone());
            let catalog = AreaCatalog::from_file(&areas_path)
                .with_context(|| format!("Failed to load areas from {:?}", areas_path))?;
            println!(
                "{:>3} | {:<24} | {:<12} | {:>22} | {:>7}",
                "#", "Area", "Region", "Center", "Radius"
            );
            println!("{}", "-".repeat(80));
            for (i, area) in catalog.areas().iter().enumerate() {
                println!(
                    "{:>3} | {:<24} | {:<12} | {:>22} | {:>6}m",
                    i + 1,
                    area.name,
                    area.region,
                    area.center.to_query(),
                    area.radius_meters
                );
            }
        }
        Commands::Summary { dir, samples } => {
            let dir = dir.unwrap_or_else(|| settings.output_dir.clone());
            let Some(path) = snapshot::latest_snapshot(&dir)? else {
                bail!("No snapshots found in {:?}", dir);
            };
            let snap = snapshot::load_snapshot(&path)?;
            println!(
                "Loaded {} cafes and {} reviews from {}\n",
                snap.places.len(),
                snap.reviews.len(),
                path.display()
            );

            let summary =
                aggregate::summarize(&snap.places, snap.reviews.iter().map(|r| &r.review));
            println!("{}", report::render_markdown(&summary));

            println!("### Sample reviews");
            for row in snap.reviews.iter().take(samples) {
                let r = &row.review;
                let rating = r.rating.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                println!("- {} [{}]: {}", r.place_name, rating, truncate(&r.text_clean, 80));
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
