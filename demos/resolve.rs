//! Example: resolve a Vimeo URL and read the first chunk of its media
//!
//! Usage: cargo run --example resolve <vimeo_url_or_id>

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::Map;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vimeo_scraper::{Containment, ScrapeOverrides, Scraper, ScraperConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vimeo_scraper=info".parse()?))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <vimeo_url_or_id>", args[0]);
        eprintln!("Example: {} https://vimeo.com/76979871", args[0]);
        std::process::exit(1);
    }

    let config = ScraperConfig::load()?;
    let scraper = Scraper::from_config(&config)?;

    // Propagate so failures are printed instead of logged to disk
    let overrides = ScrapeOverrides::new().containment(Containment::Propagate);
    let mut track = scraper
        .resolve(&args[1], &overrides, Map::new())
        .await?
        .context("nothing to resolve")?;

    println!("Title:   {}", track.title().unwrap_or("(untitled)"));
    println!("Video:   {}", track.video_id().map_or_else(|| "-".to_string(), |id| id.to_string()));
    println!("Quality: {}", track.stream.file.quality.as_deref().unwrap_or("-"));
    println!("Stream:  {}", track.stream.url());

    if let Some(handle) = track.stream.handle() {
        println!(
            "Opened:  HTTP {} {} ({} bytes)",
            handle.status,
            handle.content_type.as_deref().unwrap_or("-"),
            handle.content_length.map_or_else(|| "?".to_string(), |n| n.to_string()),
        );
    }

    if let Some(mut body) = track.stream.take_body() {
        if let Some(chunk) = body.next().await.transpose()? {
            println!("First chunk: {} bytes", chunk.len());
        }
    }

    Ok(())
}
