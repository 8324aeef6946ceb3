mod auth;
mod columns;
mod enrich;
mod fetch;
mod parser;
mod pipeline;
mod price;
mod settings;
mod sheets;
mod table;

use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::auth::{ServiceAccountKey, TokenSource, SHEETS_SCOPE};
use crate::fetch::{HttpFetcher, PriceScraper};
use crate::settings::Settings;
use crate::sheets::GoogleSheets;

#[derive(Parser)]
#[command(
    name = "pricegap",
    about = "Check competitor prices for tracked SKUs and write the gap back to the sheet"
)]
struct Cli {
    /// Only process the first N tracked rows (debug runs)
    #[arg(short = 'n', long = "max")]
    max: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    // Everything that can be checked offline is checked before the first request.
    let settings = Settings::load()?;
    let key_path = settings.credentials_path()?;
    let key = ServiceAccountKey::from_file(&key_path)?;
    info!(
        "Sheet {} ({} -> {}), own store '{}'",
        settings.sheet_id, settings.input_tab, settings.output_tab, settings.own_store
    );

    let api_client = reqwest::Client::builder()
        .build()
        .context("Failed to create Sheets API client")?;
    let tokens = TokenSource::new(key, SHEETS_SCOPE, api_client.clone());
    let store = GoogleSheets::new(api_client, tokens, &settings.sheet_id);
    let mut scraper = PriceScraper::new(HttpFetcher::new(&settings.scrape)?, &settings.scrape);

    let summary =
        pipeline::run(&store, &mut scraper, &settings, cli.max, chrono::Utc::now).await?;

    println!("Updated {} with {} rows.", settings.output_tab, summary.rows);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("Done in {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
