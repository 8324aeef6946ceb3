use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::columns;
use crate::settings::Settings;
use crate::enrich;
use crate::fetch::{PageFetcher, PriceScraper};
use crate::sheets::SheetStore;
use crate::table::{tracked_rows, Table};

/// Totals reported after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows: usize,
    pub lookups: usize,
    pub unknown: usize,
}

/// Load → filter → classify → scrape → diff → write.
///
/// Column problems surface before the first product page is requested.
/// Sheet write failures are returned as-is; nothing is retried.
pub async fn run<S, F>(
    store: &S,
    scraper: &mut PriceScraper<F>,
    settings: &Settings,
    max_rows: Option<usize>,
    clock: impl Fn() -> DateTime<Utc>,
) -> Result<RunSummary>
where
    S: SheetStore,
    F: PageFetcher,
{
    let grid = store
        .read_tab(&settings.input_tab)
        .await
        .with_context(|| format!("Failed to load input tab '{}'", settings.input_tab))?;
    let table = Table::from_grid(grid);
    info!("Loaded {} rows from '{}'", table.len(), settings.input_tab);

    let table = tracked_rows(table, settings, max_rows)?;
    info!("{} rows marked '{}'", table.len(), settings.track_status);

    let stores = columns::classify(&table.headers, settings)?;
    info!(
        "Own store '{}', {} competitors: {:?}",
        stores.own,
        stores.competitors.len(),
        stores.competitors
    );

    let lookups = enrich::count_urls(&table, &stores);
    let pb = ProgressBar::new(lookups as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );
    let prices = enrich::collect_prices(&table, &stores, scraper, &pb).await;
    pb.finish_and_clear();

    let unknown = prices
        .iter()
        .flatten()
        .filter(|l| l.is_unknown())
        .count();
    info!(
        "Looked up {} prices, {} unknown ({} cells without a URL)",
        lookups,
        unknown,
        prices.len() * stores.len() - lookups
    );

    let result = enrich::build_result(table, &stores, prices, clock());
    let rows = result.len();
    store
        .write_tab(&settings.output_tab, &result.into_grid())
        .await
        .with_context(|| format!("Failed to write output tab '{}'", settings.output_tab))?;

    Ok(RunSummary {
        rows,
        lookups,
        unknown,
    })
}
