use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::debug;

use crate::columns::StoreColumns;
use crate::fetch::{PageFetcher, PriceScraper};
use crate::price::{price_diff, Lookup, Miss};
use crate::table::{Cell, Table};

pub const DIFF_COLUMN: &str = "PriceDiffVsLowest";
pub const CHECKED_AT_COLUMN: &str = "CheckedAt";
const CHECKED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Per-row lookups, one per store in `StoreColumns::all` order.
pub type RowPrices = Vec<Lookup>;

pub fn price_column(store: &str) -> String {
    format!("{}_price", store)
}

/// Number of cells that will hit the network.
pub fn count_urls(table: &Table, stores: &StoreColumns) -> usize {
    let idx = store_indices(table, stores);
    table
        .rows
        .iter()
        .map(|row| idx.iter().filter(|&&i| row[i].as_url().is_some()).count())
        .sum()
}

/// Look up every store price of every row, one request at a time. Blank
/// URL cells are recorded as unknown without a request.
pub async fn collect_prices<F: PageFetcher>(
    table: &Table,
    stores: &StoreColumns,
    scraper: &mut PriceScraper<F>,
    progress: &ProgressBar,
) -> Vec<RowPrices> {
    let idx = store_indices(table, stores);
    let mut out = Vec::with_capacity(table.len());

    for (r, row) in table.rows.iter().enumerate() {
        let mut prices = Vec::with_capacity(idx.len());
        for (&col, store) in idx.iter().zip(stores.all()) {
            let lookup = match row[col].as_url() {
                Some(url) => {
                    let lookup = scraper.lookup(url).await;
                    progress.inc(1);
                    lookup
                }
                None => Lookup::Unknown(Miss::NoUrl),
            };
            debug!("row {} {}: {:?}", r + 1, store, lookup);
            prices.push(lookup);
        }
        out.push(prices);
    }

    out
}

/// Append `{store}_price` columns, the diff against the cheapest known
/// competitor, and the check timestamp. Unknowns become blank cells.
pub fn build_result(
    table: Table,
    stores: &StoreColumns,
    prices: Vec<RowPrices>,
    checked_at: DateTime<Utc>,
) -> Table {
    let stamp = checked_at.format(CHECKED_AT_FORMAT).to_string();

    let mut headers = table.headers;
    headers.extend(stores.all().map(price_column));
    headers.push(DIFF_COLUMN.to_string());
    headers.push(CHECKED_AT_COLUMN.to_string());

    let rows = table
        .rows
        .into_iter()
        .zip(prices)
        .map(|(mut row, lookups)| {
            let diff = lookups
                .split_first()
                .and_then(|(own, competitors)| price_diff(own, competitors));
            row.extend(lookups.iter().map(|l| Cell::number(l.price().map(|p| p.amount()))));
            row.push(Cell::number(diff));
            row.push(Cell::text(stamp.clone()));
            row
        })
        .collect();

    Table { headers, rows }
}

fn store_indices(table: &Table, stores: &StoreColumns) -> Vec<usize> {
    // Classification ran over these same headers, so every store resolves.
    stores.all().filter_map(|s| table.column(s)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::columns::classify;
    use crate::settings::{ScrapeSettings, Settings};
    use crate::fetch::testing::FakeFetcher;
    use crate::table::Grid;

    fn page(amount: &str) -> String {
        format!(r#"<meta property="product:price:amount" content="{}">"#, amount)
    }

    fn table() -> Table {
        let row = |cells: &[&str]| -> Vec<Cell> {
            cells
                .iter()
                .map(|s| if s.is_empty() { Cell::Empty } else { Cell::text(*s) })
                .collect()
        };
        let grid: Grid = vec![
            row(&["sku_code", "status", "Daily_Bike", "StoreA", "StoreB", "StoreC"]),
            row(&["S-1", "track", "https://own/1", "https://a/1", "https://b/1", "https://c/1"]),
            row(&["S-2", "track", "", "https://a/2", "", "https://c/2"]),
        ];
        Table::from_grid(grid)
    }

    fn make_scraper(fetcher: FakeFetcher) -> PriceScraper<FakeFetcher> {
        let s = ScrapeSettings {
            max_attempts: 3,
            delay_ms: 0,
            ..ScrapeSettings::default()
        };
        PriceScraper::new(fetcher, &s)
    }

    #[tokio::test]
    async fn blank_urls_are_unknown_and_never_fetched() {
        let t = table();
        let stores = classify(&t.headers, &Settings::default()).unwrap();
        let p100 = page("100");
        let fetcher = FakeFetcher::default()
            .respond("https://own/1", vec![Ok((200, p100.as_str()))])
            .respond("https://a/1", vec![Ok((200, p100.as_str()))])
            .respond("https://b/1", vec![Ok((200, p100.as_str()))])
            .respond("https://c/1", vec![Ok((200, p100.as_str()))])
            .respond("https://a/2", vec![Ok((200, p100.as_str()))])
            .respond("https://c/2", vec![Ok((200, p100.as_str()))]);
        let mut scraper = make_scraper(fetcher);

        assert_eq!(count_urls(&t, &stores), 6);
        let prices = collect_prices(&t, &stores, &mut scraper, &ProgressBar::hidden()).await;

        assert_eq!(prices[1][0], Lookup::Unknown(Miss::NoUrl));
        assert_eq!(prices[1][2], Lookup::Unknown(Miss::NoUrl));
        assert_eq!(scraper.fetcher().total_calls(), 6);
    }

    #[tokio::test]
    async fn diff_uses_cheapest_known_competitor() {
        let t = table();
        let stores = classify(&t.headers, &Settings::default()).unwrap();
        let (p100, p120, p90) = (page("100"), page("120"), page("90"));
        let fetcher = FakeFetcher::default()
            .respond("https://own/1", vec![Ok((200, p100.as_str()))])
            .respond("https://a/1", vec![Ok((200, p120.as_str()))])
            .respond("https://b/1", vec![Err("operation timed out")])
            .respond("https://c/1", vec![Ok((200, p90.as_str()))])
            .respond("https://a/2", vec![Ok((200, p120.as_str()))])
            .respond("https://c/2", vec![Ok((200, p90.as_str()))]);
        let mut scraper = make_scraper(fetcher);

        let prices = collect_prices(&t, &stores, &mut scraper, &ProgressBar::hidden()).await;
        assert_eq!(scraper.fetcher().calls_to("https://b/1"), 3);

        let checked_at = Utc.with_ymd_and_hms(2025, 6, 28, 7, 5, 9).unwrap();
        let result = build_result(t, &stores, prices, checked_at);

        assert_eq!(
            &result.headers[6..],
            [
                "Daily_Bike_price",
                "StoreA_price",
                "StoreB_price",
                "StoreC_price",
                "PriceDiffVsLowest",
                "CheckedAt"
            ]
        );
        let first = &result.rows[0];
        assert_eq!(first[6], Cell::Number(100.0));
        assert_eq!(first[7], Cell::Number(120.0));
        assert_eq!(first[8], Cell::Empty);
        assert_eq!(first[9], Cell::Number(90.0));
        assert_eq!(first[10], Cell::Number(10.0));
        assert_eq!(first[11], Cell::text("2025-06-28 07:05:09Z"));

        // Own URL blank, so the diff is unknown even with competitor prices.
        let second = &result.rows[1];
        assert_eq!(second[6], Cell::Empty);
        assert_eq!(second[7], Cell::Number(120.0));
        assert_eq!(second[10], Cell::Empty);
    }

    #[test]
    fn price_column_naming() {
        assert_eq!(price_column("StoreX"), "StoreX_price");
    }
}
