use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::TokenSource;
use crate::table::{Cell, Grid};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const MIN_NEW_ROWS: usize = 100;
const MIN_NEW_COLS: usize = 20;

/// Where the tracking table is read from and the results are written to.
pub trait SheetStore {
    /// All values of a tab, header row first.
    async fn read_tab(&self, tab: &str) -> Result<Grid>;
    /// Replace a tab's contents with `grid`, creating the tab if needed.
    async fn write_tab(&self, tab: &str, grid: &Grid) -> Result<()>;
}

/// Sheets API v4 over REST, authenticated as a service account.
pub struct GoogleSheets {
    client: reqwest::Client,
    tokens: TokenSource,
    spreadsheet_id: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

impl GoogleSheets {
    pub fn new(client: reqwest::Client, tokens: TokenSource, spreadsheet_id: &str) -> Self {
        GoogleSheets {
            client,
            tokens,
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Sheets API base cannot be a base URL"))?
            .push(&self.spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    /// `.../spreadsheets/{id}:{method}`; the method suffix is part of the id
    /// path segment.
    fn method_url(&self, range: Option<&str>, method: &str) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)?;
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Sheets API base cannot be a base URL"))?;
            match range {
                Some(r) => {
                    segs.push(&self.spreadsheet_id)
                        .push("values")
                        .push(&format!("{}:{}", r, method));
                }
                None => {
                    segs.push(&format!("{}:{}", self.spreadsheet_id, method));
                }
            }
        }
        Ok(url)
    }

    async fn sheet_properties(&self, tab: &str) -> Result<Option<SheetProperties>> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title,gridProperties)");
        let meta: SpreadsheetMeta = self
            .client
            .get(url)
            .bearer_auth(self.tokens.token().await?)
            .send()
            .await?
            .error_for_status()
            .context("Failed to fetch spreadsheet metadata")?
            .json()
            .await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == tab))
    }

    async fn batch_update(&self, requests: serde_json::Value) -> Result<()> {
        self.client
            .post(self.method_url(None, "batchUpdate")?)
            .bearer_auth(self.tokens.token().await?)
            .json(&json!({ "requests": requests }))
            .send()
            .await?
            .error_for_status()
            .context("Spreadsheet batchUpdate failed")?;
        Ok(())
    }

    /// Make sure `tab` exists and is at least `rows` x `cols`.
    async fn ensure_tab(&self, tab: &str, rows: usize, cols: usize) -> Result<()> {
        match self.sheet_properties(tab).await? {
            None => {
                info!("Creating tab '{}'", tab);
                self.batch_update(json!([{
                    "addSheet": { "properties": {
                        "title": tab,
                        "gridProperties": {
                            "rowCount": rows.max(MIN_NEW_ROWS),
                            "columnCount": cols.max(MIN_NEW_COLS),
                        }
                    }}
                }]))
                .await
            }
            Some(props) => {
                let requests = grow_requests(&props, rows, cols);
                if requests.is_empty() {
                    return Ok(());
                }
                debug!("Growing tab '{}' to fit {}x{}", tab, rows, cols);
                self.batch_update(serde_json::Value::Array(requests)).await
            }
        }
    }
}

impl SheetStore for GoogleSheets {
    async fn read_tab(&self, tab: &str) -> Result<Grid> {
        let mut url = self.url(&["values", &quote_tab(tab)])?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("majorDimension", "ROWS");
        let range: ValueRange = self
            .client
            .get(url)
            .bearer_auth(self.tokens.token().await?)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Failed to read tab '{}'", tab))?
            .json()
            .await
            .with_context(|| format!("Unexpected response reading tab '{}'", tab))?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(Cell::from_json).collect())
            .collect())
    }

    async fn write_tab(&self, tab: &str, grid: &Grid) -> Result<()> {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            bail!("Refusing to write an empty grid to '{}'", tab);
        }
        self.ensure_tab(tab, grid.len(), width).await?;

        let quoted = quote_tab(tab);
        self.client
            .post(self.method_url(Some(&quoted), "clear")?)
            .bearer_auth(self.tokens.token().await?)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Failed to clear tab '{}'", tab))?;

        let target = format!("{}!A1", quoted);
        let mut url = self.url(&["values", &target])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.client
            .put(url)
            .bearer_auth(self.tokens.token().await?)
            .json(&json!({
                "range": target,
                "majorDimension": "ROWS",
                "values": grid,
            }))
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Failed to write tab '{}'", tab))?;

        info!("Wrote {} rows x {} columns to '{}'", grid.len(), width, tab);
        Ok(())
    }
}

/// A1-notation sheet name: wrapped in single quotes, inner quotes doubled.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

fn grow_requests(props: &SheetProperties, rows: usize, cols: usize) -> Vec<serde_json::Value> {
    let mut requests = Vec::new();
    let grid = &props.grid_properties;
    if rows > grid.row_count {
        requests.push(json!({ "appendDimension": {
            "sheetId": props.sheet_id,
            "dimension": "ROWS",
            "length": rows - grid.row_count,
        }}));
    }
    if cols > grid.column_count {
        requests.push(json!({ "appendDimension": {
            "sheetId": props.sheet_id,
            "dimension": "COLUMNS",
            "length": cols - grid.column_count,
        }}));
    }
    requests
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Tabs held in memory; writes replace the whole tab.
    #[derive(Default)]
    pub struct MemorySheets {
        pub tabs: RefCell<HashMap<String, Grid>>,
        pub fail_writes: bool,
    }

    impl MemorySheets {
        pub fn with_tab(self, tab: &str, grid: Grid) -> Self {
            self.tabs.borrow_mut().insert(tab.to_string(), grid);
            self
        }

        pub fn tab(&self, tab: &str) -> Option<Grid> {
            self.tabs.borrow().get(tab).cloned()
        }
    }

    impl SheetStore for MemorySheets {
        async fn read_tab(&self, tab: &str) -> Result<Grid> {
            self.tab(tab)
                .ok_or_else(|| anyhow::anyhow!("Unable to parse range: {}", quote_tab(tab)))
        }

        async fn write_tab(&self, tab: &str, grid: &Grid) -> Result<()> {
            if self.fail_writes {
                bail!("The caller does not have permission");
            }
            self.tabs.borrow_mut().insert(tab.to_string(), grid.clone());
            Ok(())
        }
    }
}
