use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use tracing::info;

use crate::settings::{ConfigError, Settings};

/// One spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn from_json(v: &serde_json::Value) -> Cell {
        match v {
            serde_json::Value::Null => Cell::Empty,
            serde_json::Value::String(s) if s.is_empty() => Cell::Empty,
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            serde_json::Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
            serde_json::Value::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.into()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    pub fn number(v: Option<f64>) -> Cell {
        v.map(Cell::Number).unwrap_or(Cell::Empty)
    }

    /// Non-blank text, trimmed. Numbers and blanks are not URLs.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(t) => s.serialize_str(t),
            Cell::Number(n) => s.serialize_f64(*n),
            Cell::Empty => s.serialize_str(""),
        }
    }
}

/// Raw rows as they live in a tab, header row first.
pub type Grid = Vec<Vec<Cell>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// First row is the header. Header names are trimmed; every row is
    /// padded or cut to the header width.
    pub fn from_grid(grid: Grid) -> Table {
        let mut iter = grid.into_iter();
        let headers: Vec<String> = iter
            .next()
            .unwrap_or_default()
            .iter()
            .map(|c| c.display().trim().to_string())
            .collect();
        let width = headers.len();
        let rows = iter
            .filter(|r| r.iter().any(|c| *c != Cell::Empty))
            .map(|mut r| {
                r.resize(width, Cell::Empty);
                r
            })
            .collect();
        Table { headers, rows }
    }

    pub fn into_grid(self) -> Grid {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.headers.into_iter().map(Cell::Text).collect());
        grid.extend(self.rows);
        grid
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Keep rows whose status equals the track sentinel (case-insensitive),
/// optionally capped to the first `max_rows`. `Some(0)` means no cap.
pub fn tracked_rows(
    table: Table,
    settings: &Settings,
    max_rows: Option<usize>,
) -> Result<Table, ConfigError> {
    let status_idx = table
        .column(&settings.status_column)
        .ok_or_else(|| ConfigError::MissingColumn(settings.status_column.clone()))?;

    let mut skipped: BTreeMap<String, usize> = BTreeMap::new();
    let mut rows = Vec::new();
    for row in table.rows {
        let status = row[status_idx].display().trim().to_string();
        if status.eq_ignore_ascii_case(&settings.track_status) {
            rows.push(row);
        } else {
            *skipped.entry(status.to_lowercase()).or_default() += 1;
        }
    }

    for (status, n) in &skipped {
        let label = if status.is_empty() { "<blank>" } else { status.as_str() };
        info!("Skipped {} rows with status '{}'", n, label);
    }

    if let Some(max) = max_rows.filter(|m| *m > 0) {
        rows.truncate(max);
    }

    Ok(Table {
        headers: table.headers,
        rows,
    })
}
