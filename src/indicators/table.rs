// =============================================================================
// Tabular view of indicator and forecast series
// =============================================================================
//
// Rows are plain strings: a formatted date followed by one cell per value.
// Missing values (before an indicator's seed index, or a MACD signal that has
// not started yet) become the configured blank placeholder.

use serde::{Deserialize, Serialize};

use crate::series::{SeriesValue, TimeSeries};
use crate::time_utils::format_timestamp;

pub const DATE_WIDTH: usize = 12;
pub const VALUE_WIDTH: usize = 10;

/// Header and display width of one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    pub width: usize,
}

/// Build the column list for a series: a date column followed by one column
/// per value header.
pub fn columns(value_headers: &[&str]) -> Vec<Column> {
    std::iter::once(Column {
        header: "Date".to_string(),
        width: DATE_WIDTH,
    })
    .chain(value_headers.iter().map(|h| Column {
        header: (*h).to_string(),
        width: VALUE_WIDTH,
    }))
    .collect()
}

fn default_decimals() -> usize {
    2
}

fn default_blank() -> String {
    " ".to_string()
}

/// Formatting options for table rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Digits after the decimal point.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    /// Placeholder written where a timestamp has no value.
    #[serde(default = "default_blank")]
    pub blank: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            blank: default_blank(),
        }
    }
}

fn format_cells(cells: Vec<Option<f64>>, settings: &TableSettings) -> impl Iterator<Item = String> + '_ {
    cells.into_iter().map(move |cell| match cell {
        Some(v) => format!("{v:.prec$}", prec = settings.decimals),
        None => settings.blank.clone(),
    })
}

/// One row per point of `series`.
pub fn rows<V: SeriesValue>(series: &TimeSeries<V>, settings: &TableSettings) -> Vec<Vec<String>> {
    series
        .iter()
        .map(|(ts, value)| {
            std::iter::once(format_timestamp(ts))
                .chain(format_cells(value.cells(), settings))
                .collect()
        })
        .collect()
}

/// One row per entry of `timestamps`, filling `value_columns` blank cells
/// wherever `series` has no point at that timestamp.
pub fn aligned_rows<V: SeriesValue>(
    series: &TimeSeries<V>,
    value_columns: usize,
    timestamps: &[i64],
    settings: &TableSettings,
) -> Vec<Vec<String>> {
    timestamps
        .iter()
        .map(|&ts| {
            let cells = match series.get(ts) {
                Some(value) => value.cells(),
                None => vec![None; value_columns],
            };
            std::iter::once(format_timestamp(ts))
                .chain(format_cells(cells, settings))
                .collect()
        })
        .collect()
}
