//! Flat tabular view of the history.

use std::io::Write;

use serde::{Deserialize, Serialize};

use super::item::RunDataItem;
use crate::error::Result;

/// Column-oriented table with one row per iteration.
///
/// Cells are `None` where a row has no value for a column, e.g. attention
/// per-layer counts on a feed-forward-only run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl HistoryTable {
    pub(crate) fn from_items<'a>(items: impl IntoIterator<Item = &'a RunDataItem>) -> Self {
        let flat: Vec<Vec<(String, f64)>> = items.into_iter().map(flatten).collect();

        let mut columns: Vec<String> = Vec::new();
        for row in &flat {
            for (key, _) in row {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = flat
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| row.iter().find(|(k, _)| k == col).map(|(_, v)| *v))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).copied().flatten()
    }

    /// Write as CSV with a header row; missing cells are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn flatten(item: &RunDataItem) -> Vec<(String, f64)> {
    let d = &item.deletions;
    let mut out = vec![
        ("deletions.ff_threshold".to_string(), f64::from(d.ff_threshold)),
        ("deletions.attn_threshold".to_string(), f64::from(d.attn_threshold)),
        ("deletions.ff_del".to_string(), d.ff_del),
        ("deletions.attn_del".to_string(), d.attn_del),
    ];
    for (group, counts) in [("ff", &item.deletions_per_layer.ff), ("attn", &item.deletions_per_layer.attn)] {
        for (layer, &n) in counts.iter().enumerate() {
            out.push((format!("deletions_per_layer.{group}.{layer}"), n as f64));
        }
    }
    if item.ff_exhausted || item.attn_exhausted {
        out.push(("exhausted.ff".to_string(), f64::from(u8::from(item.ff_exhausted))));
        out.push(("exhausted.attn".to_string(), f64::from(u8::from(item.attn_exhausted))));
    }
    out.extend(item.metrics.iter().map(|(k, v)| (k.clone(), *v)));
    out
}
