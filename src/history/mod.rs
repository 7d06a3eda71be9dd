//! Pruning history
//!
//! An append-only sequence of [`RunDataItem`] rows, one per iteration,
//! exportable as a flat table.

pub mod artifacts;
mod item;
mod table;


use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use item::{Deletions, DeletionsPerLayer, RawTensors, RunDataItem};
pub use table::HistoryTable;

/// Rows of a pruning run in iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDataHistory {
    items: Vec<RunDataItem>,
}

impl RunDataHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: RunDataItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&RunDataItem> {
        self.items.last()
    }

    pub fn get(&self, index: usize) -> Option<&RunDataItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunDataItem> {
        self.items.iter()
    }

    pub fn to_table(&self) -> HistoryTable {
        HistoryTable::from_items(&self.items)
    }

    /// Write the flat table as CSV.
    pub fn to_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.to_table().write_csv(writer)
    }

    /// Full rows, including raw tensors, as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.items)?)
    }
}

impl<'a> IntoIterator for &'a RunDataHistory {
    type Item = &'a RunDataItem;
    type IntoIter = std::slice::Iter<'a, RunDataItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
