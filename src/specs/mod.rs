// src/specs/mod.rs
// What the ranking table looks like: column positions and name resolution.
// Kept as data so a site layout change is a config edit, not a code change.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod countries;

pub use countries::{CountryTable, NameResolver};

/// Zero-based cell index of each field within a data row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnLayout {
    pub name: usize,
    pub rank: usize,
    pub abuse: usize,
    pub situation: usize,
    pub global: usize,
    pub annual_delta: usize,
    pub annual_delta_rank: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            name: 0,
            rank: 1,
            abuse: 2,
            situation: 3,
            global: 4,
            annual_delta: 5,
            annual_delta_rank: 6,
        }
    }
}

impl ColumnLayout {
    /// Cells a row needs before it can hold every field.
    pub fn width(&self) -> usize {
        [
            self.name, self.rank, self.abuse, self.situation,
            self.global, self.annual_delta, self.annual_delta_rank,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Columns + resolver, handed to the table parser.
#[derive(Clone)]
pub struct TableSpec {
    pub columns: ColumnLayout,
    pub resolver: Arc<dyn NameResolver>,
}

impl TableSpec {
    pub fn new(columns: ColumnLayout, aliases: &BTreeMap<String, String>) -> Self {
        Self { columns, resolver: Arc::new(CountryTable::with_aliases(aliases)) }
    }
}

impl Default for TableSpec {
    fn default() -> Self {
        Self { columns: ColumnLayout::default(), resolver: Arc::new(CountryTable::builtin()) }
    }
}

impl std::fmt::Debug for TableSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSpec").field("columns", &self.columns).finish_non_exhaustive()
    }
}
