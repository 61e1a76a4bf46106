// src/data.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `annual_delta_rank_position` of a country that was not ranked the year before.
pub const NEW_ENTRY_RANK_DELTA: i32 = i32::MIN;

/// One ranking entry for a single country and year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: String,
    pub year: u32,
    pub rank_position: u32,
    pub abuse_score: f64,
    pub situation_score: f64,
    pub global_score: f64,
    pub annual_delta: f64,
    pub annual_delta_rank_position: i32,
}

impl Record {
    pub fn is_new_entry(&self) -> bool {
        self.annual_delta_rank_position == NEW_ENTRY_RANK_DELTA
    }

    /// Field-level invariants; snapshot-level ones live in the record store.
    pub fn is_valid(&self) -> bool {
        !self.key.is_empty()
            && self.year > 0
            && self.rank_position > 0
            && [self.abuse_score, self.situation_score, self.global_score, self.annual_delta]
                .iter()
                .all(|v| v.is_finite())
    }

    /// Flat row for CSV/TSV export.
    pub fn to_row(&self) -> Vec<String> {
        let delta_rank = if self.is_new_entry() { s!("new") } else { self.annual_delta_rank_position.to_string() };
        vec![
            self.key.clone(),
            self.year.to_string(),
            self.rank_position.to_string(),
            self.abuse_score.to_string(),
            self.situation_score.to_string(),
            self.global_score.to_string(),
            format!("{:+}", self.annual_delta),
            delta_rank,
        ]
    }

    pub fn headers() -> Vec<String> {
        ["Key", "Year", "Rank", "Abuse", "Situation", "Global", "Delta", "Delta rank"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// The binary resource cached next to the records (the index map).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    pub content_type: String,
    pub retrieved_at: DateTime<Utc>,
    pub body: Vec<u8>,
}

/// The two independently refreshed datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Records,
    Artifact,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Records, Resource::Artifact];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Records => "records",
            Resource::Artifact => "artifact",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
