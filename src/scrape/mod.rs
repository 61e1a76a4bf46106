// src/scrape/mod.rs
mod table;

pub use table::{detect_year, parse_table, split_rows};
