// src/config/consts.rs

// Sources (scheme optional; https:// is assumed)
pub const DEFAULT_TABLE_URL: &str = "rsf.org/en/index";
pub const DEFAULT_MAP_URL: &str = "rsf.org/en/index/map";

// Local cache
pub const STORE_DIR: &str = ".store";
pub const RECORDS_FILE: &str = "records.json";
pub const MAP_FILE: &str = "map.bin";
pub const LOG_FILE: &str = "debug.log";

// Map defaults
pub const DEFAULT_MAP_NAME: &str = "rsf-map.pdf";
pub const DEFAULT_MAP_CONTENT_TYPE: &str = "application/pdf";

// Refresh
pub const FETCH_TIMEOUT_SECS: u64 = 120;
pub const TICK_SECS: u64 = 5;

// Index
pub const FIRST_INDEX_YEAR: u32 = 2002;
