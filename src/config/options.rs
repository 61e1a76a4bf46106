// src/config/options.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::consts::*;
use crate::specs::ColumnLayout;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
    #[error("invalid {which} url '{value}': {source}")]
    Url { which: &'static str, value: String, source: url::ParseError },
}

/// Everything the service reads at startup. Missing keys fall back to `Default`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceOptions {
    pub table_url: String,
    pub map_url: String,
    pub data_dir: PathBuf,
    /// Edition year stamped on parsed records; detected from the page when unset.
    pub year: Option<u32>,
    pub fetch_timeout_secs: u64,
    /// Re-fetch a resource once its snapshot is older than this. Off when unset.
    pub max_age_secs: Option<u64>,
    pub refresh_on_start: bool,
    pub map_name: String,
    pub map_content_type: String,
    pub columns: ColumnLayout,
    /// Extra display-name → key pairs on top of the built-in country table.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            table_url: s!(DEFAULT_TABLE_URL),
            map_url: s!(DEFAULT_MAP_URL),
            data_dir: PathBuf::from(STORE_DIR),
            year: None,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            max_age_secs: None,
            refresh_on_start: false,
            map_name: s!(DEFAULT_MAP_NAME),
            map_content_type: s!(DEFAULT_MAP_CONTENT_TYPE),
            columns: ColumnLayout::default(),
            aliases: BTreeMap::new(),
        }
    }
}

/// Validated outbound fetch targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUrls {
    pub table: Url,
    pub map: Url,
}

impl ServiceOptions {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Parse both source URLs. The only failure allowed to stop startup.
    pub fn validate(&self) -> Result<SourceUrls, ConfigError> {
        Ok(SourceUrls {
            table: parse_source_url("table", &self.table_url)?,
            map: parse_source_url("map", &self.map_url)?,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(RECORDS_FILE)
    }

    pub fn map_path(&self) -> PathBuf {
        self.data_dir.join(MAP_FILE)
    }
}

fn parse_source_url(which: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let full = if raw.contains("://") { s!(raw) } else { join!("https://", raw) };
    let url = Url::parse(&full)
        .map_err(|source| ConfigError::Url { which, value: s!(raw), source })?;
    if url.host_str().is_none() {
        return Err(ConfigError::Url { which, value: s!(raw), source: url::ParseError::EmptyHost });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_optional() {
        let opts = ServiceOptions::default();
        let urls = opts.validate().unwrap();
        assert_eq!(urls.table.scheme(), "https");
        assert_eq!(urls.table.host_str(), Some("rsf.org"));

        let opts = ServiceOptions { table_url: s!("http://localhost:8080/index"), ..Default::default() };
        assert_eq!(opts.validate().unwrap().table.as_str(), "http://localhost:8080/index");
    }

    #[test]
    fn garbage_url_is_fatal() {
        let opts = ServiceOptions { table_url: s!("http://[::1"), ..Default::default() };
        assert!(matches!(opts.validate(), Err(ConfigError::Url { which: "table", .. })));

        let opts = ServiceOptions { map_url: s!(""), ..Default::default() };
        assert!(matches!(opts.validate(), Err(ConfigError::Url { which: "map", .. })));
    }

    #[test]
    fn toml_overrides_defaults() {
        let text = r#"
            table_url = "example.org/ranking"
            year = 2024
            max_age_secs = 3600

            [columns]
            name = 1
            rank = 0

            [aliases]
            "Turkiye" = "TR"
        "#;
        let opts = ServiceOptions::from_toml(text).unwrap();
        assert_eq!(opts.table_url, "example.org/ranking");
        assert_eq!(opts.year, Some(2024));
        assert_eq!(opts.max_age(), Some(Duration::from_secs(3600)));
        assert_eq!(opts.columns.name, 1);
        assert_eq!(opts.columns.rank, 0);
        assert_eq!(opts.columns.global, ColumnLayout::default().global);
        assert_eq!(opts.aliases.get("Turkiye").map(String::as_str), Some("TR"));
        assert_eq!(opts.map_name, DEFAULT_MAP_NAME);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ServiceOptions::from_toml("tabel_url = \"x\"").is_err());
    }
}
