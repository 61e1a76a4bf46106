// src/store/artifact.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::data::{Artifact, Resource};
use crate::error::{ServiceError, StoreError};
use crate::file::{read_optional, write_atomic};

/// Header of files written by this cache. Anything else is a raw map.
const MAGIC: &[u8] = b"PFIMAP\x01\n";

/// The single cached map artifact.
pub struct ArtifactCache {
    current: ArcSwapOption<Artifact>,
    path: PathBuf,
    default_name: String,
    default_content_type: String,
    writer: Mutex<()>,
}

impl ArtifactCache {
    pub fn new(path: impl Into<PathBuf>, default_name: &str, default_content_type: &str) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            path: path.into(),
            default_name: s!(default_name),
            default_content_type: s!(default_content_type),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.current.load_full().map(|a| a.retrieved_at)
    }

    pub fn is_populated(&self) -> bool {
        self.current.load().is_some()
    }

    /// Memory first, then disk. `None` means the caller should trigger a fetch.
    pub fn get(&self) -> Option<Arc<Artifact>> {
        if let Some(a) = self.current.load_full() {
            return Some(a);
        }
        match self.load_from_disk() {
            Ok(true) => self.current.load_full(),
            Ok(false) => None,
            Err(e) => {
                logw!("Map: ignoring unreadable cache file: {e}");
                None
            }
        }
    }

    /// Replace the artifact. The new value is live in memory even when the
    /// disk write fails; that failure comes back as `WriteError`.
    pub fn store(
        &self,
        body: Vec<u8>,
        name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Arc<Artifact>, ServiceError> {
        if body.is_empty() {
            return Err(ServiceError::MissingPayload);
        }
        let _w = self.writer.lock();
        let content_type = content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| sniff_content_type(&body).unwrap_or(self.default_content_type.as_str()).to_string());
        let artifact = Arc::new(Artifact {
            name: name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| self.default_name.clone()),
            content_type,
            retrieved_at: Utc::now(),
            body,
        });
        self.current.store(Some(Arc::clone(&artifact)));
        logf!("Map: committed {} ({}, {} bytes)", artifact.name, artifact.content_type, artifact.body.len());

        self.write(&artifact).map_err(|e| {
            loge!("Map: {e}");
            e.into_service(Resource::Artifact)
        })?;
        Ok(artifact)
    }

    fn write(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let encoded = postcard::to_stdvec(artifact)
            .map_err(|e| StoreError::Corrupt { path: self.path.clone(), reason: e.to_string() })?;
        let mut bytes = Vec::with_capacity(MAGIC.len() + encoded.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&encoded);
        write_atomic(&self.path, &bytes).map_err(|source| StoreError::Io { path: self.path.clone(), source })
    }

    /// Load the cache file. A file without our header is taken as the raw map
    /// itself (an operator may drop the PDF in place).
    pub fn load_from_disk(&self) -> Result<bool, StoreError> {
        let _w = self.writer.lock();
        let Some(bytes) = read_optional(&self.path)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?
        else {
            return Ok(false);
        };

        let artifact = match bytes.strip_prefix(MAGIC) {
            Some(encoded) => postcard::from_bytes::<Artifact>(encoded)
                .map_err(|e| StoreError::Corrupt { path: self.path.clone(), reason: e.to_string() })?,
            None => {
                let retrieved_at = std::fs::metadata(&self.path)
                    .and_then(|m| m.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                let content_type = sniff_content_type(&bytes).unwrap_or(self.default_content_type.as_str()).to_string();
                logf!("Map: adopting raw file {} as {}", self.path.display(), content_type);
                Artifact { name: self.default_name.clone(), content_type, retrieved_at, body: bytes }
            }
        };
        if artifact.body.is_empty() {
            return Ok(false);
        }

        logf!("Map: loaded {} ({} bytes) from disk", artifact.name, artifact.body.len());
        self.current.store(Some(Arc::new(artifact)));
        Ok(true)
    }
}

/// Content type from the leading bytes, for the formats the map ships in.
pub fn sniff_content_type(body: &[u8]) -> Option<&'static str> {
    let head = &body[..body.len().min(256)];
    if head.starts_with(b"%PDF") { return Some("application/pdf"); }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") { return Some("image/png"); }
    if head.starts_with(b"\xff\xd8\xff") { return Some("image/jpeg"); }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") { return Some("image/gif"); }
    let text = String::from_utf8_lossy(head);
    if text.trim_start().starts_with("<svg") || (text.trim_start().starts_with("<?xml") && text.contains("<svg")) {
        return Some("image/svg+xml");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(dir: &Path) -> ArtifactCache {
        ArtifactCache::new(dir.join("map.bin"), "rsf-map.pdf", "application/pdf")
    }

    #[test]
    fn missing_everywhere_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let c = cache(dir.path());
        assert!(c.get().is_none());
        assert!(c.last_refreshed().is_none());
    }

    #[test]
    fn store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let c = cache(dir.path());
        let stored = c.store(b"\x89PNG\r\n\x1a\nDATA".to_vec(), Some(s!("map.png")), None).unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(c.last_refreshed(), Some(stored.retrieved_at));

        let again = cache(dir.path());
        let loaded = again.get().unwrap();
        assert_eq!(*loaded, *stored);
    }

    #[test]
    fn empty_body_is_missing_payload() {
        let dir = tempfile::tempdir().unwrap();
        let c = cache(dir.path());
        assert_eq!(c.store(Vec::new(), None, None).unwrap_err(), ServiceError::MissingPayload);
        assert!(!c.is_populated());
    }

    #[test]
    fn raw_file_is_adopted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.bin"), b"%PDF-1.7 fake").unwrap();
        let c = cache(dir.path());
        let a = c.get().unwrap();
        assert_eq!(a.name, "rsf-map.pdf");
        assert_eq!(a.content_type, "application/pdf");
        assert_eq!(a.body, b"%PDF-1.7 fake");
    }

    #[test]
    fn write_failure_keeps_memory_copy() {
        let dir = tempfile::tempdir().unwrap();
        // the data "directory" is a plain file, so the write cannot succeed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let c = ArtifactCache::new(blocker.join("map.bin"), "m", "application/pdf");

        let err = c.store(b"bytes".to_vec(), None, Some(s!("text/plain"))).unwrap_err();
        assert_eq!(err.code(), "WRITE_ERROR");
        let live = c.get().unwrap();
        assert_eq!(live.body, b"bytes");
        assert_eq!(live.content_type, "text/plain");
    }

    #[test]
    fn sniffing() {
        assert_eq!(sniff_content_type(b"<?xml version=\"1.0\"?><svg/>"), Some("image/svg+xml"));
        assert_eq!(sniff_content_type(b"\xff\xd8\xff\xe0"), Some("image/jpeg"));
        assert_eq!(sniff_content_type(b"hello"), None);
    }
}
