// src/store/mod.rs
// Local cache: the committed value of each resource behind an atomic pointer,
// mirrored to one file per resource under the data directory.

mod artifact;
mod records;

pub use artifact::ArtifactCache;
pub use records::{RecordStore, Snapshot};
