// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod specs;

pub mod csv;
pub mod data;
pub mod engine;
pub mod error;
pub mod file;
pub mod protocol;
pub mod router;
pub mod runner;
pub mod scrape;
pub mod store;

pub use config::ServiceOptions;
pub use data::{Artifact, Record, Resource};
pub use error::{ParseError, ServiceError};
pub use protocol::{Operation, Reply, Request, Response};
pub use router::ScoreService;
pub use runner::{ServiceHandle, spawn};
