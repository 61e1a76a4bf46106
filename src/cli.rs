// src/cli.rs
// `pfi`: drive the service from a shell. Ingest commands stand in for the
// network collaborator; read commands print any fetch they had to queue.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::sync::mpsc;

use crate::config::ServiceOptions;
use crate::csv::{Delim, records_to_string};
use crate::data::Resource;
use crate::engine::FetchRequest;
use crate::protocol::{FetchOutcome, LogDeadLetters, Operation, Reply, Response};
use crate::router::ScoreService;
use crate::runner::{self, RunnerOptions, ServiceHandle};

#[derive(Parser, Debug)]
#[command(name = "pfi", version, about = "Press Freedom Index scrape cache")]
pub struct Cli {
    /// TOML options file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides `data_dir` from the config
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// One country by key, e.g. `pfi score US`
    Score { key: String },
    /// The full ranking
    Index {
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        #[arg(long)]
        include_headers: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write the cached map to a file
    Map {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Feed a saved ranking page (HTML or `|` table) into the store
    IngestTable { file: PathBuf },
    /// Feed a downloaded map into the cache
    IngestMap {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Queue a fetch for one resource
    Refresh {
        #[arg(value_enum)]
        resource: Target,
    },
    /// Phase, last refresh and last failure per resource
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Tsv,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Records,
    Map,
}

impl From<Target> for Resource {
    fn from(t: Target) -> Self {
        match t {
            Target::Records => Resource::Records,
            Target::Map => Resource::Artifact,
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut options = match &cli.config {
        Some(path) => ServiceOptions::load(path)?,
        None => ServiceOptions::default(),
    };
    if let Some(dir) = cli.data_dir.clone() {
        options.data_dir = dir;
    }
    let log_path = crate::log::init(&options.data_dir, &cli.log_level)
        .wrap_err_with(|| format!("cannot open log in {}", options.data_dir.display()))?;
    logd!("CLI: logging to {}", log_path.display());

    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel();
    let service = ScoreService::new(&options, Arc::new(fetch_tx), Arc::new(LogDeadLetters))?;
    let (handle, task) = runner::spawn(Arc::new(service), RunnerOptions::default());

    let result = execute(&handle, cli.command).await;

    drop(handle);
    task.await.wrap_err("service task panicked")?;
    print_fetches(&mut fetch_rx);
    result
}

async fn execute(handle: &ServiceHandle, command: Command) -> Result<()> {
    match command {
        Command::Score { key } => {
            let reply = call(handle, Operation::GetScore { key: Some(key) }).await?;
            if let Reply::Score(record) = reply {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Command::Index { format, include_headers, out } => {
            let Reply::Index(records) = call(handle, Operation::GetIndex).await? else { return Ok(()) };
            let text = match format {
                Format::Csv => records_to_string(&records, include_headers, Delim::Csv),
                Format::Tsv => records_to_string(&records, include_headers, Delim::Tsv),
                Format::Json => serde_json::to_string_pretty(&records)? + "\n",
            };
            emit(out.as_deref(), text.as_bytes())?;
        }
        Command::Map { out } => {
            let Reply::Map(map) = call(handle, Operation::GetMap).await? else { return Ok(()) };
            let out = out.unwrap_or_else(|| PathBuf::from(&map.name));
            fs::write(&out, &map.body).wrap_err_with(|| format!("cannot write {}", out.display()))?;
            println!("{} ({}, {} bytes) -> {}", map.name, map.content_type, map.body.len(), out.display());
        }
        Command::IngestTable { file } => {
            let raw = fs::read_to_string(&file).wrap_err_with(|| format!("cannot read {}", file.display()))?;
            let op = Operation::SubmitFetchedTable { correlation: None, outcome: FetchOutcome::Body(raw) };
            if let Reply::Applied { records, year } = call(handle, op).await? {
                println!("{records} records for {year}");
            }
        }
        Command::IngestMap { file, name, content_type } => {
            let body = fs::read(&file).wrap_err_with(|| format!("cannot read {}", file.display()))?;
            let name = name.or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()));
            let op = Operation::SubmitFetchedArtifact { correlation: None, outcome: FetchOutcome::Body(body), name, content_type };
            if let Reply::MapStored(summary) = call(handle, op).await? {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Command::Refresh { resource } => {
            let reply = call(handle, Operation::Refresh { resource: resource.into() }).await?;
            println!("{reply:?}");
        }
        Command::Status => {
            if let Reply::Status(lanes) = call(handle, Operation::Status).await? {
                println!("{}", serde_json::to_string_pretty(&lanes)?);
            }
        }
    }
    Ok(())
}

async fn call(handle: &ServiceHandle, operation: Operation) -> Result<Reply> {
    let Response { outcome, .. } = handle.op(operation).await?;
    outcome.map_err(|e| eyre!("{}: {e}", e.code()))
}

fn emit(out: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => fs::write(path, bytes).wrap_err_with(|| format!("cannot write {}", path.display())),
        None => io::stdout().write_all(bytes).wrap_err("stdout"),
    }
}

fn print_fetches(rx: &mut mpsc::UnboundedReceiver<FetchRequest>) {
    while let Ok(FetchRequest { correlation, resource, url }) = rx.try_recv() {
        eprintln!("queued fetch {correlation}: {resource} <- {url}");
    }
}
