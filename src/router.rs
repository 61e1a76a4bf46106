// src/router.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};

use crate::config::{ConfigError, ServiceOptions};
use crate::data::Resource;
use crate::engine::{Correlation, FetchSink, LaneStatus, Orchestrator, RefreshReason, Trigger};
use crate::error::ServiceError;
use crate::protocol::{ArtifactSummary, DeadLetter, DeadLetterSink, FetchOutcome, Operation, Reply, Request, Response};
use crate::scrape::{detect_year, parse_table};
use crate::specs::TableSpec;
use crate::store::{ArtifactCache, RecordStore};

/// Owns the two stores and the refresh orchestrator; answers every request.
pub struct ScoreService {
    records: RecordStore,
    artifact: ArtifactCache,
    engine: Orchestrator,
    dead_letters: Arc<dyn DeadLetterSink>,
    table: TableSpec,
    year: Option<u32>,
    max_age: Option<Duration>,
    refresh_on_start: bool,
}

impl ScoreService {
    /// Fails only on misconfiguration (bad source URLs).
    pub fn new(
        options: &ServiceOptions,
        fetch_sink: Arc<dyn FetchSink>,
        dead_letters: Arc<dyn DeadLetterSink>,
    ) -> Result<Self, ConfigError> {
        let urls = options.validate()?;
        Ok(Self {
            records: RecordStore::new(options.records_path()),
            artifact: ArtifactCache::new(options.map_path(), &options.map_name, &options.map_content_type),
            engine: Orchestrator::new(urls, fetch_sink, options.fetch_timeout()),
            dead_letters,
            table: TableSpec::new(options.columns.clone(), &options.aliases),
            year: options.year,
            max_age: options.max_age(),
            refresh_on_start: options.refresh_on_start,
        })
    }

    pub fn records(&self) -> &RecordStore { &self.records }
    pub fn artifact(&self) -> &ArtifactCache { &self.artifact }
    pub fn engine(&self) -> &Orchestrator { &self.engine }

    /// Load what is on disk and ask for the table when there is nothing (or
    /// when configured to refresh on start). The map is fetched on first use.
    pub fn start(&self) -> Option<Trigger> {
        match self.records.load_from_disk() {
            Ok(true) => {}
            Ok(false) => logf!("Records: starting empty"),
            Err(e) => loge!("Records: {e}; starting empty"),
        }
        if let Err(e) = self.artifact.load_from_disk() {
            loge!("Map: {e}; will fetch on demand");
        }

        if !self.records.is_populated() || self.refresh_on_start {
            return Some(self.engine.request(Resource::Records, RefreshReason::Startup));
        }
        None
    }

    /// Periodic housekeeping: time out stuck fetches, refresh old snapshots.
    pub fn tick(&self) -> Vec<Trigger> {
        self.engine.sweep_timeouts();
        let Some(max_age) = self.max_age else { return Vec::new() };
        [
            (Resource::Records, self.records.last_refreshed()),
            (Resource::Artifact, self.artifact.last_refreshed()),
        ]
        .into_iter()
        .filter_map(|(resource, last)| self.engine.refresh_if_older(resource, last, max_age))
        .collect()
    }

    pub fn status(&self) -> Vec<LaneStatus> {
        vec![
            self.engine.status(Resource::Records, self.records.last_refreshed()),
            self.engine.status(Resource::Artifact, self.artifact.last_refreshed()),
        ]
    }

    pub fn handle(&self, request: Request) -> Response {
        let operation = s!(request.operation.name());
        if request.operation.is_submit() {
            logf!("[{}] {operation}", request.id);
        } else {
            logd!("[{}] {operation}", request.id);
        }

        let outcome = match request.operation.clone() {
            Operation::GetScore { key } => self.get_score(key.as_deref()),
            Operation::GetIndex => self.get_index(),
            Operation::GetMap => self.get_map(),
            Operation::SubmitFetchedTable { correlation, outcome } => self.submit_table(correlation, outcome),
            Operation::SubmitFetchedArtifact { correlation, outcome, name, content_type } => {
                self.submit_artifact(correlation, outcome, name, content_type)
            }
            Operation::Refresh { resource } => Ok(Reply::Refresh(self.engine.request(resource, RefreshReason::Requested))),
            Operation::Status => Ok(Reply::Status(self.status())),
            Operation::Unsupported { name, .. } => {
                logw!("[{}] unsupported operation '{name}'", request.id);
                self.dead_letters.forward(DeadLetter { request: request.clone(), reason: format!("unsupported operation '{name}'") });
                Err(ServiceError::Unsupported(name))
            }
        };

        if let Err(e) = &outcome {
            logd!("[{}] {operation} -> {}", request.id, e.code());
        }
        Response { request_id: request.id, operation, outcome }
    }

    /* --- Reads --- */

    /// An unpopulated read also queues the fetch that will populate it.
    fn not_ready(&self, resource: Resource) -> ServiceError {
        self.engine.request(resource, RefreshReason::Missing);
        ServiceError::NotReady(resource)
    }

    fn get_score(&self, key: Option<&str>) -> Result<Reply, ServiceError> {
        match self.records.lookup(key) {
            Err(ServiceError::NotReady(r)) => Err(self.not_ready(r)),
            other => other.map(Reply::Score),
        }
    }

    fn get_index(&self) -> Result<Reply, ServiceError> {
        match self.records.list_all() {
            Err(ServiceError::NotReady(r)) => Err(self.not_ready(r)),
            other => other.map(Reply::Index),
        }
    }

    fn get_map(&self) -> Result<Reply, ServiceError> {
        self.artifact.get().map(Reply::Map).ok_or_else(|| self.not_ready(Resource::Artifact))
    }

    /* --- Writes --- */

    fn submit_table(&self, correlation: Option<Correlation>, outcome: FetchOutcome<String>) -> Result<Reply, ServiceError> {
        let raw = match outcome {
            FetchOutcome::Failed(message) => return Err(self.engine.fail(Resource::Records, correlation, &message)),
            FetchOutcome::Body(raw) => Some(raw),
            FetchOutcome::Missing => None,
        };

        self.engine.apply(Resource::Records, correlation, || {
            let raw = raw.ok_or(ServiceError::MissingPayload)?;
            let year = self.year.or_else(|| detect_year(&raw)).unwrap_or_else(|| Utc::now().year() as u32);
            let parsed = parse_table(&raw, year, &self.table)?;
            let snap = self.records.replace_all(parsed)?;
            self.records.persist().map_err(|e| {
                loge!("Records: {e}");
                e.into_service(Resource::Records)
            })?;
            Ok(Reply::Applied { records: snap.record_count(), year: snap.year() })
        })
    }

    fn submit_artifact(
        &self,
        correlation: Option<Correlation>,
        outcome: FetchOutcome<Vec<u8>>,
        name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Reply, ServiceError> {
        let body = match outcome {
            FetchOutcome::Failed(message) => return Err(self.engine.fail(Resource::Artifact, correlation, &message)),
            FetchOutcome::Body(body) => Some(body),
            FetchOutcome::Missing => None,
        };

        self.engine.apply(Resource::Artifact, correlation, || {
            let body = body.ok_or(ServiceError::MissingPayload)?;
            let stored = self.artifact.store(body, name, content_type)?;
            Ok(Reply::MapStored(ArtifactSummary::from(stored.as_ref())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FetchRequest, Phase};
    use crate::protocol::LogDeadLetters;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const TABLE: &str = "Country | Rank | Political | Economic | Score | Diff | Rank diff\n\
                         Norway | 1 | 95.1 | 91.2 | 91.89 | +0.3 | 0\n\
                         France | 12 | 78.5 | 81.2 | 79.8 | +2.1 | -3\n\
                         United States | 55 | 60.1 | 62.0 | 66.59 | -4.5 | +10\n";

    fn service(dir: &std::path::Path) -> (ScoreService, UnboundedReceiver<FetchRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let options = ServiceOptions { data_dir: dir.to_path_buf(), year: Some(2024), ..Default::default() };
        (ScoreService::new(&options, Arc::new(tx), Arc::new(LogDeadLetters)).unwrap(), rx)
    }

    fn call(svc: &ScoreService, op: Operation) -> Response {
        svc.handle(Request::new(op))
    }

    fn submit(text: &str, correlation: Option<Correlation>) -> Operation {
        Operation::SubmitFetchedTable { correlation, outcome: FetchOutcome::Body(s!(text)) }
    }

    #[test]
    fn start_requests_table_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, mut rx) = service(dir.path());
        assert!(matches!(svc.start(), Some(Trigger::Issued(_))));
        assert_eq!(rx.try_recv().unwrap().resource, Resource::Records);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn score_after_submit() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, mut rx) = service(dir.path());

        let r = call(&svc, Operation::GetScore { key: Some(s!("US")) });
        assert_eq!(r.error_code(), Some("NOT_READY"));
        let fetch = rx.try_recv().unwrap();

        let r = call(&svc, submit(TABLE, Some(fetch.correlation)));
        assert_eq!(r.outcome, Ok(Reply::Applied { records: 3, year: 2024 }));

        let Ok(Reply::Score(us)) = call(&svc, Operation::GetScore { key: Some(s!("US")) }).outcome else { panic!() };
        assert_eq!((us.rank_position, us.global_score, us.annual_delta_rank_position), (55, 66.59, 10));
        assert_eq!(svc.engine().phase(Resource::Records), Phase::Idle);
        assert!(svc.records().path().exists());
    }

    #[test]
    fn missing_and_failed_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, _rx) = service(dir.path());

        let r = call(&svc, Operation::SubmitFetchedTable { correlation: None, outcome: FetchOutcome::Missing });
        assert_eq!(r.error_code(), Some("MISSING_PAYLOAD"));
        let r = call(&svc, submit("   ", None));
        assert_eq!(r.error_code(), Some("PARSE_ERROR"));
        let r = call(&svc, Operation::SubmitFetchedArtifact {
            correlation: None,
            outcome: FetchOutcome::Failed(s!("HTTP 500")),
            name: None,
            content_type: None,
        });
        assert_eq!(r.error_code(), Some("FETCH_FAILED"));
        assert!(!svc.records().is_populated());
    }

    #[test]
    fn map_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, mut rx) = service(dir.path());

        assert_eq!(call(&svc, Operation::GetMap).error_code(), Some("NOT_READY"));
        let fetch = rx.try_recv().unwrap();
        assert_eq!(fetch.resource, Resource::Artifact);

        let r = call(&svc, Operation::SubmitFetchedArtifact {
            correlation: Some(fetch.correlation),
            outcome: FetchOutcome::Body(b"%PDF-1.4 map".to_vec()),
            name: None,
            content_type: None,
        });
        let Ok(Reply::MapStored(summary)) = r.outcome else { panic!("{r:?}") };
        assert_eq!((summary.name.as_str(), summary.bytes), ("rsf-map.pdf", 12));

        let Ok(Reply::Map(map)) = call(&svc, Operation::GetMap).outcome else { panic!() };
        assert_eq!(map.content_type, "application/pdf");
    }

    #[test]
    fn tick_refreshes_only_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, mut rx) = service(dir.path());
        call(&svc, submit(TABLE, None));
        assert!(svc.tick().is_empty());
        assert!(rx.try_recv().is_err());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = ServiceOptions {
            data_dir: dir.path().to_path_buf(),
            max_age_secs: Some(0),
            ..Default::default()
        };
        let svc = ScoreService::new(&options, Arc::new(tx), Arc::new(LogDeadLetters)).unwrap();
        svc.start();
        assert!(rx.try_recv().is_err(), "loaded snapshot needs no startup fetch");
        assert_eq!(svc.tick(), vec![Trigger::Issued(rx.try_recv().unwrap().correlation)]);
    }

    #[test]
    fn failed_snapshot_write_still_serves_new_records() {
        let dir = tempfile::tempdir().unwrap();
        // the data "directory" is a plain file, so persisting cannot succeed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let (svc, _rx) = service(&blocker);

        let r = call(&svc, submit(TABLE, None));
        assert_eq!(r.error_code(), Some("WRITE_ERROR"));

        let Ok(Reply::Score(fr)) = call(&svc, Operation::GetScore { key: Some(s!("FR")) }).outcome else { panic!() };
        assert_eq!((fr.rank_position, fr.annual_delta_rank_position), (12, -3));

        let Ok(Reply::Status(lanes)) = call(&svc, Operation::Status).outcome else { panic!() };
        let records = &lanes[0];
        assert_eq!(records.resource, Resource::Records);
        assert_eq!(records.phase, Phase::Idle);
        assert!(records.last_refreshed.is_some());
        assert!(records.last_failure.as_deref().is_some_and(|f| f.contains("could not persist records")));
    }

    #[test]
    fn bad_url_is_fatal() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let options = ServiceOptions { table_url: s!("https://"), ..Default::default() };
        assert!(ScoreService::new(&options, Arc::new(tx), Arc::new(LogDeadLetters)).is_err());
    }
}
