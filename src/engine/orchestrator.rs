// src/engine/orchestrator.rs
// Per-resource refresh state machine:
//   Idle → FetchInFlight → Applying → Idle
// with Failed as a logged, momentary stop on the way back to Idle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::types::*;
use crate::config::SourceUrls;
use crate::data::Resource;
use crate::error::ServiceError;

struct InFlight {
    correlation: Correlation,
    since: Instant,
}

#[derive(Default)]
struct LaneState {
    in_flight: Option<InFlight>,
    applying: bool,
    last_failure: Option<String>,
    fetches_issued: u64,
}

impl LaneState {
    fn phase(&self) -> Phase {
        if self.applying { Phase::Applying }
        else if self.in_flight.is_some() { Phase::FetchInFlight }
        else { Phase::Idle }
    }

    /// Reject results that belong to a fetch other than the one in flight.
    fn check_result(&self, resource: Resource, correlation: Option<Correlation>) -> Result<(), ServiceError> {
        match (correlation, &self.in_flight) {
            (Some(c), Some(f)) if f.correlation != c => {
                logw!("{resource}: result {c} is stale (waiting for {})", f.correlation);
                Err(ServiceError::StaleResult { resource })
            }
            (Some(c), None) => {
                logd!("{resource}: late result {c} with nothing in flight; applying");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Clear the in-flight marker if this result answers it.
    fn settle(&mut self, correlation: Option<Correlation>) {
        if let (Some(c), Some(f)) = (correlation, &self.in_flight) {
            if f.correlation == c {
                self.in_flight = None;
            }
        }
    }
}

#[derive(Default)]
struct Lane {
    state: Mutex<LaneState>,
    /// Held for the whole apply so writers of one resource never overlap.
    apply: Mutex<()>,
}

/// Decides when to fetch, sends fetch requests, and routes results back.
pub struct Orchestrator {
    records: Lane,
    artifact: Lane,
    urls: SourceUrls,
    sink: Arc<dyn FetchSink>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(urls: SourceUrls, sink: Arc<dyn FetchSink>, timeout: Duration) -> Self {
        Self { records: Lane::default(), artifact: Lane::default(), urls, sink, timeout }
    }

    fn lane(&self, resource: Resource) -> &Lane {
        match resource {
            Resource::Records => &self.records,
            Resource::Artifact => &self.artifact,
        }
    }

    fn url(&self, resource: Resource) -> &url::Url {
        match resource {
            Resource::Records => &self.urls.table,
            Resource::Artifact => &self.urls.map,
        }
    }

    /// Idle → FetchInFlight, unless something for this resource is already running.
    pub fn request(&self, resource: Resource, reason: RefreshReason) -> Trigger {
        let mut st = self.lane(resource).state.lock();

        if st.applying {
            logd!("{resource}: refresh ({reason:?}) coalesced into running apply");
            return Trigger::Coalesced;
        }
        if let Some(f) = &st.in_flight {
            if f.since.elapsed() < self.timeout {
                logd!("{resource}: refresh ({reason:?}) coalesced into fetch {}", f.correlation);
                return Trigger::Coalesced;
            }
            logw!("{resource}: fetch {} timed out after {:?}", f.correlation, self.timeout);
            st.last_failure = Some(format!("fetch {} timed out", f.correlation));
            st.in_flight = None;
        }

        let correlation = Correlation::new();
        let request = FetchRequest { correlation, resource, url: self.url(resource).clone() };
        if let Err(e) = self.sink.submit(request) {
            loge!("{resource}: cannot request fetch: {e}");
            st.last_failure = Some(e.to_string());
            return Trigger::Unavailable;
        }
        st.in_flight = Some(InFlight { correlation, since: Instant::now() });
        st.fetches_issued += 1;
        logf!("{resource}: fetch {correlation} requested ({reason:?}) from {}", self.url(resource));
        Trigger::Issued(correlation)
    }

    /// FetchInFlight → Applying → Idle around `apply_fn`.
    ///
    /// `correlation` is the id echoed by the network collaborator, or `None`
    /// for an unsolicited push. Failures are recorded and handed back; the
    /// lane always ends up Idle (or still waiting on a different fetch).
    pub fn apply<T>(
        &self,
        resource: Resource,
        correlation: Option<Correlation>,
        apply_fn: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let lane = self.lane(resource);
        let _serial = lane.apply.lock();

        {
            let mut st = lane.state.lock();
            st.check_result(resource, correlation)?;
            st.settle(correlation);
            st.applying = true;
        }

        let result = apply_fn();

        let mut st = lane.state.lock();
        st.applying = false;
        match &result {
            Ok(_) => st.last_failure = None,
            Err(e) => {
                logw!("{resource}: apply failed: {e}");
                st.last_failure = Some(e.to_string());
            }
        }
        result
    }

    /// The network collaborator reported an error for a fetch.
    pub fn fail(&self, resource: Resource, correlation: Option<Correlation>, message: &str) -> ServiceError {
        let mut st = self.lane(resource).state.lock();
        if let Err(stale) = st.check_result(resource, correlation) {
            return stale;
        }
        match correlation {
            Some(_) => st.settle(correlation),
            None => st.in_flight = None,
        }
        logw!("{resource}: fetch failed: {message}");
        st.last_failure = Some(s!(message));
        ServiceError::FetchFailed { resource, message: s!(message) }
    }

    /// Force timed-out fetches back to Idle. Returns the resources that were reset.
    pub fn sweep_timeouts(&self) -> Vec<Resource> {
        let mut reset = Vec::new();
        for resource in Resource::ALL {
            let mut st = self.lane(resource).state.lock();
            let expired = st.in_flight.as_ref().is_some_and(|f| f.since.elapsed() >= self.timeout);
            if expired {
                if let Some(f) = st.in_flight.take() {
                    logw!("{resource}: fetch {} timed out after {:?}", f.correlation, self.timeout);
                    st.last_failure = Some(format!("fetch {} timed out", f.correlation));
                }
                reset.push(resource);
            }
        }
        reset
    }

    /// Trigger a refresh when the committed copy is older than `max_age`.
    pub fn refresh_if_older(
        &self,
        resource: Resource,
        last_refreshed: Option<DateTime<Utc>>,
        max_age: Duration,
    ) -> Option<Trigger> {
        let last = last_refreshed?;
        let age = Utc::now().signed_duration_since(last).to_std().unwrap_or(Duration::ZERO);
        if age < max_age {
            return None;
        }
        Some(self.request(resource, RefreshReason::Expired))
    }

    pub fn phase(&self, resource: Resource) -> Phase {
        self.lane(resource).state.lock().phase()
    }

    pub fn status(&self, resource: Resource, last_refreshed: Option<DateTime<Utc>>) -> LaneStatus {
        let st = self.lane(resource).state.lock();
        LaneStatus {
            resource,
            phase: st.phase(),
            in_flight: st.in_flight.as_ref().map(|f| f.correlation),
            last_refreshed,
            last_failure: st.last_failure.clone(),
            fetches_issued: st.fetches_issued,
        }
    }
}
