// src/runner.rs
// Async front of the service: one task owns the state, requests come in on a
// channel and are answered through a oneshot each.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::consts::TICK_SECS;
use crate::protocol::{Operation, Request, Response};
use crate::router::ScoreService;

struct Envelope {
    request: Request,
    reply: oneshot::Sender<Response>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("service stopped")]
pub struct Stopped;

/// Cheap to clone; the runner exits once every handle is dropped.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    pub async fn call(&self, request: Request) -> Result<Response, Stopped> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Envelope { request, reply }).await.map_err(|_| Stopped)?;
        rx.await.map_err(|_| Stopped)
    }

    pub async fn op(&self, operation: Operation) -> Result<Response, Stopped> {
        self.call(Request::new(operation)).await
    }
}

pub struct RunnerOptions {
    pub tick: Duration,
    pub queue: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { tick: Duration::from_secs(TICK_SECS), queue: 64 }
    }
}

/// Start the service task. Calls `ScoreService::start` before taking requests.
pub fn spawn(service: Arc<ScoreService>, opts: RunnerOptions) -> (ServiceHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(opts.queue.max(1));
    let task = tokio::spawn(run(service, rx, opts.tick));
    (ServiceHandle { tx }, task)
}

async fn run(service: Arc<ScoreService>, mut rx: mpsc::Receiver<Envelope>, tick: Duration) {
    service.start();
    logf!("Runner: ready");

    let mut ticker = time::interval(tick.max(Duration::from_millis(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(envelope) = msg else { break };
                if envelope.request.operation.is_submit() {
                    // parse + fsync; keep them off the loop thread
                    let service = Arc::clone(&service);
                    tokio::task::spawn_blocking(move || answer(&service, envelope));
                } else {
                    answer(&service, envelope);
                }
            }
            _ = ticker.tick() => {
                service.tick();
            }
        }
    }
    logf!("Runner: all handles dropped; stopping");
}

fn answer(service: &ScoreService, Envelope { request, reply }: Envelope) {
    let response = service.handle(request);
    if reply.send(response).is_err() {
        logd!("Runner: caller went away before the reply");
    }
}
