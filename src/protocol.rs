// src/protocol.rs
// Typed request/response shapes exchanged with the service.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::data::{Artifact, Record, Resource};
use crate::engine::{Correlation, LaneStatus, Trigger};
use crate::error::{ErrorPayload, ServiceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the network collaborator came back with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    Body(T),
    Failed(String),
    /// Nothing attached.
    #[default]
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    GetScore {
        #[serde(default)]
        key: Option<String>,
    },
    GetIndex,
    GetMap,
    SubmitFetchedTable {
        #[serde(default)]
        correlation: Option<Correlation>,
        #[serde(default)]
        outcome: FetchOutcome<String>,
    },
    SubmitFetchedArtifact {
        #[serde(default)]
        correlation: Option<Correlation>,
        #[serde(default)]
        outcome: FetchOutcome<Vec<u8>>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        content_type: Option<String>,
    },
    Refresh {
        resource: Resource,
    },
    Status,
    /// Anything we do not recognise; answered with `UNSUPPORTED_OPERATION`
    /// and forwarded whole to the dead-letter sink.
    #[serde(skip_deserializing)]
    Unsupported {
        name: String,
        #[serde(default)]
        args: serde_json::Value,
    },
}

impl Operation {
    pub const NAMES: [&'static str; 7] = [
        "get-score",
        "get-index",
        "get-map",
        "submit-fetched-table",
        "submit-fetched-artifact",
        "refresh",
        "status",
    ];

    pub fn name(&self) -> &str {
        match self {
            Operation::GetScore { .. } => "get-score",
            Operation::GetIndex => "get-index",
            Operation::GetMap => "get-map",
            Operation::SubmitFetchedTable { .. } => "submit-fetched-table",
            Operation::SubmitFetchedArtifact { .. } => "submit-fetched-artifact",
            Operation::Refresh { .. } => "refresh",
            Operation::Status => "status",
            Operation::Unsupported { name, .. } => name,
        }
    }

    /// String-coded ingress. Unknown names become `Unsupported` carrying their
    /// arguments. A bare scalar fills the single argument of `get-score` (key)
    /// or `refresh` (resource); anything else must be an object.
    pub fn from_name(name: &str, args: serde_json::Value) -> Result<Operation, serde_json::Error> {
        use serde::de::Error as _;
        use serde_json::Value;

        let name = name.trim();
        if !Self::NAMES.contains(&name) {
            return Ok(Operation::Unsupported { name: s!(name), args });
        }
        let mut obj = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            scalar => {
                let field = match name {
                    "get-score" => "key",
                    "refresh" => "resource",
                    _ => return Err(serde_json::Error::custom(format!("'{name}' takes named arguments, got {scalar}"))),
                };
                let mut map = serde_json::Map::new();
                map.insert(s!(field), scalar);
                map
            }
        };
        obj.insert(s!("op"), Value::String(s!(name)));
        serde_json::from_value(Value::Object(obj))
    }

    /// True for writes; used to pick the log level.
    pub fn is_submit(&self) -> bool {
        matches!(self, Operation::SubmitFetchedTable { .. } | Operation::SubmitFetchedArtifact { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub operation: Operation,
}

impl Request {
    pub fn new(operation: Operation) -> Self {
        Self { id: RequestId::new(), operation }
    }
}

/// Map metadata without the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub name: String,
    pub content_type: String,
    pub bytes: usize,
    pub retrieved_at: DateTime<Utc>,
}

impl From<&Artifact> for ArtifactSummary {
    fn from(a: &Artifact) -> Self {
        Self { name: a.name.clone(), content_type: a.content_type.clone(), bytes: a.body.len(), retrieved_at: a.retrieved_at }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Reply {
    Score(Record),
    Index(Vec<Record>),
    Map(Arc<Artifact>),
    /// Records committed by a table submission.
    Applied { records: usize, year: u32 },
    MapStored(ArtifactSummary),
    Refresh(Trigger),
    Status(Vec<LaneStatus>),
}

/// Exactly one per request.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub request_id: RequestId,
    pub operation: String,
    pub outcome: Result<Reply, ServiceError>,
}

/// Wire shape: exactly one of `reply` / `error` is present.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody<'a> {
    request_id: RequestId,
    operation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'a Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorPayload>,
}

impl Serialize for Response {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResponseBody {
            request_id: self.request_id,
            operation: &self.operation,
            reply: self.outcome.as_ref().ok(),
            error: self.outcome.as_ref().err().map(ServiceError::payload),
        }
        .serialize(serializer)
    }
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error_code(&self) -> Option<&'static str> {
        self.outcome.as_ref().err().map(ServiceError::code)
    }
}

/// A request nobody could handle, kept for operator inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeadLetter {
    pub request: Request,
    pub reason: String,
}

pub trait DeadLetterSink: Send + Sync {
    fn forward(&self, letter: DeadLetter);
}

impl DeadLetterSink for UnboundedSender<DeadLetter> {
    fn forward(&self, letter: DeadLetter) {
        if let Err(e) = self.send(letter) {
            logw!("Dead letter dropped for {}: sink closed", e.0.request.id);
        }
    }
}

/// Dead letters that only go to the log.
pub struct LogDeadLetters;

impl DeadLetterSink for LogDeadLetters {
    fn forward(&self, letter: DeadLetter) {
        logw!("Dead letter {}: {}", letter.request.id, letter.reason);
    }
}
