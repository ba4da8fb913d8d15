//! Core job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use datadock_core::SourceId;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job kind for routing to appropriate handlers and for admission checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Tear down a soft-deleted source: drop its external tables and purge
    /// its metadata.
    SourceDelete,
    /// Generic/custom job.
    Custom { kind: String },
}

impl JobKind {
    pub fn custom(kind: impl Into<String>) -> Self {
        Self::Custom { kind: kind.into() }
    }

    pub fn type_name(&self) -> &str {
        match self {
            JobKind::SourceDelete => "source_delete",
            JobKind::Custom { kind } => kind,
        }
    }
}

/// Typed payload carried by [`JobKind::SourceDelete`] jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDeletePayload {
    pub source_id: SourceId,
}

/// Job execution status.
///
/// Jobs enter the registry as `Queued`; every later transition is driven by
/// the external worker engine through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up
    Queued,
    /// Currently being executed
    Running,
    /// Completed successfully
    Completed,
    /// Failed
    Failed { error: String },
    /// Cancelled by user/system
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }

    /// Queued or running jobs count against admission.
    pub fn is_in_flight(&self) -> bool {
        !self.is_terminal()
    }
}

/// Uniqueness key for in-flight deduplication.
///
/// At most one in-flight job per key is admitted by the registry. Derived
/// from the job's kind and its target source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdmissionKey {
    pub kind: String,
    pub resource: String,
}

impl std::fmt::Display for AdmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.resource)
    }
}

/// A unit of asynchronous work tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Job kind for routing
    pub kind: JobKind,
    /// JSON payload
    pub payload: serde_json::Value,
    /// Current status
    pub status: JobStatus,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(kind: JobKind, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            payload,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a queued deletion job for the given source.
    pub fn source_delete(source_id: SourceId) -> Self {
        Self::new(
            JobKind::SourceDelete,
            serde_json::json!(SourceDeletePayload { source_id }),
        )
    }

    /// The target source of a `SourceDelete` job, parsed from the payload.
    ///
    /// `None` for other kinds or when the payload is malformed.
    pub fn source_id(&self) -> Option<SourceId> {
        match self.kind {
            JobKind::SourceDelete => {
                serde_json::from_value::<SourceDeletePayload>(self.payload.clone())
                    .ok()
                    .map(|p| p.source_id)
            }
            _ => None,
        }
    }

    /// The admission key this job occupies while in flight.
    ///
    /// `None` means the job is exempt from deduplication.
    pub fn admission_key(&self) -> Option<AdmissionKey> {
        self.source_id().map(|source_id| AdmissionKey {
            kind: self.kind.type_name().to_string(),
            resource: source_id.to_string(),
        })
    }
}
