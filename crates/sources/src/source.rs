//! Source entity: an external database registered under a base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use datadock_core::{BaseId, SourceId};

/// Connector family backing a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    Postgres,
    Mysql,
    Sqlite,
}

/// Deletion lifecycle of a source.
///
/// The transition to `SoftDeleted` is one-way here; physical cleanup is the
/// deletion job's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionState {
    Active,
    SoftDeleted,
}

/// A registered source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    /// Owning base. Grouping only; no referential integrity is enforced.
    pub base_id: BaseId,
    /// Human-readable name shown in base settings.
    pub alias: String,
    pub connector: Connector,
    pub deletion_state: DeletionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Register a new active source.
    pub fn new(base_id: BaseId, alias: impl Into<String>, connector: Connector) -> Self {
        let now = Utc::now();
        Self {
            id: SourceId::new(),
            base_id,
            alias: alias.into(),
            connector,
            deletion_state: DeletionState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_state == DeletionState::SoftDeleted
    }

    /// Mark the source soft-deleted, hiding it from normal lookups.
    pub fn soft_delete(&mut self) {
        self.deletion_state = DeletionState::SoftDeleted;
        self.updated_at = Utc::now();
    }
}
