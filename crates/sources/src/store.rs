//! Source storage abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use datadock_core::{BaseId, SourceId};

use super::source::Source;

/// Source store abstraction.
///
/// Soft-deleted sources are hidden from `get` and `list`; the pending
/// deletion job addresses them through `get_unscoped` and finishes with
/// `remove`.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Register a new source.
    async fn insert(&self, source: Source) -> Result<(), SourceStoreError>;

    /// Get an active source. Soft-deleted sources are invisible here.
    async fn get(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError>;

    /// Get a source regardless of deletion state (cleanup path).
    async fn get_unscoped(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError>;

    /// List the active sources of a base.
    async fn list(&self, base_id: BaseId) -> Result<Vec<Source>, SourceStoreError>;

    /// Transition a source to soft-deleted.
    ///
    /// Strongly consistent: the source is invisible to `get`/`list` as soon
    /// as this returns.
    async fn soft_delete(&self, source_id: SourceId) -> Result<(), SourceStoreError>;

    /// Physically remove a source record (the deletion job's final step).
    async fn remove(&self, source_id: SourceId) -> Result<(), SourceStoreError>;
}

/// Source store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceStoreError {
    #[error("source not found: {0}")]
    NotFound(SourceId),
    #[error("source already exists: {0}")]
    AlreadyExists(SourceId),
    #[error("source already soft-deleted: {0}")]
    AlreadyDeleted(SourceId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
impl<S> SourceStore for Arc<S>
where
    S: SourceStore + ?Sized,
{
    async fn insert(&self, source: Source) -> Result<(), SourceStoreError> {
        (**self).insert(source).await
    }

    async fn get(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError> {
        (**self).get(source_id).await
    }

    async fn get_unscoped(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError> {
        (**self).get_unscoped(source_id).await
    }

    async fn list(&self, base_id: BaseId) -> Result<Vec<Source>, SourceStoreError> {
        (**self).list(base_id).await
    }

    async fn soft_delete(&self, source_id: SourceId) -> Result<(), SourceStoreError> {
        (**self).soft_delete(source_id).await
    }

    async fn remove(&self, source_id: SourceId) -> Result<(), SourceStoreError> {
        (**self).remove(source_id).await
    }
}

/// In-memory source store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySourceStore {
    sources: RwLock<HashMap<SourceId, Source>>,
}

impl InMemorySourceStore {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn insert(&self, source: Source) -> Result<(), SourceStoreError> {
        let mut sources = self.sources.write().await;
        if sources.contains_key(&source.id) {
            return Err(SourceStoreError::AlreadyExists(source.id));
        }
        sources.insert(source.id, source);
        Ok(())
    }

    async fn get(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError> {
        let sources = self.sources.read().await;
        Ok(sources.get(&source_id).filter(|s| !s.is_deleted()).cloned())
    }

    async fn get_unscoped(&self, source_id: SourceId) -> Result<Option<Source>, SourceStoreError> {
        let sources = self.sources.read().await;
        Ok(sources.get(&source_id).cloned())
    }

    async fn list(&self, base_id: BaseId) -> Result<Vec<Source>, SourceStoreError> {
        let sources = self.sources.read().await;
        let mut result: Vec<_> = sources
            .values()
            .filter(|s| s.base_id == base_id && !s.is_deleted())
            .cloned()
            .collect();

        result.sort_by_key(|s| s.created_at);
        Ok(result)
    }

    async fn soft_delete(&self, source_id: SourceId) -> Result<(), SourceStoreError> {
        let mut sources = self.sources.write().await;
        let source = sources
            .get_mut(&source_id)
            .ok_or(SourceStoreError::NotFound(source_id))?;

        if source.is_deleted() {
            return Err(SourceStoreError::AlreadyDeleted(source_id));
        }

        source.soft_delete();
        debug!(%source_id, "source soft-deleted");
        Ok(())
    }

    async fn remove(&self, source_id: SourceId) -> Result<(), SourceStoreError> {
        let mut sources = self.sources.write().await;
        sources
            .remove(&source_id)
            .ok_or(SourceStoreError::NotFound(source_id))?;
        debug!(%source_id, "source removed");
        Ok(())
    }
}
