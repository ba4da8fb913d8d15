//! Source deletion admission protocol.
//!
//! Deleting a source drops external tables and cleans up files, so the real
//! work runs as a background job. The synchronous half lives here: reject
//! the request if a deletion job for the source is already in flight,
//! soft-delete the source, and enqueue exactly one job.

use tracing::{debug, info, warn};

use datadock_core::SourceId;
use datadock_jobs::{Job, JobId, JobKind, JobRegistry, RegistryError};

use super::store::{SourceStore, SourceStoreError};

/// Read-only duplicate-deletion check against the job registry.
pub struct AdmissionGuard<R> {
    registry: R,
}

impl<R: JobRegistry> AdmissionGuard<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Whether a deletion job for the source is already in flight.
    ///
    /// Scans a point-in-time snapshot of the registry; the authoritative
    /// check is the registry's atomic admission at insert time.
    pub async fn deletion_in_flight(&self, source_id: SourceId) -> Result<bool, RegistryError> {
        let jobs = self.registry.list().await?;
        Ok(jobs
            .iter()
            .any(|j| j.kind == JobKind::SourceDelete && j.source_id() == Some(source_id)))
    }
}

/// Error taxonomy for deletion requests.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeleteError {
    /// An equivalent deletion job was already admitted. The caller can poll
    /// that job instead of retrying.
    #[error("a deletion job for this source is already running")]
    DuplicateRequest,
    #[error("source not found: {0}")]
    NotFound(SourceId),
    /// Transient registry failure; no rollback is attempted.
    #[error(transparent)]
    Registry(RegistryError),
    /// Transient store failure; no rollback is attempted.
    #[error(transparent)]
    Store(SourceStoreError),
}

/// Orchestrates admission, soft delete, and job creation for source removal.
pub struct SourceDeleteService<R, S> {
    guard: AdmissionGuard<R>,
    registry: R,
    sources: S,
}

impl<R, S> SourceDeleteService<R, S>
where
    R: JobRegistry + Clone,
    S: SourceStore,
{
    pub fn new(registry: R, sources: S) -> Self {
        Self {
            guard: AdmissionGuard::new(registry.clone()),
            registry,
            sources,
        }
    }

    /// Request asynchronous deletion of a source.
    ///
    /// On success the source is soft-deleted and exactly one deletion job is
    /// queued; the returned [`JobId`] can be polled through the registry.
    /// Concurrent requests for the same source settle at the registry: one
    /// is admitted, the rest get [`DeleteError::DuplicateRequest`].
    pub async fn request_deletion(&self, source_id: SourceId) -> Result<JobId, DeleteError> {
        if self
            .guard
            .deletion_in_flight(source_id)
            .await
            .map_err(DeleteError::Registry)?
        {
            debug!(%source_id, "deletion rejected: job already in flight");
            return Err(DeleteError::DuplicateRequest);
        }

        match self.sources.soft_delete(source_id).await {
            Ok(()) => {}
            // Already hidden: a lost admission race, or a stranded
            // soft-delete from an earlier partial failure. The atomic
            // insert below settles which.
            Err(SourceStoreError::AlreadyDeleted(_)) => {
                debug!(%source_id, "source already soft-deleted; re-checking admission");
            }
            Err(SourceStoreError::NotFound(id)) => return Err(DeleteError::NotFound(id)),
            Err(e) => return Err(DeleteError::Store(e)),
        }

        let job = self
            .registry
            .enqueue_if_absent(Job::source_delete(source_id))
            .await
            .map_err(|e| match e {
                RegistryError::Duplicate { .. } => DeleteError::DuplicateRequest,
                e => {
                    warn!(%source_id, error = %e, "source soft-deleted but job insert failed");
                    DeleteError::Registry(e)
                }
            })?;

        info!(%source_id, job_id = %job.id, "source soft-deleted, deletion job queued");
        Ok(job.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::source::{Connector, Source};
    use crate::store::InMemorySourceStore;
    use datadock_core::BaseId;
    use datadock_jobs::{InMemoryJobRegistry, JobStatus};

    type TestService = SourceDeleteService<Arc<InMemoryJobRegistry>, Arc<InMemorySourceStore>>;

    async fn service_with_source() -> (
        TestService,
        Arc<InMemoryJobRegistry>,
        Arc<InMemorySourceStore>,
        SourceId,
    ) {
        let registry = InMemoryJobRegistry::arc();
        let store = InMemorySourceStore::arc();

        let source = Source::new(BaseId::new(), "warehouse", Connector::Postgres);
        let source_id = source.id;
        store.insert(source).await.unwrap();

        let service = SourceDeleteService::new(registry.clone(), store.clone());
        (service, registry, store, source_id)
    }

    #[tokio::test]
    async fn admits_and_soft_deletes() {
        let (service, registry, store, source_id) = service_with_source().await;

        let job_id = service.request_deletion(source_id).await.unwrap();

        let job = registry.get(job_id).await.unwrap().unwrap();
        assert_eq!(job.kind, JobKind::SourceDelete);
        assert_eq!(job.source_id(), Some(source_id));

        assert!(store.get(source_id).await.unwrap().is_none());
        assert!(store.get_unscoped(source_id).await.unwrap().unwrap().is_deleted());
    }

    #[tokio::test]
    async fn second_request_is_rejected() {
        let (service, registry, _store, source_id) = service_with_source().await;

        service.request_deletion(source_id).await.unwrap();
        let err = service.request_deletion(source_id).await.unwrap_err();

        assert!(matches!(err, DeleteError::DuplicateRequest));
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let (service, registry, _store, _source_id) = service_with_source().await;

        let missing = SourceId::new();
        let err = service.request_deletion(missing).await.unwrap_err();

        assert!(matches!(err, DeleteError::NotFound(id) if id == missing));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stranded_soft_delete_is_repaired() {
        let (service, registry, store, source_id) = service_with_source().await;

        // Soft-deleted with no job in flight, as left behind by a partial
        // failure.
        store.soft_delete(source_id).await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());

        let job_id = service.request_deletion(source_id).await.unwrap();
        assert_eq!(
            registry.get(job_id).await.unwrap().unwrap().source_id(),
            Some(source_id)
        );
    }

    #[tokio::test]
    async fn terminal_job_allows_readmission() {
        let (service, registry, _store, source_id) = service_with_source().await;

        let job_id = service.request_deletion(source_id).await.unwrap();
        registry
            .update_status(job_id, JobStatus::Failed { error: "connection lost".into() })
            .await
            .unwrap();

        // The failed job no longer holds the admission key, so the caller
        // can request deletion again.
        let retry_id = service.request_deletion(source_id).await.unwrap();
        assert_ne!(retry_id, job_id);
    }

    #[tokio::test]
    async fn guard_sees_only_deletion_jobs_for_the_source() {
        let (service, registry, _store, source_id) = service_with_source().await;

        registry
            .enqueue(Job::new(JobKind::custom("reindex"), serde_json::json!({})))
            .await
            .unwrap();
        registry
            .enqueue(Job::source_delete(SourceId::new()))
            .await
            .unwrap();

        // Unrelated jobs do not block admission.
        service.request_deletion(source_id).await.unwrap();
    }
}
