//! Job registry abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{AdmissionKey, Job, JobId, JobStatus};

/// Job registry abstraction.
///
/// Holds the current set of jobs and owns the admission invariant: at most
/// one in-flight job per admission key. Backed by an in-memory structure for
/// tests/dev and by a durable store in production.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Snapshot of all in-flight (queued or running) jobs, FIFO by creation
    /// time.
    async fn list(&self) -> Result<Vec<Job>, RegistryError>;

    /// Get a job by ID, regardless of status.
    async fn get(&self, job_id: JobId) -> Result<Option<Job>, RegistryError>;

    /// Insert a new job unconditionally.
    async fn enqueue(&self, job: Job) -> Result<Job, RegistryError>;

    /// Insert a new job unless an in-flight job with the same admission key
    /// already exists.
    ///
    /// The conflict check and the insert happen under a single critical
    /// section, so concurrent callers racing on the same key see exactly one
    /// admission. Jobs without an admission key are inserted unconditionally.
    async fn enqueue_if_absent(&self, job: Job) -> Result<Job, RegistryError>;

    /// Update a job's status (worker engine interface).
    ///
    /// Moving a job to a terminal status releases its admission key.
    async fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), RegistryError>;
}

/// Registry error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    /// An in-flight job with the same admission key was already admitted.
    #[error("duplicate in-flight job for {key}: {existing}")]
    Duplicate {
        key: AdmissionKey,
        existing: JobId,
    },
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
impl<R> JobRegistry for Arc<R>
where
    R: JobRegistry + ?Sized,
{
    async fn list(&self) -> Result<Vec<Job>, RegistryError> {
        (**self).list().await
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, RegistryError> {
        (**self).get(job_id).await
    }

    async fn enqueue(&self, job: Job) -> Result<Job, RegistryError> {
        (**self).enqueue(job).await
    }

    async fn enqueue_if_absent(&self, job: Job) -> Result<Job, RegistryError> {
        (**self).enqueue_if_absent(job).await
    }

    async fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), RegistryError> {
        (**self).update_status(job_id, status).await
    }
}

/// In-memory job registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn list(&self) -> Result<Vec<Job>, RegistryError> {
        let jobs = self.jobs.read().await;
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| j.status.is_in_flight())
            .cloned()
            .collect();

        result.sort_by_key(|j| j.created_at);
        Ok(result)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, RegistryError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).cloned())
    }

    async fn enqueue(&self, job: Job) -> Result<Job, RegistryError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(RegistryError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        debug!(job_id = %job.id, kind = %job.kind.type_name(), "job enqueued");
        Ok(job)
    }

    async fn enqueue_if_absent(&self, job: Job) -> Result<Job, RegistryError> {
        // The write guard spans both the scan and the insert.
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(RegistryError::AlreadyExists(job.id));
        }

        if let Some(key) = job.admission_key() {
            if let Some(existing) = jobs
                .values()
                .find(|j| j.status.is_in_flight() && j.admission_key().as_ref() == Some(&key))
            {
                debug!(%key, existing = %existing.id, "admission rejected");
                return Err(RegistryError::Duplicate {
                    key,
                    existing: existing.id,
                });
            }
        }

        jobs.insert(job.id, job.clone());
        debug!(job_id = %job.id, kind = %job.kind.type_name(), "job admitted");
        Ok(job)
    }

    async fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(RegistryError::NotFound(job_id))?;
        job.status = status;
        job.updated_at = Utc::now();
        Ok(())
    }
}
