//! Source management: entities, storage, and the deletion admission protocol.
//!
//! A *source* is an external database registered under a base. Removing one
//! is expensive (table drops, file cleanup) and runs asynchronously; this
//! crate coordinates the synchronous half of that removal:
//!
//! - [`SourceStore`]: storage abstraction with soft-delete semantics
//! - [`AdmissionGuard`]: read-only duplicate-deletion check against the job
//!   registry
//! - [`SourceDeleteService`]: check admission, soft-delete the source, and
//!   enqueue exactly one deletion job

pub mod deletion;
pub mod source;
pub mod store;

pub use deletion::{AdmissionGuard, DeleteError, SourceDeleteService};
pub use source::{Connector, DeletionState, Source};
pub use store::{InMemorySourceStore, SourceStore, SourceStoreError};
