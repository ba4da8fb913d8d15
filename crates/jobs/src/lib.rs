//! Background job registry for asynchronous source maintenance work.
//!
//! ## Design
//!
//! - Jobs are typed: a closed [`JobKind`] enum routes them to handlers and
//!   drives admission checks
//! - The registry owns the admission invariant: at most one in-flight job
//!   per [`AdmissionKey`] (kind + target source)
//! - Job execution itself belongs to an external worker engine, which drives
//!   the lifecycle through [`JobRegistry::update_status`]
//!
//! ## Components
//!
//! - `Job`: unit of asynchronous work with a JSON payload and metadata
//! - `JobRegistry`: insertion, listing, and atomic admission (in-memory or
//!   durable)

pub mod registry;
pub mod types;

pub use registry::{InMemoryJobRegistry, JobRegistry, RegistryError};
pub use types::{AdmissionKey, Job, JobId, JobKind, JobStatus, SourceDeletePayload};
