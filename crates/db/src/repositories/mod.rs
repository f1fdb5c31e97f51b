//! Repository layer: all SQL lives here.
//!
//! Repositories are stateless structs with associated async functions taking
//! a `&PgPool`, so call sites stay explicit about which handle they use.

pub mod export_job_repo;
pub mod job_key_repo;
pub mod queue_repo;
pub mod roster_repo;

pub use export_job_repo::ExportJobRepo;
pub use job_key_repo::JobKeyRepo;
pub use queue_repo::QueueRepo;
pub use roster_repo::{RosterRepo, RosterResolveError};
