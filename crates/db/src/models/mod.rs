//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the insert DTOs the repositories accept.

pub mod export_job;
pub mod job_key;
pub mod queue;
pub mod roster;
pub mod status;
