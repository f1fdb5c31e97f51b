//! Domain logic for the bulk export engine.
//!
//! Everything in this crate is pure: no database handles, no filesystem,
//! no network. Admission policy, roster partitioning, progress and manifest
//! shaping all live here so they can be unit tested without infrastructure.

pub mod admission;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod partition;
pub mod progress;
pub mod resource;
pub mod types;
