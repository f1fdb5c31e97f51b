//! Worker-side half of the export engine: the pool that drains the
//! dispatch queue, the per-unit processor and output writer, the
//! completion aggregator, and the archival sweeper.

pub mod completion;
pub mod config;
pub mod error;
pub mod pool;
pub mod processor;
pub mod sweep;
pub mod writer;

use std::path::PathBuf;

/// The three output roots a job's files move through over their lifetime:
/// staging while units are in flight, payload once Completed, archive once
/// swept. A given file lives in exactly one of them at a time.
#[derive(Debug, Clone)]
pub struct DataDirs {
    pub staging: PathBuf,
    pub payload: PathBuf,
    pub archive: PathBuf,
}
