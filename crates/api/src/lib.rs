//! HTTP surface of the export engine: request admission, job status
//! polling, and payload file downloads.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
