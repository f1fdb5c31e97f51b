//! Output file layout shared by the worker and the status responder.
//!
//! Every work unit owns a unique file stem; successes land in
//! `<stem>.ndjson` and failures in `<stem>-error.ndjson` under the job's
//! directory. No two units ever touch the same file, which is what makes
//! concurrent workers safe without locks.

use std::path::{Path, PathBuf};

use crate::types::DbId;

/// A fresh, unit-unique file stem.
pub fn new_file_stem() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `<stem>.ndjson`
pub fn data_file_name(stem: &str) -> String {
    format!("{stem}.ndjson")
}

/// `<stem>-error.ndjson`
pub fn error_file_name(stem: &str) -> String {
    format!("{stem}-error.ndjson")
}

/// The error file paired with a data file name from a completion record.
pub fn error_file_for(data_file_name: &str) -> String {
    let stem = data_file_name.split('.').next().unwrap_or(data_file_name);
    error_file_name(stem)
}

/// `<root>/<job_id>`
pub fn job_dir(root: &Path, job_id: DbId) -> PathBuf {
    root.join(job_id.to_string())
}

/// Reject file names that could escape the job directory when served.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_file_pairs_with_data_file() {
        assert_eq!(error_file_for("abc123.ndjson"), "abc123-error.ndjson");
    }

    #[test]
    fn job_dir_is_keyed_by_id() {
        assert_eq!(job_dir(Path::new("/data"), 42), PathBuf::from("/data/42"));
    }

    #[test]
    fn traversal_names_rejected() {
        assert!(!is_safe_file_name("../secrets"));
        assert!(!is_safe_file_name("a/b.ndjson"));
        assert!(!is_safe_file_name(""));
        assert!(is_safe_file_name("abc-error.ndjson"));
    }
}
