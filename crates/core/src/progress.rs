//! Client-visible progress for unresolved jobs.

/// Completed-over-expected as a whole percentage, clamped to 0..=100.
///
/// A job whose expectation is not yet set (or zero) reports 0 rather than
/// dividing by zero; a zero-unit job completes before anyone can observe it.
pub fn percent_complete(completed_units: i64, expected_units: i32) -> u8 {
    if expected_units <= 0 {
        return 0;
    }
    let pct = completed_units.saturating_mul(100) / expected_units as i64;
    pct.clamp(0, 100) as u8
}

/// The `X-Progress` header value for an unresolved job.
pub fn progress_message(in_progress: bool, completed_units: i64, expected_units: i32) -> String {
    if in_progress {
        format!(
            "In Progress ({}%)",
            percent_complete(completed_units, expected_units)
        )
    } else {
        "Pending".to_string()
    }
}
