//! Relative age strings for queue display ("45 secs ago").
//!
//! Pure functions of (capture time, now); callers inject "now".

use chrono::{DateTime, Utc};

/// Ages at or past this many seconds are shown in hours.
const HOURS_THRESHOLD_SECS: i64 = 24 * 3_600;

/// Format the age of `captured_at` as seen from `now`.
///
/// Capture times in the future (clock skew) read as `0 secs ago`.
pub fn format_relative(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_elapsed_secs((now - captured_at).num_seconds())
}

/// Format an elapsed number of whole seconds.
pub fn format_elapsed_secs(elapsed: i64) -> String {
    let elapsed = elapsed.max(0);
    if elapsed < 60 {
        format!("{elapsed} secs ago")
    } else if elapsed < HOURS_THRESHOLD_SECS {
        format!("{} mins ago", elapsed / 60)
    } else {
        format!("{} hours ago", elapsed / 3_600)
    }
}
