//! Parser warnings with colored terminal output.
//!
//! Provides deduplication to avoid spamming the same warning multiple times.
//! Used by the parser, the encoding sniffer and the path query engine to report
//! anomalies that do not warrant a recorded parse error.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

/// Global set of warnings we've already printed (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// When set, warnings are still recorded for deduplication but never printed.
static QUIET: AtomicBool = AtomicBool::new(false);

/// Warn about a tolerated anomaly (prints once per unique message).
///
/// Returns `true` when this call was the first occurrence of the message.
///
/// # Example
/// ```
/// use lax_common::warning::{set_quiet, warn_once};
///
/// set_quiet(true);
/// assert!(warn_once("Encoding", "unknown charset label 'x-foo'"));
/// assert!(!warn_once("Encoding", "unknown charset label 'x-foo'"));
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let first = WARNED
        .lock()
        .map(|mut guard| guard.get_or_insert_with(HashSet::new).insert(key))
        // A poisoned set only loses deduplication, never the warning itself.
        .unwrap_or(true);

    if first && !QUIET.load(Ordering::Relaxed) {
        eprintln!(
            "{} {}",
            format!("[lax {component}]").yellow().bold(),
            message.yellow()
        );
    }
    first
}

/// Silence (or re-enable) warning output for the whole process.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether warning output is currently silenced.
#[must_use]
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_toggle() {
        set_quiet(true);
        assert!(is_quiet());
        set_quiet(false);
        assert!(!is_quiet());
        set_quiet(true);
    }

    #[test]
    fn test_deduplicates_per_component() {
        set_quiet(true);
        assert!(warn_once("Test", "dedup message"));
        assert!(!warn_once("Test", "dedup message"));
        assert!(warn_once("Other", "dedup message"));
    }
}
