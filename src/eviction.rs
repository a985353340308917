//! Size-budget eviction
//!
//! Oldest-first deletion by stored-at time until the store fits the
//! budget. The newest entry is never deleted: if the loop reaches it,
//! that entry alone exceeds the budget and is retained as a soft cap.
//!
//! Each pass first sweeps temporaries abandoned by interrupted writes.

use humansize::{format_size, BINARY};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::ArtifactStore;

/// Temporaries older than this are treated as abandoned.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(10 * 60);

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Number of entries scanned
    pub scanned: usize,
    /// Number of entries deleted
    pub deleted: usize,
    /// Paths of the deleted entries
    pub evicted: Vec<PathBuf>,
    /// Number of abandoned temporaries removed
    pub temps_removed: usize,
    /// Bytes reclaimed, temporaries included
    pub bytes_reclaimed: u64,
    /// Total size left after the pass (by accounting, not re-listing)
    pub remaining_size: u64,
    /// Non-fatal failures, one message per entry
    pub errors: Vec<String>,
}

/// Bring `store` under `max_bytes`, deleting oldest entries first.
///
/// Failures to list or delete are logged and recorded in the report; they
/// never abort the pass.
pub fn enforce_budget(store: &ArtifactStore, max_bytes: u64) -> EvictionReport {
    let mut report = EvictionReport::default();

    match store.remove_stale_temps(STALE_TEMP_AGE) {
        Ok((count, bytes)) => {
            if count > 0 {
                debug!("Removed {} abandoned temporary files", count);
            }
            report.temps_removed = count;
            report.bytes_reclaimed = bytes;
        }
        Err(e) => {
            warn!("Temporary file sweep skipped: {}", e);
            report.errors.push(e.to_string());
        }
    }

    let mut entries = match store.list_all() {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Eviction skipped: {}", e);
            report.errors.push(e.to_string());
            return report;
        }
    };

    report.scanned = entries.len();
    let mut total: u64 = entries.iter().map(|e| e.size).sum();
    report.remaining_size = total;
    if total <= max_bytes {
        return report;
    }

    debug!(
        "Cache size ({}) exceeds limit ({}), cleaning up",
        format_size(total, BINARY),
        format_size(max_bytes, BINARY)
    );

    entries.sort_by_key(|e| e.stored_at);
    let newest = entries.pop();

    for entry in &entries {
        if total <= max_bytes {
            break;
        }
        match store.delete_path(&entry.path) {
            Ok(()) => {
                total -= entry.size;
                report.deleted += 1;
                report.bytes_reclaimed += entry.size;
                report.evicted.push(entry.path.clone());
                debug!("Deleted old cache file: {}", entry.path.display());
            }
            Err(e) => {
                warn!("{}", e);
                report.errors.push(e.to_string());
            }
        }
    }

    if total > max_bytes {
        if let Some(newest) = newest {
            if newest.size > max_bytes {
                warn!(
                    "Cache entry {} ({}) alone exceeds the size budget; retained",
                    newest.path.display(),
                    format_size(newest.size, BINARY)
                );
            }
        }
    }

    report.remaining_size = total;
    report
}
