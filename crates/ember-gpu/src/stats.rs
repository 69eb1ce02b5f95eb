use std::sync::atomic::{AtomicU64, Ordering};

/// Telemetry counters for the binding/commit layer.
///
/// Cheap to bump on the recording thread; snapshots can be read from
/// elsewhere for profiling overlays.
#[derive(Debug, Default)]
pub struct BindingStats {
    commits: AtomicU64,
    native_set_calls: AtomicU64,
    redundant_binds_skipped: AtomicU64,
    hazard_unbinds: AtomicU64,
    barriers_issued: AtomicU64,
    draws: AtomicU64,
    dispatches: AtomicU64,
}

impl BindingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_commits(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_native_set_calls(&self, count: u64) {
        self.native_set_calls.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_redundant_binds_skipped(&self) {
        self.redundant_binds_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_hazard_unbinds(&self) {
        self.hazard_unbinds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_barriers_issued(&self) {
        self.barriers_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_draws(&self) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatches(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BindingStatsSnapshot {
        BindingStatsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            native_set_calls: self.native_set_calls.load(Ordering::Relaxed),
            redundant_binds_skipped: self.redundant_binds_skipped.load(Ordering::Relaxed),
            hazard_unbinds: self.hazard_unbinds.load(Ordering::Relaxed),
            barriers_issued: self.barriers_issued.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStatsSnapshot {
    pub commits: u64,
    pub native_set_calls: u64,
    pub redundant_binds_skipped: u64,
    pub hazard_unbinds: u64,
    pub barriers_issued: u64,
    pub draws: u64,
    pub dispatches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshots() {
        let stats = BindingStats::new();
        stats.inc_commits();
        stats.inc_commits();
        stats.add_native_set_calls(3);
        stats.inc_draws();

        let snap = stats.snapshot();
        assert_eq!(snap.commits, 2);
        assert_eq!(snap.native_set_calls, 3);
        assert_eq!(snap.draws, 1);
        assert_eq!(snap.dispatches, 0);
    }
}
