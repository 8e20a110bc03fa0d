//! Outcome of tearing a store down.

use crate::error::CacheError;

/// What a teardown did: how many instances were destroyed and which
/// destroy calls failed.
///
/// Teardown never fails as a whole; per-entry failures are collected here
/// (and logged) so callers can inspect them or simply ignore the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Instances whose `destroy` completed
    pub destroyed: usize,
    /// One [`CacheError::DestroyFailed`] per instance whose `destroy` failed
    pub failures: Vec<CacheError>,
}

impl TeardownReport {
    /// Whether every destroy call succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether nothing was torn down at all.
    pub fn is_empty(&self) -> bool {
        self.destroyed == 0 && self.failures.is_empty()
    }

    /// Instances torn down, successfully or not.
    pub fn attempted(&self) -> usize {
        self.destroyed + self.failures.len()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: TeardownReport) {
        self.destroyed += other.destroyed;
        self.failures.extend(other.failures);
    }
}

impl Extend<TeardownReport> for TeardownReport {
    fn extend<I: IntoIterator<Item = TeardownReport>>(&mut self, iter: I) {
        for report in iter {
            self.merge(report);
        }
    }
}

impl FromIterator<TeardownReport> for TeardownReport {
    fn from_iter<I: IntoIterator<Item = TeardownReport>>(iter: I) -> Self {
        let mut total = TeardownReport::default();
        total.extend(iter);
        total
    }
}
