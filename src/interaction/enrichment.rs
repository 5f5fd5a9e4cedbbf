use std::collections::{HashMap, HashSet};

use crate::ai::EnrichmentData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Missing,
    Loading,
    Ready,
    /// The last attempt failed; the UI offers a retry.
    Failed,
}

/// Enrichment results keyed by node id. Lives beside the graph rather than
/// on the nodes, so it survives merges and domain switches untouched.
#[derive(Clone, Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<String, EnrichmentData>,
    pending: HashSet<String>,
    failed: HashSet<String>,
}

impl EnrichmentCache {
    pub fn get(&self, id: &str) -> Option<&EnrichmentData> {
        self.entries.get(id)
    }

    pub fn status(&self, id: &str) -> EnrichmentStatus {
        if self.entries.contains_key(id) {
            EnrichmentStatus::Ready
        } else if self.pending.contains(id) {
            EnrichmentStatus::Loading
        } else if self.failed.contains(id) {
            EnrichmentStatus::Failed
        } else {
            EnrichmentStatus::Missing
        }
    }

    /// Marks `id` as requested. False when it is cached or already loading.
    pub(super) fn begin(&mut self, id: &str) -> bool {
        if self.entries.contains_key(id) || self.pending.contains(id) {
            return false;
        }
        self.failed.remove(id);
        self.pending.insert(id.to_owned());
        true
    }

    pub(super) fn complete(&mut self, id: &str, data: EnrichmentData) {
        self.pending.remove(id);
        self.failed.remove(id);
        self.entries.insert(id.to_owned(), data);
    }

    pub(super) fn fail(&mut self, id: &str) {
        self.pending.remove(id);
        if !self.entries.contains_key(id) {
            self.failed.insert(id.to_owned());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut cache = EnrichmentCache::default();
        assert_eq!(cache.status("Tau"), EnrichmentStatus::Missing);
        assert!(cache.begin("Tau"));
        assert!(!cache.begin("Tau"));
        assert_eq!(cache.status("Tau"), EnrichmentStatus::Loading);

        cache.fail("Tau");
        assert_eq!(cache.status("Tau"), EnrichmentStatus::Failed);

        assert!(cache.begin("Tau"));
        cache.complete("Tau", EnrichmentData::default());
        assert_eq!(cache.status("Tau"), EnrichmentStatus::Ready);
        assert!(!cache.begin("Tau"));
        assert_eq!(cache.len(), 1);
    }
}
