//! Bounded, insertion-ordered cache of recently seen alert fingerprints.

use crate::wire::AlertFingerprint;
use fnv::FnvHashSet;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Answers "is this alert new?" for a relay.
///
/// Membership lives in a hash set, insertion order in a queue, so lookup,
/// insertion and eviction of the oldest entry are all O(1). Eviction is FIFO:
/// seeing a fingerprint again does not refresh its position.
pub struct DedupCache {
    /// Fingerprints currently considered seen.
    members: FnvHashSet<AlertFingerprint>,
    /// The same fingerprints, oldest first.
    order: VecDeque<AlertFingerprint>,
    capacity: NonZeroUsize,
    enabled: bool,
}

impl DedupCache {
    pub fn new(capacity: NonZeroUsize, enabled: bool) -> Self {
        Self {
            members: FnvHashSet::default(),
            order: VecDeque::new(),
            capacity,
            enabled,
        }
    }

    /// Returns `true` when the caller should forward.
    ///
    /// A new fingerprint is inserted, evicting the oldest one once the cache
    /// exceeds its capacity. A known fingerprint leaves the cache untouched.
    /// With loop prevention disabled every call returns `true` and nothing
    /// is stored.
    pub fn mark_seen_if_new(&mut self, fingerprint: &AlertFingerprint) -> bool {
        if !self.enabled {
            return true;
        }
        if self.members.contains(fingerprint) {
            return false;
        }

        self.members.insert(fingerprint.clone());
        self.order.push_back(fingerprint.clone());

        while self.order.len() > self.capacity.get() {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    /// Undoes the latest insertion if it was `fingerprint`. Only the newest
    /// entry can be taken back, which keeps removal O(1). An entry evicted by
    /// that insertion is not restored.
    pub fn forget_newest(&mut self, fingerprint: &AlertFingerprint) -> bool {
        if self.order.back() != Some(fingerprint) {
            return false;
        }
        self.order.pop_back();
        self.members.remove(fingerprint);
        true
    }

    pub fn contains(&self, fingerprint: &AlertFingerprint) -> bool {
        self.members.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fingerprints from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &AlertFingerprint> {
        self.order.iter()
    }
}
