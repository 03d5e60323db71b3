use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::domain::page_quota::PageQuota;

/// A domain and the number of pages admitted for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

impl fmt::Display for DomainCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/c={}", self.domain, self.count)
    }
}

/// Per-domain page counters shared by all crawler workers of one profile.
///
/// Counters only grow. A counter is created at zero the first time its domain is
/// referenced, and the domain is remembered in first-seen order.
#[derive(Debug, Default)]
pub struct DomainAdmissionTracker {
    counters: DashMap<String, AtomicU64>,
    // Appended while the map's entry for the new domain is held, so each domain
    // appears exactly once.
    order: RwLock<Vec<String>>,
}

impl DomainAdmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_counter<R>(&self, domain: &str, f: impl FnOnce(&AtomicU64) -> R) -> R {
        if let Some(counter) = self.counters.get(domain) {
            return f(counter.value());
        }
        let counter = self
            .counters
            .entry(domain.to_string())
            .or_insert_with(|| {
                debug!(domain, "Tracking new domain");
                self.order.write().push(domain.to_string());
                AtomicU64::new(0)
            });
        f(counter.value())
    }

    /// Record one more page for `domain`. Returns the new count.
    pub fn increment(&self, domain: &str) -> u64 {
        self.with_counter(domain, |counter| counter.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Current count for `domain`, registering the domain at zero if it is new.
    pub fn count(&self, domain: &str) -> u64 {
        self.with_counter(domain, |counter| counter.load(Ordering::Acquire))
    }

    /// Count one more page for `domain` if `quota` still allows it.
    ///
    /// The check and the increment are a single atomic step, so concurrent callers
    /// never push a domain past its quota.
    pub fn try_acquire(&self, domain: &str, quota: PageQuota) -> bool {
        self.with_counter(domain, |counter| {
            counter
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                    if quota.admits(count) {
                        count.checked_add(1)
                    } else {
                        None
                    }
                })
                .is_ok()
        })
    }

    /// The `index`-th domain in first-seen order with its current count.
    pub fn domain_at(&self, index: usize) -> Option<DomainCount> {
        // Release the order lock before touching the map: inserts take them the
        // other way around.
        let domain = self.order.read().get(index).cloned()?;
        let count = self
            .counters
            .get(&domain)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0);
        Some(DomainCount { domain, count })
    }

    /// Operator listing of the first `limit` domains as `domain/c=count`.
    ///
    /// When more domains exist, one extra entry at position `limit` is added and
    /// marked with a trailing ` ...`.
    pub fn listing(&self, limit: usize) -> Vec<String> {
        let mut items = Vec::new();
        for index in 0..=limit {
            let Some(entry) = self.domain_at(index) else {
                break;
            };
            let mut item = entry.to_string();
            if index == limit {
                item.push_str(" ...");
            }
            items.push(item);
        }
        items
    }

    pub fn snapshot(&self) -> Vec<DomainCount> {
        (0..self.len()).filter_map(|index| self.domain_at(index)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_start_at_one() {
        let tracker = DomainAdmissionTracker::new();
        assert_eq!(tracker.increment("a.com"), 1);
        assert_eq!(tracker.increment("a.com"), 2);
        assert_eq!(tracker.count("a.com"), 2);
    }

    #[test]
    fn count_creates_without_advancing() {
        let tracker = DomainAdmissionTracker::new();
        assert_eq!(tracker.count("b.com"), 0);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.increment("b.com"), 1);
    }

    #[test]
    fn domain_at_follows_first_seen_order() {
        let tracker = DomainAdmissionTracker::new();
        tracker.increment("z.com");
        tracker.count("a.com");
        tracker.increment("z.com");
        assert_eq!(
            tracker.domain_at(0),
            Some(DomainCount { domain: "z.com".into(), count: 2 })
        );
        assert_eq!(
            tracker.domain_at(1),
            Some(DomainCount { domain: "a.com".into(), count: 0 })
        );
        assert_eq!(tracker.domain_at(2), None);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn listing_marks_overflow() {
        let tracker = DomainAdmissionTracker::new();
        for domain in ["a.com", "b.com", "c.com"] {
            tracker.increment(domain);
        }
        assert_eq!(tracker.listing(5), vec!["a.com/c=1", "b.com/c=1", "c.com/c=1"]);
        assert_eq!(tracker.listing(1), vec!["a.com/c=1", "b.com/c=1 ..."]);
    }

    #[test]
    fn try_acquire_stops_at_quota() {
        let tracker = DomainAdmissionTracker::new();
        let quota = PageQuota::Limit(2);
        assert!(tracker.try_acquire("q.com", quota));
        assert!(tracker.try_acquire("q.com", quota));
        assert!(!tracker.try_acquire("q.com", quota));
        assert_eq!(tracker.count("q.com"), 2);
    }
}
