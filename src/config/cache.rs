//! Shared, read-only rule set cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::EngineResult;

use super::repository::{RuleRepository, normalize_country_code};
use super::rule_set::RuleSet;

/// Rule sets kept by [`RuleCache::new`]: a year of daily dates for one country.
pub const DEFAULT_CACHE_CAPACITY: usize = 366;

type CacheKey = (String, NaiveDate);

#[derive(Default)]
struct Entries {
    sets: HashMap<CacheKey, Arc<RuleSet>>,
    /// Insertion order, oldest first.
    order: VecDeque<CacheKey>,
}

/// Caches one [`RuleSet`] per country and effective date.
///
/// Rule sets are immutable once resolved, so every calculation for the same
/// country and date shares the same `Arc` without further locking. The lock
/// only guards filling the map.
///
/// Effective dates come from callers, so the cache holds at most `capacity`
/// rule sets and evicts the oldest insertion when full.
pub struct RuleCache {
    repository: Arc<dyn RuleRepository>,
    capacity: usize,
    entries: RwLock<Entries>,
}

impl RuleCache {
    /// Creates an empty cache over a repository holding up to
    /// [`DEFAULT_CACHE_CAPACITY`] rule sets.
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self::with_capacity(repository, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates an empty cache holding up to `capacity` rule sets (at least one).
    pub fn with_capacity(repository: Arc<dyn RuleRepository>, capacity: usize) -> Self {
        Self {
            repository,
            capacity: capacity.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Returns the rules for a country and date, loading them on first use.
    ///
    /// Load failures are not cached.
    pub fn rules_for(
        &self,
        country_code: &str,
        effective_date: NaiveDate,
    ) -> EngineResult<Arc<RuleSet>> {
        let key = (normalize_country_code(country_code), effective_date);

        if let Some(rules) = self.entries.read().sets.get(&key) {
            return Ok(Arc::clone(rules));
        }

        let rules = Arc::new(self.repository.load_rules(&key.0, effective_date)?);

        let mut entries = self.entries.write();
        // Another caller may have filled the slot while we were loading
        if let Some(existing) = entries.sets.get(&key) {
            return Ok(Arc::clone(existing));
        }

        while entries.sets.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.sets.remove(&oldest);
            debug!(country = %oldest.0, effective_date = %oldest.1, "Evicted rule set");
        }

        debug!(country = %key.0, effective_date = %effective_date, "Cached rule set");
        entries.order.push_back(key.clone());
        entries.sets.insert(key, Arc::clone(&rules));
        Ok(rules)
    }

    /// Maximum number of cached rule sets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached rule sets.
    pub fn len(&self) -> usize {
        self.entries.read().sets.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().sets.is_empty()
    }

    /// Drops every cached rule set, e.g. after rule data was edited.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.sets.clear();
        entries.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleBook;
    use crate::models::DeductionKind;
    use crate::test_support::*;
    use rust_decimal_macros::dec;

    fn book() -> Arc<RuleBook> {
        Arc::new(RuleBook::from_sources([source(
            vec![deduction_type("ssf", "SSF", DeductionKind::Contribution)],
            vec![percentage_band("ssf_1", "ssf", dec!(0), None, dec!(3))],
            vec![],
            vec![],
        )]))
    }

    fn cache() -> RuleCache {
        RuleCache::new(book())
    }

    #[test]
    fn test_same_country_and_date_share_rule_set() {
        let cache = cache();
        let first = cache.rules_for("KE", date(2025, 1, 31)).unwrap();
        let second = cache.rules_for("ke", date(2025, 1, 31)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_different_dates_are_cached_separately() {
        let cache = cache();
        cache.rules_for("KE", date(2025, 1, 31)).unwrap();
        cache.rules_for("KE", date(2025, 2, 28)).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_distinct_dates_do_not_grow_cache_past_capacity() {
        let cache = RuleCache::with_capacity(book(), 3);
        for day in 1..=10 {
            cache.rules_for("KE", date(2025, 1, day)).unwrap();
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);

        // Latest dates are kept and still shared
        let latest = cache.rules_for("KE", date(2025, 1, 10)).unwrap();
        let again = cache.rules_for("KE", date(2025, 1, 10)).unwrap();
        assert!(Arc::ptr_eq(&latest, &again));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_evicted_date_is_reloaded() {
        let cache = RuleCache::with_capacity(book(), 1);
        let first = cache.rules_for("KE", date(2025, 1, 1)).unwrap();
        cache.rules_for("KE", date(2025, 1, 2)).unwrap();

        let reloaded = cache.rules_for("KE", date(2025, 1, 1)).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.as_ref(), first.as_ref());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_still_caches_one_rule_set() {
        let cache = RuleCache::with_capacity(book(), 0);
        assert_eq!(cache.capacity(), 1);
        cache.rules_for("KE", date(2025, 1, 31)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleCache>();
    }
}
