//! Single-threaded in-flight tracking for submissions.
//!
//! Each key (an editing surface, a sample id, an upload filename) can have at
//! most one outstanding submission. [`InFlight::try_begin`] hands out a guard
//! that releases the key when dropped, so a submission is released on success,
//! on failure, and when its future is dropped mid-await.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Set of keys with an outstanding submission.
pub struct InFlight<K: Eq + Hash> {
    keys: RefCell<HashSet<K>>,
}

impl<K: Eq + Hash> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            keys: RefCell::new(HashSet::new()),
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for InFlight<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys.borrow().iter()).finish()
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` when a submission for it is already pending.
    #[must_use]
    pub fn try_begin(&self, key: K) -> Option<InFlightGuard<'_, K>> {
        if !self.keys.borrow_mut().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { owner: self, key })
    }

    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.keys.borrow().contains(key)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.keys.borrow().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_idle()
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a, K: Eq + Hash> {
    owner: &'a InFlight<K>,
    key: K,
}

impl<K: Eq + Hash> InFlightGuard<'_, K> {
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for InFlightGuard<'_, K> {
    fn drop(&mut self) {
        self.owner.keys.borrow_mut().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::InFlight;

    #[test]
    fn second_claim_is_refused_until_release() {
        let inflight = InFlight::new();
        let guard = inflight.try_begin("labels").expect("first claim");
        assert!(inflight.try_begin("labels").is_none());
        assert!(inflight.is_pending(&"labels"));
        assert_eq!(*guard.key(), "labels");

        drop(guard);
        assert!(inflight.is_idle());
        assert!(inflight.try_begin("labels").is_some());
    }

    #[test]
    fn keys_are_independent() {
        let inflight = InFlight::new();
        let _a = inflight.try_begin("a.jpg".to_string()).expect("a");
        let _b = inflight.try_begin("b.jpg".to_string()).expect("b");
        assert_eq!(inflight.len(), 2);
    }
}
