//! Per-(itinerary, city, date) edit locks.
//!
//! In-process mutual exclusion guarding the reconciler: two concurrent edits
//! to the same itinerary day must not race. No queuing — a caller that fails
//! to acquire reports "update in progress" instead of blocking. No TTL; the
//! RAII guard releases on drop regardless of how the edit ends.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

#[derive(Clone, Default)]
pub struct LockManager {
    held: Arc<Mutex<HashSet<String>>>,
}

fn lock_key(token: &str, city: &str, date: NaiveDate) -> String {
    format!("{}:{}:{}", token, city.to_ascii_lowercase(), date)
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire; returns false when the slot is already being edited.
    pub fn acquire(&self, token: &str, city: &str, date: NaiveDate) -> bool {
        self.held
            .lock()
            .expect("lock table poisoned")
            .insert(lock_key(token, city, date))
    }

    pub fn release(&self, token: &str, city: &str, date: NaiveDate) {
        self.held
            .lock()
            .expect("lock table poisoned")
            .remove(&lock_key(token, city, date));
    }

    /// Acquire with scoped release: the returned guard releases on drop.
    pub fn guard(&self, token: &str, city: &str, date: NaiveDate) -> Option<LockGuard> {
        if self.acquire(token, city, date) {
            Some(LockGuard {
                manager: self.clone(),
                key: lock_key(token, city, date),
            })
        } else {
            None
        }
    }
}

pub struct LockGuard {
    manager: LockManager,
    key: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.manager
            .held
            .lock()
            .expect("lock table poisoned")
            .remove(&self.key);
    }
}
