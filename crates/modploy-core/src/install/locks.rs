//! Per-identity mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::location::LocationId;

/// Serializes host calls that target the same location identity
///
/// Different identities never contend with each other.
#[derive(Debug, Default)]
pub struct LocationLocks {
    locks: Mutex<HashMap<LocationId, Arc<Mutex<()>>>>,
}

impl LocationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `location`
    pub fn with_lock<R>(&self, location: &LocationId, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(location.clone()).or_default())
        };
        let _guard = lock.lock();
        f()
    }

    /// Number of identities seen so far
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_identity_is_serialized() {
        let locks = Arc::new(LocationLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with_lock(&LocationId::new("foo:1.0"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn different_identities_do_not_block() {
        let locks = LocationLocks::new();
        let value = locks.with_lock(&LocationId::new("a"), || {
            locks.with_lock(&LocationId::new("b"), || 42)
        });
        assert_eq!(value, 42);
        assert_eq!(locks.len(), 2);
    }
}
