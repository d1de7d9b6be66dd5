//! Page-granularity shared/exclusive locks for strict two-phase locking.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

use crate::common::types::{PageId, Permission, TxnId};
use crate::transaction::concurrency::lock::{Lock, LockSet};

/// Maps pages to the locks held on them.
///
/// The whole table sits behind one mutex, so every operation is atomic with
/// respect to every page. That mutex is a known contention point: commit and
/// abort rely on `release_all` seeing a single consistent table.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<HashMap<PageId, LockSet>>,
    /// Signalled whenever a lock is released
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking acquire. True if `txn_id` now holds at least `permission`
    /// on `page_id`.
    pub fn acquire(&self, txn_id: TxnId, page_id: PageId, permission: Permission) -> bool {
        let mut table = self.table.lock();
        Self::try_acquire(&mut table, txn_id, page_id, permission)
    }

    /// Acquire, waiting up to `timeout` for conflicting holders to release.
    ///
    /// Returns false once the wait bound is exceeded. There is no wait-for
    /// graph: a false return may be plain contention rather than a deadlock.
    pub fn acquire_timeout(
        &self,
        txn_id: TxnId,
        page_id: PageId,
        permission: Permission,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut table = self.table.lock();

        loop {
            if Self::try_acquire(&mut table, txn_id, page_id, permission) {
                return true;
            }

            if self.released.wait_until(&mut table, deadline).timed_out() {
                // Last chance: a release may have landed right at the deadline
                let granted = Self::try_acquire(&mut table, txn_id, page_id, permission);
                if !granted {
                    debug!(
                        "Txn {} gave up waiting for {:?} on page {} after {:?}",
                        txn_id, permission, page_id, timeout
                    );
                }
                return granted;
            }
        }
    }

    fn try_acquire(
        table: &mut HashMap<PageId, LockSet>,
        txn_id: TxnId,
        page_id: PageId,
        permission: Permission,
    ) -> bool {
        let granted = table.entry(page_id).or_default().try_grant(txn_id, permission);
        trace!("Txn {} {:?} on page {}: granted={}", txn_id, permission, page_id, granted);
        granted
    }

    /// Release the lock `txn_id` holds on `page_id`. False if it held none.
    pub fn release(&self, txn_id: TxnId, page_id: PageId) -> bool {
        let mut table = self.table.lock();

        let removed = match table.get_mut(&page_id) {
            Some(set) => {
                let removed = set.release(txn_id);
                if set.is_empty() {
                    table.remove(&page_id);
                }
                removed
            }
            None => false,
        };

        if removed {
            self.released.notify_all();
        }
        removed
    }

    /// Release every lock held by `txn_id`
    pub fn release_all(&self, txn_id: TxnId) {
        let mut table = self.table.lock();

        let mut released = 0;
        table.retain(|_, set| {
            if set.release(txn_id) {
                released += 1;
            }
            !set.is_empty()
        });

        if released > 0 {
            trace!("Released {} locks of txn {}", released, txn_id);
            self.released.notify_all();
        }
    }

    /// Whether `txn_id` holds any lock on `page_id`
    pub fn holds(&self, txn_id: TxnId, page_id: PageId) -> bool {
        self.table
            .lock()
            .get(&page_id)
            .is_some_and(|set| set.holds(txn_id))
    }

    /// Permission `txn_id` holds on `page_id`, if any
    pub fn permission(&self, txn_id: TxnId, page_id: PageId) -> Option<Permission> {
        self.table
            .lock()
            .get(&page_id)
            .and_then(|set| set.permission_of(txn_id))
    }

    /// Snapshot of the locks on `page_id`
    pub fn lock_set(&self, page_id: PageId) -> Vec<Lock> {
        self.table
            .lock()
            .get(&page_id)
            .map(|set| set.locks().to_vec())
            .unwrap_or_default()
    }

    /// Pages on which `txn_id` holds a lock
    pub fn locked_pages(&self, txn_id: TxnId) -> Vec<PageId> {
        self.table
            .lock()
            .iter()
            .filter(|(_, set)| set.holds(txn_id))
            .map(|(page_id, _)| *page_id)
            .collect()
    }

    /// True if every lock set satisfies the sharing invariant
    pub fn is_consistent(&self) -> bool {
        self.table.lock().values().all(|set| !set.is_empty() && set.is_consistent())
    }
}
