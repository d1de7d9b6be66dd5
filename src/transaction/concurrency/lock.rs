use crate::common::types::{Permission, TxnId};

/// A lock held by a transaction on one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lock {
    pub txn_id: TxnId,
    pub permission: Permission,
}

/// The locks currently held on a single page.
///
/// Holds either nothing, a single lock of any permission, or two or more
/// shared locks from distinct transactions. An exclusive lock is always alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet {
    locks: Vec<Lock>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to grant `permission` to `txn_id`. Returns true if the transaction
    /// now holds at least that permission.
    pub fn try_grant(&mut self, txn_id: TxnId, permission: Permission) -> bool {
        match self.locks.len() {
            0 => {
                self.locks.push(Lock { txn_id, permission });
                true
            }
            1 => {
                let held = self.locks[0];
                if held.txn_id == txn_id {
                    // Sole holder: re-acquire is a no-op, shared upgrades in place
                    if permission == Permission::Exclusive {
                        self.locks[0].permission = Permission::Exclusive;
                    }
                    true
                } else if held.permission == Permission::Shared && permission == Permission::Shared {
                    self.locks.push(Lock { txn_id, permission });
                    true
                } else {
                    false
                }
            }
            _ => {
                // Two or more holders are all shared
                if permission == Permission::Exclusive {
                    return false;
                }
                if !self.holds(txn_id) {
                    self.locks.push(Lock { txn_id, permission });
                }
                true
            }
        }
    }

    /// Remove the lock of `txn_id`. Returns true if one was removed.
    pub fn release(&mut self, txn_id: TxnId) -> bool {
        match self.locks.iter().position(|lock| lock.txn_id == txn_id) {
            Some(pos) => {
                self.locks.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn holds(&self, txn_id: TxnId) -> bool {
        self.locks.iter().any(|lock| lock.txn_id == txn_id)
    }

    /// Permission held by `txn_id`, if any
    pub fn permission_of(&self, txn_id: TxnId) -> Option<Permission> {
        self.locks
            .iter()
            .find(|lock| lock.txn_id == txn_id)
            .map(|lock| lock.permission)
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn locks(&self) -> &[Lock] {
        &self.locks
    }

    /// Check the sharing invariant
    pub fn is_consistent(&self) -> bool {
        match self.locks.len() {
            0 | 1 => true,
            _ => {
                let all_shared = self.locks.iter().all(|lock| lock.permission == Permission::Shared);
                let distinct = self
                    .locks
                    .iter()
                    .enumerate()
                    .all(|(i, a)| self.locks[i + 1..].iter().all(|b| b.txn_id != a.txn_id));
                all_shared && distinct
            }
        }
    }
}
