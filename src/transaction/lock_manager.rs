use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{SmallError, SmallResult};
use crate::page_id::PageId;
use crate::transaction::{Permission, TransactionId};

/// Every Nth failed grant attempt by a waiter triggers a deadlock check.
const DEADLOCK_CHECK_INTERVAL: u32 = 10;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shared,
    Exclusive,
}

#[derive(Debug, Default)]
struct LockState {
    mode: Option<Mode>,
    holders: HashSet<TransactionId>,
}

#[derive(Default)]
struct Inner {
    locks: HashMap<PageId, LockState>,
    /// Pages each transaction is currently blocked trying to acquire.
    want: HashMap<TransactionId, HashSet<PageId>>,
    /// Pages each transaction currently holds a lock on — the reverse index
    /// used both by `release_all_locks` and as the deadlock check's "mine".
    held_by_tx: HashMap<TransactionId, HashSet<PageId>>,
}

/// Page-granularity two-phase lock manager with waits-for-graph deadlock
/// detection, using a frontier-expansion BFS cycle check rather than a
/// DFS/visited/rec_stack formulation.
pub struct LockManager {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until `mode` is granted on `pid` for `tid`, or returns
    /// `TransactionAborted` if a deadlock involving `tid` is detected.
    pub fn lock_page(&self, tid: TransactionId, pid: PageId, mode: Permission) -> SmallResult {
        let mut inner = self.inner.lock().unwrap();
        let mut attempts: u32 = 0;

        loop {
            if Self::try_grant(&mut inner, pid, tid, mode) {
                if let Some(pages) = inner.want.get_mut(&tid) {
                    pages.remove(&pid);
                }
                log::debug!("{} granted {:?} on {}", tid, mode, pid);
                return Ok(());
            }

            inner.want.entry(tid).or_default().insert(pid);
            attempts += 1;

            if attempts % DEADLOCK_CHECK_INTERVAL == 0 && Self::has_cycle(&inner, tid) {
                inner.want.entry(tid).or_default().remove(&pid);
                log::warn!("{} aborted waiting on {}: deadlock detected", tid, pid);
                return Err(SmallError::transaction_aborted(&format!(
                    "deadlock detected while {} waited for {}",
                    tid, pid
                )));
            }

            let (guard, _timeout) = self
                .condvar
                .wait_timeout(inner, POLL_INTERVAL)
                .expect("lock manager mutex poisoned");
            inner = guard;
        }
    }

    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        let mut inner = self.inner.lock().unwrap();
        Self::release_locked(&mut inner, tid, pid);
        self.condvar.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .locks
            .get(&pid)
            .map(|s| s.holders.contains(&tid))
            .unwrap_or(false)
    }

    /// Idempotent: releases every page `tid` holds. Calling it again on a
    /// transaction with nothing left held is a no-op.
    pub fn release_all_locks(&self, tid: TransactionId) {
        let mut inner = self.inner.lock().unwrap();
        let pages: Vec<PageId> = inner
            .held_by_tx
            .get(&tid)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for pid in pages {
            Self::release_locked(&mut inner, tid, pid);
        }
        inner.want.remove(&tid);
        inner.held_by_tx.remove(&tid);
        self.condvar.notify_all();
    }

    fn release_locked(inner: &mut Inner, tid: TransactionId, pid: PageId) {
        if let Some(state) = inner.locks.get_mut(&pid) {
            state.holders.remove(&tid);
            if state.holders.is_empty() {
                state.mode = None;
            }
        }
        if let Some(pages) = inner.held_by_tx.get_mut(&tid) {
            pages.remove(&pid);
        }
    }

    fn try_grant(inner: &mut Inner, pid: PageId, tid: TransactionId, mode: Permission) -> bool {
        let state = inner.locks.entry(pid).or_default();

        let granted = match (state.mode, mode) {
            (None, _) => true,
            (Some(Mode::Shared), Permission::ReadOnly) => true,
            (Some(Mode::Shared), Permission::ReadWrite) => {
                state.holders.len() == 1 && state.holders.contains(&tid)
            }
            (Some(Mode::Exclusive), Permission::ReadOnly) => {
                state.holders.len() == 1 && state.holders.contains(&tid)
            }
            (Some(Mode::Exclusive), Permission::ReadWrite) => {
                state.holders.len() == 1 && state.holders.contains(&tid)
            }
        };

        if !granted {
            return false;
        }

        state.mode = Some(match mode {
            Permission::ReadOnly => Mode::Shared,
            Permission::ReadWrite => Mode::Exclusive,
        });
        state.holders.insert(tid);
        inner.held_by_tx.entry(tid).or_default().insert(pid);
        true
    }

    /// Conservative cycle check: expands the waits-for frontier starting
    /// from the pages `tid` is blocked on; if the frontier ever reaches a
    /// page `tid` itself holds, `tid` participates in a cycle.
    fn has_cycle(inner: &Inner, tid: TransactionId) -> bool {
        let mine = match inner.held_by_tx.get(&tid) {
            Some(pages) if !pages.is_empty() => pages,
            _ => return false,
        };

        let mut frontier: HashSet<PageId> = inner.want.get(&tid).cloned().unwrap_or_default();
        let mut seen_owners: HashSet<TransactionId> = HashSet::new();

        loop {
            if frontier.is_empty() {
                return false;
            }

            let mut owners = HashSet::new();
            for pid in &frontier {
                if let Some(state) = inner.locks.get(pid) {
                    for holder in &state.holders {
                        if *holder != tid {
                            owners.insert(*holder);
                        }
                    }
                }
            }
            if owners.is_empty() {
                return false;
            }

            let mut next_frontier = HashSet::new();
            for owner in &owners {
                if !seen_owners.insert(*owner) {
                    // already expanded this transaction's waits-for edges
                    continue;
                }
                if let Some(pages) = inner.want.get(owner) {
                    next_frontier.extend(pages.iter().copied());
                }
            }

            if next_frontier.iter().any(|pid| mine.contains(pid)) {
                return true;
            }
            if next_frontier.is_empty() {
                return false;
            }
            frontier = next_frontier;
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_id::PageCategory;
    use std::sync::Arc;
    use std::thread;

    fn pid(n: u32) -> PageId {
        PageId::new(1, n, PageCategory::Leaf)
    }

    #[test]
    fn test_shared_locks_are_concurrent() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        lm.lock_page(t1, pid(1), Permission::ReadOnly).unwrap();
        lm.lock_page(t2, pid(1), Permission::ReadOnly).unwrap();
        assert!(lm.holds_lock(t1, pid(1)));
        assert!(lm.holds_lock(t2, pid(1)));
    }

    #[test]
    fn test_exclusive_excludes_others() {
        let lm = Arc::new(LockManager::new());
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        lm.lock_page(t1, pid(1), Permission::ReadWrite).unwrap();

        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || {
            // t2 should block; release by the main thread unblocks it.
            lm2.lock_page(t2, pid(1), Permission::ReadWrite).unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!lm.holds_lock(t2, pid(1)));
        lm.release_all_locks(t1);
        handle.join().unwrap();
        assert!(lm.holds_lock(t2, pid(1)));
    }

    #[test]
    fn test_release_all_locks_is_idempotent() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        lm.lock_page(t1, pid(1), Permission::ReadWrite).unwrap();
        lm.release_all_locks(t1);
        lm.release_all_locks(t1);
        assert!(!lm.holds_lock(t1, pid(1)));
    }

    #[test]
    fn test_deadlock_detected() {
        let lm = Arc::new(LockManager::new());
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();

        // t1 reads P, t2 reads Q.
        lm.lock_page(t1, pid(1), Permission::ReadOnly).unwrap();
        lm.lock_page(t2, pid(2), Permission::ReadOnly).unwrap();

        let lm_a = Arc::clone(&lm);
        let h1 = thread::spawn(move || lm_a.lock_page(t1, pid(2), Permission::ReadWrite));
        thread::sleep(Duration::from_millis(30));
        let lm_b = Arc::clone(&lm);
        let h2 = thread::spawn(move || lm_b.lock_page(t2, pid(1), Permission::ReadWrite));

        let r1 = h1.join().unwrap();
        let r2 = h2.join().unwrap();
        // exactly one of the two must be aborted for the deadlock to resolve
        assert!(r1.is_err() || r2.is_err());
    }

    #[test]
    fn test_deadlock_detected_on_single_page_upgrade_race() {
        let lm = Arc::new(LockManager::new());
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();

        // both read the same page, then both try to upgrade to exclusive.
        lm.lock_page(t1, pid(1), Permission::ReadOnly).unwrap();
        lm.lock_page(t2, pid(1), Permission::ReadOnly).unwrap();

        let lm_a = Arc::clone(&lm);
        let h1 = thread::spawn(move || lm_a.lock_page(t1, pid(1), Permission::ReadWrite));
        thread::sleep(Duration::from_millis(30));
        let lm_b = Arc::clone(&lm);
        let h2 = thread::spawn(move || lm_b.lock_page(t2, pid(1), Permission::ReadWrite));

        let r1 = h1.join().unwrap();
        let r2 = h2.join().unwrap();
        assert!(r1.is_err() || r2.is_err());
    }
}
