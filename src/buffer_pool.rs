use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::btree::page::AnyPage;
use crate::common::database::Database;
use crate::error::{SmallError, SmallResult};
use crate::page_id::PageId;
use crate::transaction::{Permission, TransactionId};

/// Default page size; overridable only through `set_page_size`, which is
/// gated to test builds (unit tests and, via the `test-utils` feature,
/// integration tests) so production code can rely on the constant.
const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

struct Inner {
    pages: HashMap<PageId, Arc<RwLock<AnyPage>>>,
    clock: Vec<Option<PageId>>,
    ref_bits: Vec<bool>,
    clock_index: usize,
}

/// Bounded page cache gating every access through the lock manager, with
/// clock (second-chance) replacement that never evicts a dirty page
/// (NO-STEAL).
pub struct BufferPool {
    capacity: AtomicUsize,
    inner: std::sync::Mutex<Inner>,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: AtomicUsize::new(capacity),
            inner: std::sync::Mutex::new(Inner {
                pages: HashMap::new(),
                clock: vec![None; capacity],
                ref_bits: vec![false; capacity],
                clock_index: 0,
            }),
        }
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::SeqCst)
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_page_size(size: usize) {
        PAGE_SIZE.store(size, Ordering::SeqCst);
    }

    /// Test-only hook letting integration tests exercise eviction under a
    /// small capacity against the process-wide `Database` singleton, which
    /// otherwise always constructs its pool with `DEFAULT_BUFFER_POOL_CAPACITY`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_capacity_for_test(&self, new_capacity: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.clear();
        inner.clock = vec![None; new_capacity];
        inner.ref_bits = vec![false; new_capacity];
        inner.clock_index = 0;
        self.capacity.store(new_capacity, Ordering::SeqCst);
    }

    /// Acquires the page lock, then returns a cached page or loads it
    /// through the owning `DbFile`. Lock acquisition happens before the
    /// pool mutex is taken so a blocked waiter never holds the pool lock.
    pub fn get_page(&self, tid: TransactionId, pid: PageId, mode: Permission) -> SmallResult<Arc<RwLock<AnyPage>>> {
        Database::global().lock_manager().lock_page(tid, pid, mode)?;

        let mut inner = self.inner.lock().unwrap();
        if let Some(page) = inner.pages.get(&pid) {
            self.touch(&mut inner, pid);
            return Ok(Arc::clone(page));
        }

        let db_file = Database::global().catalog().get_db_file(pid.table_id)?;
        let page = db_file.read_page(pid)?;
        self.insert_into_cache(&mut inner, pid, page)?;
        Ok(Arc::clone(inner.pages.get(&pid).unwrap()))
    }

    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        Database::global().lock_manager().release_page(tid, pid);
    }

    /// Dispatches to the owning `DbFile`; every dirtied page it returns is
    /// already marked dirty and cached by the time this returns, since the
    /// file implementations mutate pages in place through this same pool.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: i32, tuple: crate::tuple::Tuple) -> SmallResult<Vec<PageId>> {
        let db_file = Database::global().catalog().get_db_file(table_id)?;
        db_file.insert_tuple(tid, tuple)
    }

    pub fn delete_tuple(&self, tid: TransactionId, tuple: &crate::tuple::Tuple) -> SmallResult<Vec<PageId>> {
        let record_id = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;
        let db_file = Database::global().catalog().get_db_file(record_id.page_id.table_id)?;
        db_file.delete_tuple(tid, tuple)
    }

    /// Installs an already-fetched, already-dirtied page into the cache
    /// (used by structural operations that allocate brand-new pages).
    pub fn cache_page(&self, pid: PageId, page: AnyPage) -> SmallResult {
        let mut inner = self.inner.lock().unwrap();
        self.insert_into_cache(&mut inner, pid, page)
    }

    pub fn discard_page(&self, pid: PageId) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.remove(&pid);
        for i in 0..self.capacity() {
            if inner.clock[i] == Some(pid) {
                inner.clock[i] = None;
                inner.ref_bits[i] = false;
            }
        }
    }

    pub fn flush_all_pages(&self) -> SmallResult {
        let inner = self.inner.lock().unwrap();
        for (pid, page) in inner.pages.iter() {
            let mut p = page.write().unwrap();
            if p.is_dirty().is_some() {
                Self::flush_locked(*pid, &mut p)?;
            }
        }
        Ok(())
    }

    /// Commit: force-logs and flushes every page dirtied by `tid`, then
    /// clears its dirty flag. Abort: re-reads each such page from disk,
    /// relying on NO-STEAL to guarantee the on-disk image is untouched —
    /// no log-based undo happens here.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> SmallResult {
        let mut inner = self.inner.lock().unwrap();
        let dirtied: Vec<PageId> = inner
            .pages
            .iter()
            .filter(|(_, p)| p.read().unwrap().is_dirty() == Some(tid))
            .map(|(pid, _)| *pid)
            .collect();

        for pid in dirtied {
            if commit {
                let mut page = inner.pages.get(&pid).unwrap().write().unwrap();
                Self::flush_locked(pid, &mut page)?;
            } else {
                let db_file = Database::global().catalog().get_db_file(pid.table_id)?;
                let fresh = db_file.read_page(pid)?;
                if let Some(existing) = inner.pages.get(&pid) {
                    *existing.write().unwrap() = fresh;
                }
            }
        }
        drop(inner);

        if commit {
            Database::global().log_manager().log_commit(tid)?;
        } else {
            Database::global().log_manager().log_abort(tid)?;
        }

        Database::global().lock_manager().release_all_locks(tid);
        Ok(())
    }

    fn flush_locked(pid: PageId, page: &mut AnyPage) -> SmallResult {
        let before = page.get_before_image();
        let after = page.get_page_data(Self::get_page_size());
        let tid = page.is_dirty().expect("flush_locked called on a clean page");
        Database::global().log_manager().log_write(tid, &before, &after)?;
        Database::global().log_manager().force()?;
        let db_file = Database::global().catalog().get_db_file(pid.table_id)?;
        db_file.write_page(page)?;
        page.mark_dirty(None);
        page.set_before_image(Self::get_page_size());
        Ok(())
    }

    fn touch(&self, inner: &mut Inner, pid: PageId) {
        for i in 0..self.capacity() {
            if inner.clock[i] == Some(pid) {
                inner.ref_bits[i] = true;
                return;
            }
        }
    }

    fn insert_into_cache(&self, inner: &mut Inner, pid: PageId, mut page: AnyPage) -> SmallResult {
        if page.get_before_image().is_empty() {
            let bytes = page.get_page_data(Self::get_page_size());
            page.set_before_image(bytes);
        }

        if inner.pages.len() >= self.capacity() && !inner.pages.contains_key(&pid) {
            self.evict_one(inner)?;
        }

        let slot = (0..self.capacity())
            .find(|&i| inner.clock[i].is_none())
            .expect("no free clock slot after eviction");
        inner.clock[slot] = Some(pid);
        inner.ref_bits[slot] = true;
        inner.pages.insert(pid, Arc::new(RwLock::new(page)));
        Ok(())
    }

    /// Clock sweep: skip dirty pages (NO-STEAL), give referenced pages a
    /// second chance by clearing their ref bit, otherwise flush-free evict
    /// the first clean, unreferenced page found. Fails if every resident
    /// page turns out to be dirty.
    fn evict_one(&self, inner: &mut Inner) -> SmallResult {
        let mut visited_dirty: HashSet<PageId> = HashSet::new();

        loop {
            inner.clock_index = (inner.clock_index + 1) % self.capacity();
            let slot_pid = match inner.clock[inner.clock_index] {
                Some(p) => p,
                None => return Ok(()),
            };

            let is_dirty = inner.pages.get(&slot_pid).unwrap().read().unwrap().is_dirty().is_some();
            if is_dirty {
                visited_dirty.insert(slot_pid);
                if visited_dirty.len() >= inner.pages.len() {
                    return Err(SmallError::db_exception("All dirty pages"));
                }
                continue;
            }

            if inner.ref_bits[inner.clock_index] {
                inner.ref_bits[inner.clock_index] = false;
                continue;
            }

            inner.pages.remove(&slot_pid);
            inner.clock[inner.clock_index] = None;
            log::debug!("evicted clean page {}", slot_pid);
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_id::PageCategory;

    #[test]
    fn test_capacity_is_respected_by_clock_array() {
        let bp = BufferPool::new(2);
        assert_eq!(bp.capacity(), 2);
        let inner = bp.inner.lock().unwrap();
        assert_eq!(inner.clock.len(), 2);
    }

    #[test]
    fn test_discard_page_clears_slot() {
        let bp = BufferPool::new(2);
        let pid = PageId::new(1, 1, PageCategory::Leaf);
        bp.discard_page(pid);
        let inner = bp.inner.lock().unwrap();
        assert!(!inner.pages.contains_key(&pid));
    }
}
