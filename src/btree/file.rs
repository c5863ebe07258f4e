use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use crate::btree::page::root_pointer_page::ROOT_PTR_PAGE_SIZE;
use crate::btree::page::{AnyPage, BTreeHeaderPage, BTreeInternalPage, BTreeLeafPage, BTreeRootPointerPage, Entry};
use crate::buffer_pool::BufferPool;
use crate::common::database::Database;
use crate::dbfile::{DbFile, DbFileIterator};
use crate::error::{SmallError, SmallResult};
use crate::field::{Field, FieldType};
use crate::page_id::{table_id_from_path, PageCategory, PageId};
use crate::transaction::{Permission, TransactionId};
use crate::tuple::{Tuple, TupleDesc, WrappedTuple};

/// Pages a structural operation has already fetched `ReadWrite` and mutated
/// this call, keyed by id so a later step in the same recursive operation
/// sees the pending update instead of re-fetching a stale copy. Reuses the
/// exact `Arc<RwLock<_>>` the buffer pool already holds, so no separate
/// write-back step is needed: mutating through the `Arc` is visible to the
/// pool immediately.
type DirtyPages = HashMap<PageId, Arc<RwLock<AnyPage>>>;

/// Relational-order EQUALS/GE/GT/LT/LE lookup predicate against the index's
/// key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Equals,
    GreaterThanOrEq,
    GreaterThan,
    LessThan,
    LessThanOrEq,
}

/// B+ tree index file: root-pointer-anchored lookup, leaf/internal split on
/// insert, merge/steal on delete, header-page bitmaps for free-page-number
/// reuse.
pub struct BTreeFile {
    table_id: i32,
    file: Mutex<File>,
    tuple_desc: TupleDesc,
    key_field: usize,
}

impl BTreeFile {
    pub fn new(path: &Path, key_field: usize, tuple_desc: TupleDesc) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        let instance = Self {
            table_id: table_id_from_path(path),
            file: Mutex::new(file),
            tuple_desc,
            key_field,
        };
        instance.init_file()?;
        Ok(instance)
    }

    pub fn key_field(&self) -> usize {
        self.key_field
    }

    fn init_file(&self) -> std::io::Result<()> {
        let needs_init = {
            let file = self.file.lock().unwrap();
            file.metadata()?.len() == 0
        };
        if !needs_init {
            return Ok(());
        }
        let page_size = BufferPool::get_page_size();
        let root_pid = self.root_ptr_pid();
        let leaf_pid = self.pid_at(1, PageCategory::Leaf);
        let root_page = BTreeRootPointerPage::new_empty(root_pid, leaf_pid);
        let leaf_page = BTreeLeafPage::new_empty(leaf_pid, self.tuple_desc.clone(), self.key_field, page_size);
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&root_page.get_page_data())?;
        file.write_all(&leaf_page.get_page_data(page_size))?;
        Ok(())
    }

    fn root_ptr_pid(&self) -> PageId {
        PageId::new(self.table_id, 0, PageCategory::RootPointer)
    }

    fn pid_at(&self, index: u32, category: PageCategory) -> PageId {
        PageId::new(self.table_id, index, category)
    }

    fn offset_of(&self, pid: PageId) -> u64 {
        ROOT_PTR_PAGE_SIZE as u64 + (pid.page_index - 1) as u64 * BufferPool::get_page_size() as u64
    }

    fn zero_page_on_disk(&self, pid: PageId) -> SmallResult {
        let page_size = BufferPool::get_page_size();
        let offset = self.offset_of(pid);
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&vec![0u8; page_size])?;
        Ok(())
    }

    fn grow_file_by_one_page(&self) -> SmallResult<u32> {
        let new_index = self.num_pages() as u32 + 1;
        self.zero_page_on_disk(self.pid_at(new_index, PageCategory::Header))?;
        Ok(new_index)
    }

    /// Fetches through `dirty` if this call already touched the page,
    /// otherwise through the buffer pool (which acquires the page lock
    /// first). `ReadWrite` fetches are remembered in `dirty` for later
    /// lookups within the same structural operation.
    fn get_page(&self, tid: TransactionId, dirty: &mut DirtyPages, pid: PageId, mode: Permission) -> SmallResult<Arc<RwLock<AnyPage>>> {
        if let Some(page) = dirty.get(&pid) {
            return Ok(Arc::clone(page));
        }
        let page = Database::global().buffer_pool().get_page(tid, pid, mode)?;
        if mode == Permission::ReadWrite {
            dirty.insert(pid, Arc::clone(&page));
        }
        Ok(page)
    }

    fn get_root_pid(&self, tid: TransactionId, dirty: &mut DirtyPages) -> SmallResult<PageId> {
        let root_ptr = self.get_page(tid, dirty, self.root_ptr_pid(), Permission::ReadOnly)?;
        let pid = root_ptr.read().unwrap().as_root_pointer().get_root_pid();
        Ok(pid)
    }

    fn find_leaf_page(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        pid: PageId,
        mode: Permission,
        key: Option<&Field>,
    ) -> SmallResult<Arc<RwLock<AnyPage>>> {
        match pid.category {
            PageCategory::Leaf => self.get_page(tid, dirty, pid, mode),
            PageCategory::Internal => {
                let page = self.get_page(tid, dirty, pid, Permission::ReadOnly)?;
                let child = { page.read().unwrap().as_internal().child_for_key(key) };
                self.find_leaf_page(tid, dirty, child, mode, key)
            }
            _ => Err(SmallError::db_exception("find_leaf_page: unexpected page category")),
        }
    }

    fn set_child_parent(&self, tid: TransactionId, dirty: &mut DirtyPages, child_pid: PageId, new_parent_pid: PageId) -> SmallResult {
        let child_arc = self.get_page(tid, dirty, child_pid, Permission::ReadWrite)?;
        let mut child = child_arc.write().unwrap();
        match child_pid.category {
            PageCategory::Leaf => child.as_leaf_mut().set_parent_pid(&new_parent_pid),
            PageCategory::Internal => child.as_internal_mut().set_parent_pid(&new_parent_pid),
            _ => return Err(SmallError::db_exception("set_child_parent: unexpected child category")),
        }
        child.mark_dirty(Some(tid));
        Ok(())
    }

    // ---- free-page-number management (header bitmap chain) ----

    fn allocate_header_page(&self, tid: TransactionId, dirty: &mut DirtyPages) -> SmallResult<PageId> {
        let index = self.grow_file_by_one_page()?;
        let pid = self.pid_at(index, PageCategory::Header);
        let empty = BTreeHeaderPage::new_empty(pid, BufferPool::get_page_size());
        Database::global().buffer_pool().cache_page(pid, AnyPage::Header(empty))?;
        let arc = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadWrite)?;
        arc.write().unwrap().mark_dirty(Some(tid));
        dirty.insert(pid, Arc::clone(&arc));
        Ok(pid)
    }

    fn get_empty_page_no(&self, tid: TransactionId, dirty: &mut DirtyPages) -> SmallResult<u32> {
        let root_ptr_arc = self.get_page(tid, dirty, self.root_ptr_pid(), Permission::ReadWrite)?;
        let mut header_pid = { root_ptr_arc.read().unwrap().as_root_pointer().get_header_pid() };

        if header_pid.is_none() {
            let new_header_pid = self.allocate_header_page(tid, dirty)?;
            let mut rp = root_ptr_arc.write().unwrap();
            rp.as_root_pointer_mut().set_header_pid(Some(new_header_pid));
            rp.mark_dirty(Some(tid));
            header_pid = Some(new_header_pid);
        }
        let mut header_pid = header_pid.unwrap();

        loop {
            let header_arc = self.get_page(tid, dirty, header_pid, Permission::ReadWrite)?;
            let slot = { header_arc.read().unwrap().as_header().get_empty_slot() };
            if let Some(slot) = slot {
                let mut header = header_arc.write().unwrap();
                header.as_header_mut().mark_slot_status(slot, true);
                header.mark_dirty(Some(tid));
                return Ok(header_pid.page_index + 1 + slot as u32);
            }

            let next = { header_arc.read().unwrap().as_header().get_next_pid() };
            match next {
                Some(next_pid) => header_pid = next_pid,
                None => {
                    let new_header_pid = self.allocate_header_page(tid, dirty)?;
                    {
                        let mut header = header_arc.write().unwrap();
                        header.as_header_mut().set_next_pid(Some(new_header_pid));
                        header.mark_dirty(Some(tid));
                    }
                    let new_header_arc = self.get_page(tid, dirty, new_header_pid, Permission::ReadWrite)?;
                    new_header_arc.write().unwrap().as_header_mut().set_prev_pid(Some(header_pid));
                    header_pid = new_header_pid;
                }
            }
        }
    }

    /// Marks `pid`'s slot free in whichever header page covers its range,
    /// discarding it from the buffer pool and `dirty` first so nothing
    /// stale lingers for a future reuse of this page number.
    fn set_empty_page(&self, tid: TransactionId, dirty: &mut DirtyPages, pid: PageId) -> SmallResult {
        Database::global().buffer_pool().discard_page(pid);
        dirty.remove(&pid);

        let root_ptr_arc = self.get_page(tid, dirty, self.root_ptr_pid(), Permission::ReadWrite)?;
        let header_pid_opt = { root_ptr_arc.read().unwrap().as_root_pointer().get_header_pid() };
        let mut header_pid = match header_pid_opt {
            Some(p) => p,
            None => return Ok(()),
        };

        loop {
            let header_arc = self.get_page(tid, dirty, header_pid, Permission::ReadWrite)?;
            let base = header_pid.page_index + 1;
            let slot_count = { header_arc.read().unwrap().as_header().slot_count() };
            if pid.page_index >= base && (pid.page_index - base) < slot_count as u32 {
                let mut header = header_arc.write().unwrap();
                header.as_header_mut().mark_slot_status((pid.page_index - base) as usize, false);
                header.mark_dirty(Some(tid));
                return Ok(());
            }
            let next = { header_arc.read().unwrap().as_header().get_next_pid() };
            match next {
                Some(next_pid) => header_pid = next_pid,
                None => return Ok(()),
            }
        }
    }

    fn get_empty_leaf_page(&self, tid: TransactionId, dirty: &mut DirtyPages) -> SmallResult<Arc<RwLock<AnyPage>>> {
        let page_no = self.get_empty_page_no(tid, dirty)?;
        let pid = self.pid_at(page_no, PageCategory::Leaf);
        self.zero_page_on_disk(pid)?;
        Database::global().buffer_pool().discard_page(pid);
        dirty.remove(&pid);
        let empty = BTreeLeafPage::new_empty(pid, self.tuple_desc.clone(), self.key_field, BufferPool::get_page_size());
        Database::global().buffer_pool().cache_page(pid, AnyPage::Leaf(empty))?;
        let arc = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadWrite)?;
        arc.write().unwrap().mark_dirty(Some(tid));
        dirty.insert(pid, Arc::clone(&arc));
        Ok(arc)
    }

    fn get_empty_internal_page(&self, tid: TransactionId, dirty: &mut DirtyPages) -> SmallResult<Arc<RwLock<AnyPage>>> {
        let page_no = self.get_empty_page_no(tid, dirty)?;
        let pid = self.pid_at(page_no, PageCategory::Internal);
        self.zero_page_on_disk(pid)?;
        Database::global().buffer_pool().discard_page(pid);
        dirty.remove(&pid);
        let key_type = self.tuple_desc.field_type(self.key_field);
        let empty = BTreeInternalPage::new_empty(pid, key_type, BufferPool::get_page_size());
        Database::global().buffer_pool().cache_page(pid, AnyPage::Internal(empty))?;
        let arc = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadWrite)?;
        arc.write().unwrap().mark_dirty(Some(tid));
        dirty.insert(pid, Arc::clone(&arc));
        Ok(arc)
    }

    // ---- insert path ----

    fn get_parent_with_empty_slots(&self, tid: TransactionId, dirty: &mut DirtyPages, parent_pid: PageId, key: &Field) -> SmallResult<Arc<RwLock<AnyPage>>> {
        match parent_pid.category {
            PageCategory::RootPointer => {
                let new_root_arc = self.get_empty_internal_page(tid, dirty)?;
                let new_root_pid = { new_root_arc.read().unwrap().page_id() };
                let root_ptr_arc = self.get_page(tid, dirty, self.root_ptr_pid(), Permission::ReadWrite)?;
                let mut rp = root_ptr_arc.write().unwrap();
                rp.as_root_pointer_mut().set_root_pid(new_root_pid);
                rp.mark_dirty(Some(tid));
                Ok(new_root_arc)
            }
            PageCategory::Internal => {
                let parent_arc = self.get_page(tid, dirty, parent_pid, Permission::ReadWrite)?;
                let is_full = { parent_arc.read().unwrap().as_internal().empty_slots_count() == 0 };
                if is_full {
                    self.split_internal_page(tid, dirty, parent_arc, key)
                } else {
                    Ok(parent_arc)
                }
            }
            _ => Err(SmallError::db_exception("get_parent_with_empty_slots: unexpected parent category")),
        }
    }

    /// Splits a full leaf in two: moves the upper `floor(n/2)` tuples
    /// (via the reverse iterator, keeping sort order) to a brand-new
    /// sibling, fixes the sibling chain, copies the new sibling's first
    /// key up into the parent as the separator, and returns whichever half
    /// `key` belongs in.
    fn split_leaf_page(&self, tid: TransactionId, dirty: &mut DirtyPages, leaf_arc: Arc<RwLock<AnyPage>>, key: &Field) -> SmallResult<Arc<RwLock<AnyPage>>> {
        let leaf_pid = { leaf_arc.read().unwrap().page_id() };
        let original_parent_pid = { leaf_arc.read().unwrap().as_leaf().get_parent_pid() };
        let old_right_pid = { leaf_arc.read().unwrap().as_leaf().get_right_pid() };

        let moved: Vec<WrappedTuple> = {
            let leaf = leaf_arc.read().unwrap();
            let move_count = leaf.as_leaf().tuples_count() / 2;
            leaf.as_leaf().iter().rev().take(move_count).collect()
        };

        let new_sibling_arc = self.get_empty_leaf_page(tid, dirty)?;
        let new_sibling_pid = { new_sibling_arc.read().unwrap().page_id() };

        {
            let mut leaf = leaf_arc.write().unwrap();
            let mut sibling = new_sibling_arc.write().unwrap();
            for wt in &moved {
                leaf.as_leaf_mut().delete_tuple(wt.record_id.slot_index);
                sibling.as_leaf_mut().insert_tuple(wt.tuple.clone());
            }
            sibling.as_leaf_mut().set_right_pid(old_right_pid);
            sibling.as_leaf_mut().set_left_pid(Some(leaf_pid));
            leaf.as_leaf_mut().set_right_pid(Some(new_sibling_pid));
            leaf.mark_dirty(Some(tid));
            sibling.mark_dirty(Some(tid));
        }

        if let Some(old_right_pid) = old_right_pid {
            let older_right_arc = self.get_page(tid, dirty, old_right_pid, Permission::ReadWrite)?;
            let mut r = older_right_arc.write().unwrap();
            r.as_leaf_mut().set_left_pid(Some(new_sibling_pid));
            r.mark_dirty(Some(tid));
        }

        let copied_key = {
            new_sibling_arc
                .read()
                .unwrap()
                .as_leaf()
                .iter()
                .next()
                .expect("new sibling non-empty after split")
                .get_field(self.key_field)
                .clone()
        };

        let parent_arc = self.get_parent_with_empty_slots(tid, dirty, original_parent_pid, &copied_key)?;
        let parent_pid = { parent_arc.read().unwrap().page_id() };
        {
            let mut parent = parent_arc.write().unwrap();
            parent.as_internal_mut().insert_entry(copied_key.clone(), leaf_pid, new_sibling_pid);
            parent.mark_dirty(Some(tid));
        }
        leaf_arc.write().unwrap().as_leaf_mut().set_parent_pid(&parent_pid);
        new_sibling_arc.write().unwrap().as_leaf_mut().set_parent_pid(&parent_pid);

        if key >= &copied_key {
            Ok(new_sibling_arc)
        } else {
            Ok(leaf_arc)
        }
    }

    /// Mirrors `split_leaf_page` one level up: the middle entry is pulled
    /// entirely out (not duplicated into either half) and pushed into the
    /// parent; its right child is reparented to the new sibling alongside
    /// every entry moved above it.
    fn split_internal_page(&self, tid: TransactionId, dirty: &mut DirtyPages, page_arc: Arc<RwLock<AnyPage>>, key: &Field) -> SmallResult<Arc<RwLock<AnyPage>>> {
        let page_pid = { page_arc.read().unwrap().page_id() };
        let key_type = { page_arc.read().unwrap().as_internal().key_type() };
        let original_parent_pid = { page_arc.read().unwrap().as_internal().get_parent_pid() };

        let (moved_entries, pushed_key, pushed_right) = {
            let page = page_arc.read().unwrap();
            let internal = page.as_internal();
            let total = internal.entries_count();
            let move_count = total / 2;
            let split_idx = total - move_count;
            let moved: Vec<Entry> = (split_idx..total).map(|i| internal.entry(i)).collect();
            let pushed = internal.entry(split_idx - 1);
            (moved, pushed.key.clone(), pushed.right)
        };

        {
            let mut page = page_arc.write().unwrap();
            let total = page.as_internal().entries_count();
            let move_count = total / 2;
            let remove_from = total - move_count - 1;
            for i in (remove_from..total).rev() {
                page.as_internal_mut().delete_key_and_right_child(i);
            }
            page.mark_dirty(Some(tid));
        }

        let new_sibling_arc = self.get_empty_internal_page(tid, dirty)?;
        let new_sibling_pid = { new_sibling_arc.read().unwrap().page_id() };
        {
            let page_size = BufferPool::get_page_size();
            let mut guard = new_sibling_arc.write().unwrap();
            *guard = AnyPage::Internal(BTreeInternalPage::new_from_entries(new_sibling_pid, key_type, page_size, &moved_entries));
            guard.mark_dirty(Some(tid));
        }

        self.set_child_parent(tid, dirty, pushed_right, new_sibling_pid)?;
        for e in &moved_entries {
            self.set_child_parent(tid, dirty, e.right, new_sibling_pid)?;
        }

        let parent_arc = self.get_parent_with_empty_slots(tid, dirty, original_parent_pid, &pushed_key)?;
        let parent_pid = { parent_arc.read().unwrap().page_id() };
        {
            let mut parent = parent_arc.write().unwrap();
            parent.as_internal_mut().insert_entry(pushed_key.clone(), page_pid, new_sibling_pid);
            parent.mark_dirty(Some(tid));
        }
        page_arc.write().unwrap().as_internal_mut().set_parent_pid(&parent_pid);
        new_sibling_arc.write().unwrap().as_internal_mut().set_parent_pid(&parent_pid);

        if key > &pushed_key {
            Ok(new_sibling_arc)
        } else {
            Ok(page_arc)
        }
    }

    // ---- delete path ----

    /// Finds the left/right sibling page ids of `child_pid` by locating it
    /// in `parent`'s children array: a match at index `j < len` means
    /// `child_pid` is an entry's left child (so the left sibling is the
    /// previous entry's left child, the right sibling is this entry's
    /// right child); a match at `j == len` means it's the last entry's
    /// right child (so there is no right sibling).
    fn sibling_pids(parent: &BTreeInternalPage, child_pid: PageId) -> SmallResult<(Option<PageId>, Option<PageId>)> {
        let j = parent
            .index_of_left_child(child_pid)
            .ok_or_else(|| SmallError::db_exception("sibling_pids: child not found in parent"))?;
        let len = parent.entries_count();
        if j == len {
            let left = if len > 0 { Some(parent.entry(len - 1).left) } else { None };
            Ok((left, None))
        } else {
            let left = if j > 0 { Some(parent.entry(j - 1).left) } else { None };
            let right = Some(parent.entry(j).right);
            Ok((left, right))
        }
    }

    fn handle_min_occupancy_leaf(&self, tid: TransactionId, dirty: &mut DirtyPages, pid: PageId) -> SmallResult {
        let leaf_arc = self.get_page(tid, dirty, pid, Permission::ReadWrite)?;
        let parent_pid = { leaf_arc.read().unwrap().as_leaf().get_parent_pid() };
        if parent_pid.category == PageCategory::RootPointer {
            return Ok(());
        }
        let parent_arc = self.get_page(tid, dirty, parent_pid, Permission::ReadWrite)?;
        let (left_pid, right_pid) = {
            let parent = parent_arc.read().unwrap();
            Self::sibling_pids(parent.as_internal(), pid)?
        };

        if let Some(left_pid) = left_pid {
            let left_arc = self.get_page(tid, dirty, left_pid, Permission::ReadWrite)?;
            self.balance_leaves(tid, dirty, left_arc, leaf_arc, Arc::clone(&parent_arc))
        } else if let Some(right_pid) = right_pid {
            let right_arc = self.get_page(tid, dirty, right_pid, Permission::ReadWrite)?;
            self.balance_leaves(tid, dirty, leaf_arc, right_arc, Arc::clone(&parent_arc))
        } else {
            Err(SmallError::db_exception("leaf page has no sibling to balance with"))
        }
    }

    fn balance_leaves(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        left_arc: Arc<RwLock<AnyPage>>,
        right_arc: Arc<RwLock<AnyPage>>,
        parent_arc: Arc<RwLock<AnyPage>>,
    ) -> SmallResult {
        let left_pid = { left_arc.read().unwrap().page_id() };
        let (entry_idx, left_count, right_count, slot_count) = {
            let parent = parent_arc.read().unwrap();
            let idx = parent
                .as_internal()
                .index_of_left_child(left_pid)
                .ok_or_else(|| SmallError::db_exception("balance_leaves: left child not found in parent"))?;
            let l = left_arc.read().unwrap();
            let r = right_arc.read().unwrap();
            (idx, l.as_leaf().tuples_count(), r.as_leaf().tuples_count(), l.as_leaf().slot_count())
        };

        if left_count + right_count <= slot_count {
            return self.merge_leaves(tid, dirty, left_arc, right_arc, parent_arc, entry_idx);
        }
        let move_count = (left_count + right_count) / 2 - left_count.min(right_count);
        if move_count == 0 {
            return self.merge_leaves(tid, dirty, left_arc, right_arc, parent_arc, entry_idx);
        }

        let mut boundary: Option<Field> = None;
        if left_count < right_count {
            let moved: Vec<WrappedTuple> = { right_arc.read().unwrap().as_leaf().iter().take(move_count).collect() };
            let mut l = left_arc.write().unwrap();
            let mut r = right_arc.write().unwrap();
            for wt in &moved {
                l.as_leaf_mut().insert_tuple(wt.tuple.clone());
                r.as_leaf_mut().delete_tuple(wt.record_id.slot_index);
                boundary = Some(wt.get_field(self.key_field).clone());
            }
            l.mark_dirty(Some(tid));
            r.mark_dirty(Some(tid));
        } else {
            let moved: Vec<WrappedTuple> = { left_arc.read().unwrap().as_leaf().iter().rev().take(move_count).collect() };
            let mut l = left_arc.write().unwrap();
            let mut r = right_arc.write().unwrap();
            for wt in &moved {
                r.as_leaf_mut().insert_tuple(wt.tuple.clone());
                l.as_leaf_mut().delete_tuple(wt.record_id.slot_index);
                boundary = Some(wt.get_field(self.key_field).clone());
            }
            l.mark_dirty(Some(tid));
            r.mark_dirty(Some(tid));
        }

        let key = boundary.expect("move_count > 0 implies at least one tuple moved");
        let mut parent = parent_arc.write().unwrap();
        parent.as_internal_mut().update_key(entry_idx, key);
        parent.mark_dirty(Some(tid));
        Ok(())
    }

    fn merge_leaves(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        left_arc: Arc<RwLock<AnyPage>>,
        right_arc: Arc<RwLock<AnyPage>>,
        parent_arc: Arc<RwLock<AnyPage>>,
        entry_idx: usize,
    ) -> SmallResult {
        let left_pid = { left_arc.read().unwrap().page_id() };
        let right_pid = { right_arc.read().unwrap().page_id() };
        let moved: Vec<WrappedTuple> = { right_arc.read().unwrap().as_leaf().iter().collect() };
        let new_right_sibling = { right_arc.read().unwrap().as_leaf().get_right_pid() };

        {
            let mut l = left_arc.write().unwrap();
            for wt in &moved {
                l.as_leaf_mut().insert_tuple(wt.tuple.clone());
            }
            l.as_leaf_mut().set_right_pid(new_right_sibling);
            l.mark_dirty(Some(tid));
        }

        if let Some(newer_pid) = new_right_sibling {
            let newer_arc = self.get_page(tid, dirty, newer_pid, Permission::ReadWrite)?;
            let mut newer = newer_arc.write().unwrap();
            newer.as_leaf_mut().set_left_pid(Some(left_pid));
            newer.mark_dirty(Some(tid));
        }

        self.set_empty_page(tid, dirty, right_pid)?;
        self.delete_parent_entry(tid, dirty, parent_arc, entry_idx, left_pid)
    }

    fn handle_min_occupancy_internal(&self, tid: TransactionId, dirty: &mut DirtyPages, pid: PageId) -> SmallResult {
        let page_arc = self.get_page(tid, dirty, pid, Permission::ReadWrite)?;
        let parent_pid = { page_arc.read().unwrap().as_internal().get_parent_pid() };
        if parent_pid.category == PageCategory::RootPointer {
            return Ok(());
        }
        let parent_arc = self.get_page(tid, dirty, parent_pid, Permission::ReadWrite)?;
        let (left_pid, right_pid) = {
            let parent = parent_arc.read().unwrap();
            Self::sibling_pids(parent.as_internal(), pid)?
        };

        if let Some(left_pid) = left_pid {
            let left_arc = self.get_page(tid, dirty, left_pid, Permission::ReadWrite)?;
            self.balance_internals(tid, dirty, left_arc, page_arc, Arc::clone(&parent_arc))
        } else if let Some(right_pid) = right_pid {
            let right_arc = self.get_page(tid, dirty, right_pid, Permission::ReadWrite)?;
            self.balance_internals(tid, dirty, page_arc, right_arc, Arc::clone(&parent_arc))
        } else {
            Err(SmallError::db_exception("internal page has no sibling to balance with"))
        }
    }

    /// Rotates entries through the parent's separator key rather than
    /// moving them bare: the redistributed entries' key meaning shifts by
    /// one position, so the parent's own key is threaded through the loop
    /// as `middle_key` and written back once the move completes.
    fn balance_internals(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        left_arc: Arc<RwLock<AnyPage>>,
        right_arc: Arc<RwLock<AnyPage>>,
        parent_arc: Arc<RwLock<AnyPage>>,
    ) -> SmallResult {
        let left_pid = { left_arc.read().unwrap().page_id() };
        let right_pid = { right_arc.read().unwrap().page_id() };
        let (entry_idx, left_count, right_count, max_entries) = {
            let parent = parent_arc.read().unwrap();
            let idx = parent
                .as_internal()
                .index_of_left_child(left_pid)
                .ok_or_else(|| SmallError::db_exception("balance_internals: left child not found in parent"))?;
            let l = left_arc.read().unwrap();
            let r = right_arc.read().unwrap();
            (idx, l.as_internal().entries_count(), r.as_internal().entries_count(), l.as_internal().max_entries())
        };

        if left_count + right_count + 1 <= max_entries {
            return self.merge_internals(tid, dirty, left_arc, right_arc, parent_arc, entry_idx);
        }
        let move_count = (left_count + right_count) / 2 - left_count.min(right_count);
        if move_count == 0 {
            return self.merge_internals(tid, dirty, left_arc, right_arc, parent_arc, entry_idx);
        }

        let parent_key = { parent_arc.read().unwrap().as_internal().entry(entry_idx).key.clone() };
        let mut middle_key = parent_key;

        if left_count < right_count {
            let entries: Vec<Entry> = { right_arc.read().unwrap().as_internal().iter().take(move_count).collect() };
            let mut edge_child = { left_arc.read().unwrap().as_internal().entry(left_count - 1).right };
            for e in &entries {
                let new_right = e.left;
                {
                    let mut l = left_arc.write().unwrap();
                    l.as_internal_mut().insert_entry(middle_key.clone(), edge_child, new_right);
                    l.mark_dirty(Some(tid));
                }
                self.set_child_parent(tid, dirty, new_right, left_pid)?;
                middle_key = e.key.clone();
                edge_child = e.left;
            }
            let mut r = right_arc.write().unwrap();
            for _ in 0..move_count {
                r.as_internal_mut().delete_key_and_left_child(0);
            }
            r.mark_dirty(Some(tid));
        } else {
            let entries: Vec<Entry> = { left_arc.read().unwrap().as_internal().iter().rev().take(move_count).collect() };
            let mut edge_child = { right_arc.read().unwrap().as_internal().entry(0).left };
            for e in &entries {
                let new_left = e.right;
                {
                    let mut r = right_arc.write().unwrap();
                    r.as_internal_mut().insert_entry_before(middle_key.clone(), new_left, edge_child);
                    r.mark_dirty(Some(tid));
                }
                self.set_child_parent(tid, dirty, new_left, right_pid)?;
                middle_key = e.key.clone();
                edge_child = e.right;
            }
            let mut l = left_arc.write().unwrap();
            for _ in 0..move_count {
                let last = l.as_internal().entries_count() - 1;
                l.as_internal_mut().delete_key_and_right_child(last);
            }
            l.mark_dirty(Some(tid));
        }

        let mut parent = parent_arc.write().unwrap();
        parent.as_internal_mut().update_key(entry_idx, middle_key);
        parent.mark_dirty(Some(tid));
        Ok(())
    }

    fn merge_internals(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        left_arc: Arc<RwLock<AnyPage>>,
        right_arc: Arc<RwLock<AnyPage>>,
        parent_arc: Arc<RwLock<AnyPage>>,
        entry_idx: usize,
    ) -> SmallResult {
        let left_pid = { left_arc.read().unwrap().page_id() };
        let right_pid = { right_arc.read().unwrap().page_id() };
        let parent_key = { parent_arc.read().unwrap().as_internal().entry(entry_idx).key.clone() };
        let right_entries: Vec<Entry> = { right_arc.read().unwrap().as_internal().iter().collect() };
        let center_right = right_entries
            .first()
            .map(|e| e.left)
            .expect("merge_internals: right sibling has no entries");

        {
            let mut l = left_arc.write().unwrap();
            let left_count = l.as_internal().entries_count();
            let center_left = l.as_internal().entry(left_count - 1).right;
            l.as_internal_mut().insert_entry(parent_key, center_left, center_right);
            for e in &right_entries {
                l.as_internal_mut().insert_entry(e.key.clone(), e.left, e.right);
            }
            l.mark_dirty(Some(tid));
        }

        self.set_child_parent(tid, dirty, center_right, left_pid)?;
        for e in &right_entries {
            self.set_child_parent(tid, dirty, e.right, left_pid)?;
        }

        self.set_empty_page(tid, dirty, right_pid)?;
        self.delete_parent_entry(tid, dirty, parent_arc, entry_idx, left_pid)
    }

    /// Removes `parent`'s entry at `entry_idx` after a merge folded its
    /// right child away. If that empties the parent, it can only have been
    /// the root: promote `remaining_child_pid` to root and free the old
    /// root page. Otherwise check the parent itself for under-occupancy.
    fn delete_parent_entry(
        &self,
        tid: TransactionId,
        dirty: &mut DirtyPages,
        parent_arc: Arc<RwLock<AnyPage>>,
        entry_idx: usize,
        remaining_child_pid: PageId,
    ) -> SmallResult {
        let is_empty_after = {
            let mut parent = parent_arc.write().unwrap();
            parent.as_internal_mut().delete_key_and_right_child(entry_idx);
            parent.mark_dirty(Some(tid));
            parent.as_internal().is_empty()
        };
        let parent_pid = { parent_arc.read().unwrap().page_id() };

        if is_empty_after {
            let root_ptr_arc = self.get_page(tid, dirty, self.root_ptr_pid(), Permission::ReadWrite)?;
            {
                let mut rp = root_ptr_arc.write().unwrap();
                rp.as_root_pointer_mut().set_root_pid(remaining_child_pid);
                rp.mark_dirty(Some(tid));
            }
            self.set_child_parent(tid, dirty, remaining_child_pid, self.root_ptr_pid())?;
            return self.set_empty_page(tid, dirty, parent_pid);
        }

        let should_merge = { parent_arc.read().unwrap().as_internal().should_merge() };
        if should_merge {
            self.handle_min_occupancy_internal(tid, dirty, parent_pid)?;
        }
        Ok(())
    }

    /// Standalone iterator honoring `predicate` against `value`, scanning
    /// only the portion of the leaf chain the predicate can match.
    pub fn iterator_with_predicate(&self, tid: TransactionId, predicate: Predicate, value: Field) -> Box<dyn DbFileIterator> {
        Box::new(BTreePredicateIterator::new(self.table_id, tid, self.key_field, predicate, value))
    }

    /// Debug-only structural walk verifying parent pointers, key ordering,
    /// min-occupancy, and the leaf sibling chain, bottom-up; used by tests
    /// exercising large insert/delete sequences rather than gated behind
    /// `debug_assert!` in the hot path.
    pub fn check_integrity(&self, tid: TransactionId) -> SmallResult {
        let mut dirty = DirtyPages::new();
        let root = self.get_root_pid(tid, &mut dirty)?;
        let summary = self.check_subtree(tid, root, None, None, &self.root_ptr_pid(), true, 0)?;
        if summary.left_sibling.is_some() || summary.right_sibling.is_some() {
            return Err(SmallError::db_exception("check_integrity: outermost leaf has a dangling sibling pointer"));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_subtree(
        &self,
        tid: TransactionId,
        pid: PageId,
        min: Option<&Field>,
        max: Option<&Field>,
        expected_parent: &PageId,
        is_root: bool,
        depth: usize,
    ) -> SmallResult<SubtreeSummary> {
        match pid.category {
            PageCategory::Leaf => {
                let page = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadOnly)?;
                let page = page.read().unwrap();
                let leaf = page.as_leaf();
                if leaf.get_parent_pid() != *expected_parent {
                    return Err(SmallError::db_exception("check_integrity: leaf parent pointer mismatch"));
                }
                if !is_root && leaf.should_merge() {
                    return Err(SmallError::db_exception("check_integrity: leaf page below min occupancy"));
                }
                let mut prev: Option<Field> = None;
                for wt in leaf.iter() {
                    let k = wt.get_field(self.key_field).clone();
                    if let Some(p) = &prev {
                        if &k < p {
                            return Err(SmallError::db_exception("check_integrity: leaf tuples out of order"));
                        }
                    }
                    if let Some(mn) = min {
                        if &k < mn {
                            return Err(SmallError::db_exception("check_integrity: leaf key below subtree minimum"));
                        }
                    }
                    if let Some(mx) = max {
                        if &k >= mx {
                            return Err(SmallError::db_exception("check_integrity: leaf key at/above subtree maximum"));
                        }
                    }
                    prev = Some(k);
                }
                Ok(SubtreeSummary {
                    depth,
                    left_sibling: leaf.get_left_pid(),
                    leftmost_pid: Some(pid),
                    right_sibling: leaf.get_right_pid(),
                    rightmost_pid: Some(pid),
                })
            }
            PageCategory::Internal => {
                let entries: Vec<Entry> = {
                    let page = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadOnly)?;
                    let page_guard = page.read().unwrap();
                    let internal = page_guard.as_internal();
                    if internal.get_parent_pid() != *expected_parent {
                        return Err(SmallError::db_exception("check_integrity: internal parent pointer mismatch"));
                    }
                    if !is_root && internal.should_merge() {
                        return Err(SmallError::db_exception("check_integrity: internal page below min occupancy"));
                    }
                    internal.iter().collect()
                };
                if entries.is_empty() {
                    return Err(SmallError::db_exception("check_integrity: internal page has no entries"));
                }

                let mut lower = min.cloned();
                let mut summary = self.check_subtree(tid, entries[0].left, lower.as_ref(), Some(&entries[0].key), &pid, false, depth + 1)?;
                let last_index = entries.len() - 1;
                for (i, e) in entries.iter().enumerate() {
                    lower = Some(e.key.clone());
                    let upper = if i == last_index { max } else { Some(&entries[i + 1].key) };
                    let right_summary = self.check_subtree(tid, e.right, lower.as_ref(), upper, &pid, false, depth + 1)?;
                    summary = summary.merge(right_summary)?;
                }
                Ok(summary)
            }
            _ => Err(SmallError::db_exception("check_integrity: unexpected page category in subtree")),
        }
    }
}

/// Per-subtree bookkeeping `check_subtree` threads upward so the caller can
/// confirm every leaf sits at the same depth and the leaf sibling chain
/// lines up across internal-page boundaries, not just within one page.
struct SubtreeSummary {
    depth: usize,
    left_sibling: Option<PageId>,
    leftmost_pid: Option<PageId>,
    right_sibling: Option<PageId>,
    rightmost_pid: Option<PageId>,
}

impl SubtreeSummary {
    fn merge(self, right: SubtreeSummary) -> SmallResult<SubtreeSummary> {
        if self.depth != right.depth {
            return Err(SmallError::db_exception("check_integrity: leaves at mismatched depths"));
        }
        if self.right_sibling != right.leftmost_pid {
            return Err(SmallError::db_exception("check_integrity: leaf right-sibling pointer doesn't match its actual right neighbor"));
        }
        if self.rightmost_pid != right.left_sibling {
            return Err(SmallError::db_exception("check_integrity: leaf left-sibling pointer doesn't match its actual left neighbor"));
        }
        Ok(SubtreeSummary {
            depth: self.depth,
            left_sibling: self.left_sibling,
            leftmost_pid: self.leftmost_pid,
            right_sibling: right.right_sibling,
            rightmost_pid: right.rightmost_pid,
        })
    }
}

impl DbFile for BTreeFile {
    fn get_id(&self) -> i32 {
        self.table_id
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.tuple_desc
    }

    fn read_page(&self, pid: PageId) -> SmallResult<AnyPage> {
        let page_size = BufferPool::get_page_size();
        let mut file = self.file.lock().unwrap();
        match pid.category {
            PageCategory::RootPointer => {
                let mut buf = vec![0u8; ROOT_PTR_PAGE_SIZE];
                file.seek(SeekFrom::Start(0))?;
                file.read_exact(&mut buf)
                    .map_err(|e| SmallError::illegal_argument(&format!("short read on root pointer page: {}", e)))?;
                Ok(AnyPage::RootPointer(BTreeRootPointerPage::new(pid, &buf)))
            }
            PageCategory::Leaf | PageCategory::Internal | PageCategory::Header => {
                let offset = self.offset_of(pid);
                let mut buf = vec![0u8; page_size];
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)
                    .map_err(|e| SmallError::illegal_argument(&format!("short read on {}: {}", pid, e)))?;
                Ok(match pid.category {
                    PageCategory::Leaf => AnyPage::Leaf(BTreeLeafPage::new(pid, &buf, self.tuple_desc.clone(), self.key_field, page_size)),
                    PageCategory::Internal => {
                        AnyPage::Internal(BTreeInternalPage::new(pid, &buf, self.tuple_desc.field_type(self.key_field), page_size))
                    }
                    PageCategory::Header => AnyPage::Header(BTreeHeaderPage::new(pid, &buf, page_size)),
                    _ => unreachable!(),
                })
            }
            PageCategory::Heap => Err(SmallError::db_exception("BTreeFile cannot read a heap page")),
        }
    }

    fn write_page(&self, page: &AnyPage) -> SmallResult {
        let page_size = BufferPool::get_page_size();
        let pid = page.page_id();
        let mut file = self.file.lock().unwrap();
        let offset = if pid.category == PageCategory::RootPointer { 0 } else { self.offset_of(pid) };
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.get_page_data(page_size))?;
        Ok(())
    }

    fn num_pages(&self) -> usize {
        let page_size = BufferPool::get_page_size();
        let file = self.file.lock().unwrap();
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len <= ROOT_PTR_PAGE_SIZE as u64 {
            0
        } else {
            ((len - ROOT_PTR_PAGE_SIZE as u64) as usize) / page_size
        }
    }

    fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> SmallResult<Vec<PageId>> {
        let mut dirty = DirtyPages::new();
        let key = tuple.get_field(self.key_field).clone();
        let root_pid = self.get_root_pid(tid, &mut dirty)?;
        let leaf_arc = self.find_leaf_page(tid, &mut dirty, root_pid, Permission::ReadWrite, Some(&key))?;

        let needs_split = { leaf_arc.read().unwrap().as_leaf().empty_slots_count() == 0 };
        let target = if needs_split {
            self.split_leaf_page(tid, &mut dirty, leaf_arc, &key)?
        } else {
            leaf_arc
        };

        {
            let mut page = target.write().unwrap();
            page.as_leaf_mut().insert_tuple(tuple);
            page.mark_dirty(Some(tid));
        }
        Ok(dirty.keys().copied().collect())
    }

    fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> SmallResult<Vec<PageId>> {
        let mut dirty = DirtyPages::new();
        let record_id = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;

        let leaf_arc = self.get_page(tid, &mut dirty, record_id.page_id, Permission::ReadWrite)?;
        {
            let mut page = leaf_arc.write().unwrap();
            page.as_leaf_mut().delete_tuple(record_id.slot_index);
            page.mark_dirty(Some(tid));
        }
        let should_merge = { leaf_arc.read().unwrap().as_leaf().should_merge() };
        if should_merge {
            self.handle_min_occupancy_leaf(tid, &mut dirty, record_id.page_id)?;
        }
        Ok(dirty.keys().copied().collect())
    }

    fn iterator(&self, tid: TransactionId) -> Box<dyn DbFileIterator> {
        Box::new(BTreeFileIterator::new(self.table_id, tid))
    }
}

fn root_pid(tid: TransactionId, table_id: i32) -> SmallResult<PageId> {
    let pid = PageId::new(table_id, 0, PageCategory::RootPointer);
    let page = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadOnly)?;
    Ok(page.read().unwrap().as_root_pointer().get_root_pid())
}

fn descend_to_leaf(tid: TransactionId, pid: PageId, key: Option<&Field>) -> SmallResult<PageId> {
    match pid.category {
        PageCategory::Leaf => Ok(pid),
        PageCategory::Internal => {
            let page = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadOnly)?;
            let child = { page.read().unwrap().as_internal().child_for_key(key) };
            descend_to_leaf(tid, child, key)
        }
        _ => Err(SmallError::db_exception("descend_to_leaf: unexpected page category")),
    }
}

/// Full ascending scan: descends to the leftmost leaf, then follows right
/// sibling pointers — the `DbFile::iterator` ordered traversal.
struct BTreeFileIterator {
    table_id: i32,
    tid: TransactionId,
    current_leaf: Option<PageId>,
    buffer: Vec<WrappedTuple>,
    cursor: usize,
    opened: bool,
}

impl BTreeFileIterator {
    fn new(table_id: i32, tid: TransactionId) -> Self {
        Self {
            table_id,
            tid,
            current_leaf: None,
            buffer: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    fn load_leaf(&mut self, pid: PageId) -> SmallResult {
        let page = Database::global().buffer_pool().get_page(self.tid, pid, Permission::ReadOnly)?;
        let page = page.read().unwrap();
        let leaf = page.as_leaf();
        self.buffer = leaf.iter().collect();
        self.current_leaf = leaf.get_right_pid();
        self.cursor = 0;
        Ok(())
    }

    fn advance(&mut self) -> SmallResult<bool> {
        while self.cursor >= self.buffer.len() {
            match self.current_leaf {
                Some(pid) => self.load_leaf(pid)?,
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl DbFileIterator for BTreeFileIterator {
    fn open(&mut self) -> SmallResult {
        self.opened = true;
        let root = root_pid(self.tid, self.table_id)?;
        let leftmost = descend_to_leaf(self.tid, root, None)?;
        self.load_leaf(leftmost)
    }

    fn has_next(&mut self) -> SmallResult<bool> {
        if !self.opened {
            return Err(SmallError::db_exception("iterator not open"));
        }
        self.advance()
    }

    fn next(&mut self) -> SmallResult<Option<WrappedTuple>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let t = self.buffer[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(t))
    }

    fn rewind(&mut self) -> SmallResult {
        self.open()
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

struct BTreePredicateIterator {
    table_id: i32,
    tid: TransactionId,
    key_field: usize,
    predicate: Predicate,
    value: Field,
    current_leaf: Option<PageId>,
    buffer: Vec<WrappedTuple>,
    cursor: usize,
    opened: bool,
    done: bool,
}

impl BTreePredicateIterator {
    fn new(table_id: i32, tid: TransactionId, key_field: usize, predicate: Predicate, value: Field) -> Self {
        Self {
            table_id,
            tid,
            key_field,
            predicate,
            value,
            current_leaf: None,
            buffer: Vec::new(),
            cursor: 0,
            opened: false,
            done: false,
        }
    }

    fn satisfies(&self, field: &Field) -> bool {
        match self.predicate {
            Predicate::Equals => field == &self.value,
            Predicate::GreaterThanOrEq => field >= &self.value,
            Predicate::GreaterThan => field > &self.value,
            Predicate::LessThan => field < &self.value,
            Predicate::LessThanOrEq => field <= &self.value,
        }
    }

    /// EQUALS/LE stop once the key has passed `value`; LT stops once the
    /// key reaches `value`. GE/GT never stop early — the lower-bound
    /// descent already put us past anything that wouldn't match.
    fn should_stop(&self, field: &Field) -> bool {
        match self.predicate {
            Predicate::Equals => field > &self.value,
            Predicate::GreaterThanOrEq | Predicate::GreaterThan => false,
            Predicate::LessThan => field >= &self.value,
            Predicate::LessThanOrEq => field > &self.value,
        }
    }

    fn load_leaf(&mut self, pid: PageId) -> SmallResult {
        let page = Database::global().buffer_pool().get_page(self.tid, pid, Permission::ReadOnly)?;
        let page = page.read().unwrap();
        let leaf = page.as_leaf();
        self.buffer = leaf.iter().collect();
        self.current_leaf = leaf.get_right_pid();
        self.cursor = 0;
        Ok(())
    }

    fn advance(&mut self) -> SmallResult<bool> {
        if self.done {
            return Ok(false);
        }
        loop {
            while self.cursor < self.buffer.len() {
                let field = self.buffer[self.cursor].get_field(self.key_field).clone();
                if self.should_stop(&field) {
                    self.done = true;
                    return Ok(false);
                }
                if self.satisfies(&field) {
                    return Ok(true);
                }
                self.cursor += 1;
            }
            match self.current_leaf {
                Some(pid) => self.load_leaf(pid)?,
                None => {
                    self.done = true;
                    return Ok(false);
                }
            }
        }
    }
}

impl DbFileIterator for BTreePredicateIterator {
    fn open(&mut self) -> SmallResult {
        self.opened = true;
        self.done = false;
        let root = root_pid(self.tid, self.table_id)?;
        let start_leaf = match self.predicate {
            Predicate::LessThan | Predicate::LessThanOrEq => descend_to_leaf(self.tid, root, None)?,
            _ => descend_to_leaf(self.tid, root, Some(&self.value))?,
        };
        self.load_leaf(start_leaf)
    }

    fn has_next(&mut self) -> SmallResult<bool> {
        if !self.opened {
            return Err(SmallError::db_exception("iterator not open"));
        }
        self.advance()
    }

    fn next(&mut self) -> SmallResult<Option<WrappedTuple>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let t = self.buffer[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(t))
    }

    fn rewind(&mut self) -> SmallResult {
        self.open()
    }

    fn close(&mut self) {
        self.opened = false;
    }
}
