use crate::page_id::{PageCategory, PageId, EMPTY_PAGE_ID};
use crate::transaction::TransactionId;

/// Shared state every B+ tree page kind carries: its own id, its parent's
/// page index (the parent is always either the root-pointer page or an
/// internal page, so only the index needs storing — the category is
/// derived), the dirty flag, and the before-image snapshot used by the
/// buffer pool's commit path. Leaf/internal/header/root-pointer pages all
/// embed this and `Deref` to it.
pub struct BTreeBasePage {
    pid: PageId,
    parent_page_index: u32,
    dirty: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl BTreeBasePage {
    pub fn new(pid: PageId) -> Self {
        Self {
            pid,
            parent_page_index: EMPTY_PAGE_ID,
            dirty: None,
            before_image: Vec::new(),
        }
    }

    pub fn get_pid(&self) -> PageId {
        self.pid
    }

    /// A parent index of `EMPTY_PAGE_ID` means "the root-pointer page" —
    /// the root page's parent is the file's single root-pointer page,
    /// which always lives at page index 0.
    pub fn get_parent_pid(&self) -> PageId {
        let category = if self.parent_page_index == EMPTY_PAGE_ID {
            PageCategory::RootPointer
        } else {
            PageCategory::Internal
        };
        PageId::new(self.pid.table_id, self.parent_page_index, category)
    }

    pub fn set_parent_pid(&mut self, pid: &PageId) {
        self.parent_page_index = pid.page_index;
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirty = tid;
    }

    pub fn get_before_image(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    pub fn set_before_image(&mut self, bytes: Vec<u8>) {
        self.before_image = bytes;
    }
}
