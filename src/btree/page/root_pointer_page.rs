use crate::btree::page::base_page::BTreeBasePage;
use crate::io::{Decodeable, Encodeable, PageWriter};
use crate::page_id::{PageCategory, PageId, EMPTY_PAGE_ID};

/// Fixed page at file offset 0. Always exists (a fresh file is created
/// with a root-pointer page whose root is an empty leaf), so `root_pid` is
/// mandatory rather than `Option`.
pub struct BTreeRootPointerPage {
    base: BTreeBasePage,
    root_page_index: u32,
    root_category: PageCategory,
    header_page_index: u32,
}

impl std::ops::Deref for BTreeRootPointerPage {
    type Target = BTreeBasePage;
    fn deref(&self) -> &BTreeBasePage {
        &self.base
    }
}

impl std::ops::DerefMut for BTreeRootPointerPage {
    fn deref_mut(&mut self) -> &mut BTreeBasePage {
        &mut self.base
    }
}

/// Byte size of the root-pointer page on disk: independent of the regular
/// page size since it only ever stores three small fields.
pub const ROOT_PTR_PAGE_SIZE: usize = 13;

impl BTreeRootPointerPage {
    pub fn new_empty(pid: PageId, root_pid: PageId) -> Self {
        Self {
            base: BTreeBasePage::new(pid),
            root_page_index: root_pid.page_index,
            root_category: root_pid.category,
            header_page_index: EMPTY_PAGE_ID,
        }
    }

    pub fn new(pid: PageId, bytes: &[u8]) -> Self {
        let root_page_index = u32::decode(&bytes[0..4]);
        let root_category = decode_category(bytes[4]);
        let header_page_index = u32::decode(&bytes[5..9]);
        Self {
            base: BTreeBasePage::new(pid),
            root_page_index,
            root_category,
            header_page_index,
        }
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let mut w = PageWriter::new();
        w.write(&self.root_page_index);
        w.write_bytes(&[encode_category(self.root_category)]);
        w.write(&self.header_page_index);
        w.to_padded_bytes(ROOT_PTR_PAGE_SIZE)
    }

    pub fn get_root_pid(&self) -> PageId {
        PageId::new(self.get_pid().table_id, self.root_page_index, self.root_category)
    }

    pub fn set_root_pid(&mut self, pid: PageId) {
        self.root_page_index = pid.page_index;
        self.root_category = pid.category;
    }

    pub fn get_header_pid(&self) -> Option<PageId> {
        if self.header_page_index == EMPTY_PAGE_ID {
            None
        } else {
            Some(PageId::new(self.get_pid().table_id, self.header_page_index, PageCategory::Header))
        }
    }

    pub fn set_header_pid(&mut self, pid: Option<PageId>) {
        self.header_page_index = pid.map(|p| p.page_index).unwrap_or(EMPTY_PAGE_ID);
    }
}

fn encode_category(c: PageCategory) -> u8 {
    match c {
        PageCategory::Heap => 0,
        PageCategory::RootPointer => 1,
        PageCategory::Internal => 2,
        PageCategory::Leaf => 3,
        PageCategory::Header => 4,
    }
}

fn decode_category(tag: u8) -> PageCategory {
    match tag {
        0 => PageCategory::Heap,
        1 => PageCategory::RootPointer,
        2 => PageCategory::Internal,
        3 => PageCategory::Leaf,
        _ => PageCategory::Header,
    }
}
