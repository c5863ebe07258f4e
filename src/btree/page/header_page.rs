use bit_vec::BitVec;

use crate::btree::page::base_page::BTreeBasePage;
use crate::io::{Decodeable, Encodeable, PageWriter};
use crate::page_id::{PageCategory, PageId, EMPTY_PAGE_ID};

/// Bookkeeping page tracking which page numbers in the file are free for
/// reuse. `true` in the bitmap means "in use"; header pages themselves
/// chain together via `prev`/`next` so an arbitrarily large file can be
/// covered.
pub struct BTreeHeaderPage {
    base: BTreeBasePage,
    slot_count: usize,
    header: BitVec<u32>,
    prev_header_id: u32,
    next_header_id: u32,
}

impl std::ops::Deref for BTreeHeaderPage {
    type Target = BTreeBasePage;
    fn deref(&self) -> &BTreeBasePage {
        &self.base
    }
}

impl std::ops::DerefMut for BTreeHeaderPage {
    fn deref_mut(&mut self) -> &mut BTreeBasePage {
        &mut self.base
    }
}

impl BTreeHeaderPage {
    pub fn calculate_slot_count(page_size: usize) -> usize {
        // one bit per page number, minus the two u32 links.
        (page_size - 8) * 8
    }

    pub fn new_empty(pid: PageId, page_size: usize) -> Self {
        let slot_count = Self::calculate_slot_count(page_size);
        Self {
            base: BTreeBasePage::new(pid),
            slot_count,
            header: BitVec::from_elem(slot_count, false),
            prev_header_id: EMPTY_PAGE_ID,
            next_header_id: EMPTY_PAGE_ID,
        }
    }

    pub fn new(pid: PageId, bytes: &[u8], page_size: usize) -> Self {
        let slot_count = Self::calculate_slot_count(page_size);
        let header_bytes = (slot_count + 7) / 8;
        let header = BitVec::<u32>::decode(&bytes[0..2 + header_bytes]);
        let mut cursor = 2 + header_bytes;
        let prev_header_id = u32::decode(&bytes[cursor..cursor + 4]);
        cursor += 4;
        let next_header_id = u32::decode(&bytes[cursor..cursor + 4]);
        Self {
            base: BTreeBasePage::new(pid),
            slot_count,
            header,
            prev_header_id,
            next_header_id,
        }
    }

    pub fn get_page_data(&self, page_size: usize) -> Vec<u8> {
        let mut w = PageWriter::new();
        w.write(&self.header);
        w.write(&self.prev_header_id);
        w.write(&self.next_header_id);
        w.to_padded_bytes(page_size)
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot]
    }

    pub fn mark_slot_status(&mut self, slot: usize, used: bool) {
        self.header.set(slot, used);
    }

    pub fn get_empty_slot(&self) -> Option<usize> {
        (0..self.slot_count).find(|&i| !self.is_slot_used(i))
    }

    pub fn get_prev_pid(&self) -> Option<PageId> {
        if self.prev_header_id == EMPTY_PAGE_ID {
            None
        } else {
            Some(PageId::new(self.get_pid().table_id, self.prev_header_id, PageCategory::Header))
        }
    }

    pub fn set_prev_pid(&mut self, pid: Option<PageId>) {
        self.prev_header_id = pid.map(|p| p.page_index).unwrap_or(EMPTY_PAGE_ID);
    }

    pub fn get_next_pid(&self) -> Option<PageId> {
        if self.next_header_id == EMPTY_PAGE_ID {
            None
        } else {
            Some(PageId::new(self.get_pid().table_id, self.next_header_id, PageCategory::Header))
        }
    }

    pub fn set_next_pid(&mut self, pid: Option<PageId>) {
        self.next_header_id = pid.map(|p| p.page_index).unwrap_or(EMPTY_PAGE_ID);
    }
}
