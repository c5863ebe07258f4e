use bit_vec::BitVec;

use crate::btree::page::base_page::BTreeBasePage;
use crate::field::Field;
use crate::io::{Decodeable, Encodeable, PageWriter};
use crate::page_id::{PageCategory, PageId, EMPTY_PAGE_ID};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc, WrappedTuple};

pub struct BTreeLeafPage {
    base: BTreeBasePage,
    slot_count: usize,
    header: BitVec<u32>,
    tuples: Vec<Tuple>,
    tuple_desc: TupleDesc,
    key_field: usize,
    right_sibling_id: u32,
    left_sibling_id: u32,
}

impl std::ops::Deref for BTreeLeafPage {
    type Target = BTreeBasePage;
    fn deref(&self) -> &BTreeBasePage {
        &self.base
    }
}

impl std::ops::DerefMut for BTreeLeafPage {
    fn deref_mut(&mut self) -> &mut BTreeBasePage {
        &mut self.base
    }
}

impl BTreeLeafPage {
    pub fn new(pid: PageId, bytes: &[u8], tuple_desc: TupleDesc, key_field: usize, page_size: usize) -> Self {
        let slot_count = Self::calculate_slots_count(&tuple_desc, page_size);
        let header_size = Self::calculate_header_size(slot_count);

        let header = BitVec::<u32>::decode(&bytes[0..header_size]);
        let mut cursor = header_size;
        let mut tuples = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            let end = cursor + tuple_desc.tuple_size();
            tuples.push(Tuple::from_bytes(tuple_desc.clone(), &bytes[cursor..end]));
            cursor = end;
        }
        let left_sibling_id = u32::decode(&bytes[cursor..cursor + 4]);
        cursor += 4;
        let right_sibling_id = u32::decode(&bytes[cursor..cursor + 4]);

        Self {
            base: BTreeBasePage::new(pid),
            slot_count,
            header,
            tuples,
            tuple_desc,
            key_field,
            right_sibling_id,
            left_sibling_id,
        }
    }

    pub fn new_empty(pid: PageId, tuple_desc: TupleDesc, key_field: usize, page_size: usize) -> Self {
        let slot_count = Self::calculate_slots_count(&tuple_desc, page_size);
        Self {
            base: BTreeBasePage::new(pid),
            slot_count,
            header: BitVec::from_elem(slot_count, false),
            tuples: (0..slot_count)
                .map(|_| Tuple::new(tuple_desc.clone(), tuple_desc.fields.iter().map(|_| Field::Int(0)).collect()))
                .collect(),
            tuple_desc,
            key_field,
            right_sibling_id: EMPTY_PAGE_ID,
            left_sibling_id: EMPTY_PAGE_ID,
        }
    }

    pub fn calculate_slots_count(tuple_desc: &TupleDesc, page_size: usize) -> usize {
        let bits_per_tuple_including_header = tuple_desc.tuple_size() * 8 + 1;
        // left sibling, right sibling: two u32 pointers.
        let extra_bits = 2 * 4 * 8;
        (page_size * 8 - extra_bits) / bits_per_tuple_including_header
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn get_page_data(&self, page_size: usize) -> Vec<u8> {
        let mut w = PageWriter::new();
        w.write(&self.header);
        for t in &self.tuples {
            w.write_bytes(&t.to_bytes());
        }
        w.write(&self.left_sibling_id);
        w.write(&self.right_sibling_id);
        w.to_padded_bytes(page_size)
    }

    pub fn key_field(&self) -> usize {
        self.key_field
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

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    /// Under-occupied iff more than half the slots are empty, and this is
    /// not the root leaf (the root-pointer's direct child is exempt).
    pub fn should_merge(&self) -> bool {
        if self.get_parent_pid().category == PageCategory::RootPointer {
            return false;
        }
        let max_empty = self.slot_count - self.slot_count / 2;
        self.empty_slots_count() > max_empty
    }

    pub fn get_right_pid(&self) -> Option<PageId> {
        if self.right_sibling_id == EMPTY_PAGE_ID {
            None
        } else {
            Some(PageId::new(self.get_pid().table_id, self.right_sibling_id, PageCategory::Leaf))
        }
    }

    pub fn set_right_pid(&mut self, pid: Option<PageId>) {
        self.right_sibling_id = pid.map(|p| p.page_index).unwrap_or(EMPTY_PAGE_ID);
    }

    pub fn get_left_pid(&self) -> Option<PageId> {
        if self.left_sibling_id == EMPTY_PAGE_ID {
            None
        } else {
            Some(PageId::new(self.get_pid().table_id, self.left_sibling_id, PageCategory::Leaf))
        }
    }

    pub fn set_left_pid(&mut self, pid: Option<PageId>) {
        self.left_sibling_id = pid.map(|p| p.page_index).unwrap_or(EMPTY_PAGE_ID);
    }

    /// Inserts `tuple` keeping every occupied slot in ascending key order,
    /// shifting the minimal run of slots to make room.
    pub fn insert_tuple(&mut self, tuple: Tuple) {
        let mut first_empty: Option<usize> = None;
        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                first_empty = Some(i);
                break;
            }
        }
        let first_empty = first_empty.expect("insert_tuple called on a full leaf");

        let mut last_less: i64 = -1;
        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                if self.tuples[i].get_field(self.key_field) < tuple.get_field(self.key_field) {
                    last_less = i as i64;
                } else {
                    break;
                }
            }
        }

        let good_slot: usize;
        if (first_empty as i64) < last_less {
            for i in first_empty as i64..last_less {
                self.move_tuple((i + 1) as usize, i as usize);
            }
            good_slot = last_less as usize;
        } else {
            for i in (last_less + 1..first_empty as i64).rev() {
                self.move_tuple(i as usize, (i + 1) as usize);
            }
            good_slot = (last_less + 1) as usize;
        }

        self.tuples[good_slot] = tuple;
        self.mark_slot_status(good_slot, true);
    }

    fn move_tuple(&mut self, from: usize, to: usize) {
        if !self.is_slot_used(from) {
            return;
        }
        self.tuples[to] = self.tuples[from].clone();
        self.mark_slot_status(to, true);
        self.mark_slot_status(from, false);
    }

    pub fn get_tuple(&self, slot: usize) -> Option<Tuple> {
        if self.is_slot_used(slot) {
            Some(self.tuples[slot].clone())
        } else {
            None
        }
    }

    pub fn delete_tuple(&mut self, slot: usize) {
        self.mark_slot_status(slot, false);
    }

    pub fn iter(&self) -> BTreeLeafPageIterator<'_> {
        BTreeLeafPageIterator::new(self)
    }
}

pub struct BTreeLeafPageIterator<'p> {
    page: &'p BTreeLeafPage,
    cursor: i64,
    reverse_cursor: i64,
}

impl<'p> BTreeLeafPageIterator<'p> {
    pub fn new(page: &'p BTreeLeafPage) -> Self {
        Self {
            page,
            cursor: -1,
            reverse_cursor: page.slot_count as i64,
        }
    }
}

impl<'p> Iterator for BTreeLeafPageIterator<'p> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.cursor += 1;
            if self.cursor >= self.page.slot_count as i64 {
                return None;
            }
            let slot = self.cursor as usize;
            if self.page.is_slot_used(slot) {
                return Some(WrappedTuple::new(self.page.tuples[slot].clone(), self.page.get_pid(), slot));
            }
        }
    }
}

impl<'p> DoubleEndedIterator for BTreeLeafPageIterator<'p> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            self.reverse_cursor -= 1;
            if self.reverse_cursor < 0 {
                return None;
            }
            let slot = self.reverse_cursor as usize;
            if self.page.is_slot_used(slot) {
                return Some(WrappedTuple::new(self.page.tuples[slot].clone(), self.page.get_pid(), slot));
            }
        }
    }
}
