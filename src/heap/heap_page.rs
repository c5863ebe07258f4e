use bit_vec::BitVec;

use crate::io::{Decodeable, Encodeable, PageWriter};
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc, WrappedTuple};

/// Fixed-size slotted page: a bitmap of slot-occupancy followed by
/// fixed-width tuple slots.
pub struct HeapPage {
    pid: PageId,
    slot_count: usize,
    header: BitVec<u32>,
    tuples: Vec<Tuple>,
    tuple_desc: TupleDesc,
    dirty: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    pub fn calculate_slots_count(tuple_desc: &TupleDesc, page_size: usize) -> usize {
        let bits_per_tuple_including_header = tuple_desc.tuple_size() * 8 + 1;
        (page_size * 8) / bits_per_tuple_including_header
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn new_empty(pid: PageId, tuple_desc: TupleDesc, page_size: usize) -> Self {
        let slot_count = Self::calculate_slots_count(&tuple_desc, page_size);
        Self {
            pid,
            slot_count,
            header: BitVec::from_elem(slot_count, false),
            tuples: (0..slot_count)
                .map(|_| Tuple::new(tuple_desc.clone(), tuple_desc.fields.iter().map(|_| crate::field::Field::Int(0)).collect()))
                .collect(),
            tuple_desc,
            dirty: None,
            before_image: Vec::new(),
        }
    }

    pub fn new(pid: PageId, bytes: &[u8], tuple_desc: TupleDesc, page_size: usize) -> Self {
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
        Self {
            pid,
            slot_count,
            header,
            tuples,
            tuple_desc,
            dirty: None,
            before_image: Vec::new(),
        }
    }

    pub fn get_page_data(&self, page_size: usize) -> Vec<u8> {
        let mut w = PageWriter::new();
        w.write(&self.header);
        for t in &self.tuples {
            w.write_bytes(&t.to_bytes());
        }
        w.to_padded_bytes(page_size)
    }

    pub fn get_pid(&self) -> PageId {
        self.pid
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

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot]
    }

    pub fn mark_slot_status(&mut self, slot: usize, used: bool) {
        self.header.set(slot, used);
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count).filter(|&i| !self.is_slot_used(i)).count()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn insert_tuple(&mut self, tuple: Tuple) -> usize {
        let slot = (0..self.slot_count)
            .find(|&i| !self.is_slot_used(i))
            .expect("insert_tuple called on a full heap page");
        self.tuples[slot] = tuple;
        self.mark_slot_status(slot, true);
        slot
    }

    pub fn delete_tuple(&mut self, slot: usize) {
        self.mark_slot_status(slot, false);
    }

    pub fn get_tuple(&self, slot: usize) -> Option<Tuple> {
        if self.is_slot_used(slot) {
            Some(self.tuples[slot].clone())
        } else {
            None
        }
    }

    pub fn iter(&self) -> HeapPageIterator<'_> {
        HeapPageIterator { page: self, cursor: 0 }
    }
}

pub struct HeapPageIterator<'p> {
    page: &'p HeapPage,
    cursor: usize,
}

impl<'p> Iterator for HeapPageIterator<'p> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let slot = self.cursor;
            self.cursor += 1;
            if self.page.is_slot_used(slot) {
                return Some(WrappedTuple::new(self.page.tuples[slot].clone(), self.page.get_pid(), slot));
            }
        }
        None
    }
}
