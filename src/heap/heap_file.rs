use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::btree::page::AnyPage;
use crate::buffer_pool::BufferPool;
use crate::common::database::Database;
use crate::dbfile::{DbFile, DbFileIterator};
use crate::error::{SmallError, SmallResult};
use crate::heap::heap_page::HeapPage;
use crate::page_id::{table_id_from_path, PageCategory, PageId};
use crate::transaction::{Permission, TransactionId};
use crate::tuple::{Tuple, TupleDesc, WrappedTuple};

/// A sequence of fixed-size slotted pages stored contiguously in one
/// backing file.
pub struct HeapFile {
    table_id: i32,
    file: Mutex<File>,
    tuple_desc: TupleDesc,
}

impl HeapFile {
    pub fn new(path: &std::path::Path, tuple_desc: TupleDesc) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(Self {
            table_id: table_id_from_path(path),
            file: Mutex::new(file),
            tuple_desc,
        })
    }

    fn page_id(&self, page_index: u32) -> PageId {
        PageId::new(self.table_id, page_index, PageCategory::Heap)
    }
}

impl DbFile for HeapFile {
    fn get_id(&self) -> i32 {
        self.table_id
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.tuple_desc
    }

    /// Swallows I/O errors on read: logs a warning and hands back a zeroed
    /// page rather than propagating `IoError` to the caller.
    fn read_page(&self, pid: PageId) -> SmallResult<AnyPage> {
        let page_size = BufferPool::get_page_size();
        let mut file = self.file.lock().unwrap();
        let offset = pid.page_index as u64 * page_size as u64;
        let mut buf = vec![0u8; page_size];
        if file.seek(SeekFrom::Start(offset)).is_ok() {
            if let Err(e) = file.read_exact(&mut buf) {
                log::warn!("HeapFile::read_page swallowed an I/O error on {}: {}", pid, e);
            }
        } else {
            log::warn!("HeapFile::read_page failed to seek to {}", pid);
        }
        Ok(AnyPage::Heap(HeapPage::new(pid, &buf, self.tuple_desc.clone(), page_size)))
    }

    fn write_page(&self, page: &AnyPage) -> SmallResult {
        let page_size = BufferPool::get_page_size();
        let heap_page = page.as_heap();
        let mut file = self.file.lock().unwrap();
        let offset = heap_page.get_pid().page_index as u64 * page_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&heap_page.get_page_data(page_size))?;
        Ok(())
    }

    fn num_pages(&self) -> usize {
        let page_size = BufferPool::get_page_size();
        let file = self.file.lock().unwrap();
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        (len as usize) / page_size
    }

    /// Scans existing pages for one with an empty slot; appends a zeroed
    /// page and fetches it through the buffer pool if none has room.
    fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> SmallResult<Vec<PageId>> {
        let num_pages = self.num_pages() as u32;
        for i in 0..num_pages {
            let pid = self.page_id(i);
            let page_lock = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadWrite)?;
            let mut page = page_lock.write().unwrap();
            if page.as_heap().empty_slots_count() > 0 {
                page.as_heap_mut().insert_tuple(tuple);
                page.mark_dirty(Some(tid));
                return Ok(vec![pid]);
            }
        }

        let page_size = BufferPool::get_page_size();
        let new_index = num_pages;
        let pid = self.page_id(new_index);
        {
            let mut file = self.file.lock().unwrap();
            file.seek(SeekFrom::Start(new_index as u64 * page_size as u64))?;
            file.write_all(&vec![0u8; page_size])?;
        }

        let page_lock = Database::global().buffer_pool().get_page(tid, pid, Permission::ReadWrite)?;
        let mut page = page_lock.write().unwrap();
        page.as_heap_mut().insert_tuple(tuple);
        page.mark_dirty(Some(tid));
        Ok(vec![pid])
    }

    fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> SmallResult<Vec<PageId>> {
        let record_id = tuple
            .record_id
            .ok_or_else(|| SmallError::illegal_argument("tuple has no record id"))?;
        let page_lock = Database::global().buffer_pool().get_page(tid, record_id.page_id, Permission::ReadWrite)?;
        let mut page = page_lock.write().unwrap();
        page.as_heap_mut().delete_tuple(record_id.slot_index);
        page.mark_dirty(Some(tid));
        Ok(vec![record_id.page_id])
    }

    fn iterator(&self, tid: TransactionId) -> Box<dyn DbFileIterator> {
        Box::new(HeapFileIterator {
            table_id: self.table_id,
            tid,
            num_pages: self.num_pages() as u32,
            page_index: 0,
            page_tuples: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }
}

struct HeapFileIterator {
    table_id: i32,
    tid: TransactionId,
    num_pages: u32,
    page_index: u32,
    page_tuples: Vec<WrappedTuple>,
    cursor: usize,
    opened: bool,
}

impl HeapFileIterator {
    fn load_page(&mut self, index: u32) -> SmallResult {
        let pid = PageId::new(self.table_id, index, PageCategory::Heap);
        let page_lock = Database::global().buffer_pool().get_page(self.tid, pid, Permission::ReadOnly)?;
        let page = page_lock.read().unwrap();
        self.page_tuples = page.as_heap().iter().collect();
        self.cursor = 0;
        Ok(())
    }

    fn advance_to_next_nonempty_page(&mut self) -> SmallResult<bool> {
        while self.cursor >= self.page_tuples.len() {
            if self.page_index >= self.num_pages {
                return Ok(false);
            }
            self.load_page(self.page_index)?;
            self.page_index += 1;
        }
        Ok(true)
    }
}

impl DbFileIterator for HeapFileIterator {
    fn open(&mut self) -> SmallResult {
        self.opened = true;
        self.page_index = 0;
        self.page_tuples = Vec::new();
        self.cursor = 0;
        Ok(())
    }

    fn has_next(&mut self) -> SmallResult<bool> {
        if !self.opened {
            return Err(SmallError::db_exception("iterator not open"));
        }
        self.advance_to_next_nonempty_page()
    }

    fn next(&mut self) -> SmallResult<Option<WrappedTuple>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let t = self.page_tuples[self.cursor].clone();
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
