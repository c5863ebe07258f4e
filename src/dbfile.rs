use crate::btree::page::AnyPage;
use crate::error::SmallResult;
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc, WrappedTuple};

/// Uniform interface implemented by both `HeapFile` and `BTreeFile`, so the
/// buffer pool and the catalog can treat any storage file the same way
/// regardless of its underlying page layout.
pub trait DbFile: Send + Sync {
    fn get_id(&self) -> i32;
    fn get_tuple_desc(&self) -> &TupleDesc;
    fn read_page(&self, pid: PageId) -> SmallResult<AnyPage>;
    fn write_page(&self, page: &AnyPage) -> SmallResult;
    fn num_pages(&self) -> usize;
    fn insert_tuple(&self, tid: TransactionId, tuple: Tuple) -> SmallResult<Vec<PageId>>;
    fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> SmallResult<Vec<PageId>>;
    fn iterator(&self, tid: TransactionId) -> Box<dyn DbFileIterator>;
}

pub trait DbFileIterator {
    fn open(&mut self) -> SmallResult;
    fn has_next(&mut self) -> SmallResult<bool>;
    fn next(&mut self) -> SmallResult<Option<WrappedTuple>>;
    fn rewind(&mut self) -> SmallResult;
    fn close(&mut self);
}
