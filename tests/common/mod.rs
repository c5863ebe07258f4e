use std::sync::Arc;

use small_storage::btree::BTreeFile;
use small_storage::common::database::Database;
use small_storage::heap::HeapFile;
use small_storage::tuple::{simple_int_tuple_desc, TupleDesc};
use small_storage::{log, DbFile};

/// Idempotent per-process setup: init logging once per test binary.
pub fn setup() {
    log::init_log();
}

/// Builds an empty heap table of `width` int columns, registers it in the
/// global catalog under a throwaway name, and returns its table id.
pub fn new_heap_table(width: usize) -> i32 {
    let tuple_desc = simple_int_tuple_desc(width, "field");
    new_heap_table_with_desc(tuple_desc)
}

pub fn new_heap_table_with_desc(tuple_desc: TupleDesc) -> i32 {
    let dir = tempfile::tempdir().expect("failed to create scratch dir");
    let path = dir.path().join("heap.db");
    let heap_file = HeapFile::new(&path, tuple_desc).expect("failed to open heap file");
    let table_id = heap_file.get_id();
    Database::global().catalog_mut().add_table(Arc::new(heap_file), "scratch_heap", "");
    table_id
}

/// Builds an empty B+ tree table keyed on `key_field` of `width` int
/// columns, registers it, and returns its table id.
pub fn new_btree_table(width: usize, key_field: usize) -> i32 {
    new_btree_table_handle(width, key_field).0
}

/// Same as `new_btree_table`, but also hands back the concrete `BTreeFile`
/// so callers can reach `check_integrity`/`iterator_with_predicate`, which
/// aren't part of the `DbFile` trait object the catalog stores.
pub fn new_btree_table_handle(width: usize, key_field: usize) -> (i32, Arc<BTreeFile>) {
    let tuple_desc = simple_int_tuple_desc(width, "field");
    let dir = tempfile::tempdir().expect("failed to create scratch dir");
    let path = dir.path().join("btree.db");
    let btree_file = Arc::new(BTreeFile::new(&path, key_field, tuple_desc).expect("failed to open btree file"));
    let table_id = btree_file.get_id();
    Database::global().catalog_mut().add_table(Arc::clone(&btree_file) as Arc<dyn DbFile>, "scratch_btree", "");
    (table_id, btree_file)
}
