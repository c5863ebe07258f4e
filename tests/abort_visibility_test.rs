mod common;

use small_storage::common::database::Database;
use small_storage::dbfile::DbFile;
use small_storage::field::Field;
use small_storage::page_id::{PageCategory, PageId};
use small_storage::transaction::TransactionId;
use small_storage::tuple::Tuple;

// A tuple inserted by a transaction is visible to that same transaction,
// but vanishes once the transaction aborts, and the abort releases every
// lock it held.
#[test]
fn aborted_insert_is_invisible_afterwards_and_releases_locks() {
    common::setup();
    let table_id = common::new_heap_table(1);
    let tid = TransactionId::new();

    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let tuple = Tuple::new(db_file.get_tuple_desc().clone(), vec![Field::Int(7)]);
    db_file.insert_tuple(tid, tuple).unwrap();

    let mut it = db_file.iterator(tid);
    it.open().unwrap();
    let mut count = 0;
    while it.next().unwrap().is_some() {
        count += 1;
    }
    it.close();
    assert_eq!(count, 1, "the inserting transaction should see its own write");

    Database::global().buffer_pool().transaction_complete(tid, false).unwrap();

    let page = PageId::new(table_id, 0, PageCategory::Heap);
    assert!(!Database::global().lock_manager().holds_lock(tid, page));

    let tid2 = TransactionId::new();
    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let mut it = db_file.iterator(tid2);
    it.open().unwrap();
    assert!(it.next().unwrap().is_none(), "aborted insert must not be visible afterward");
    it.close();
    Database::global().buffer_pool().transaction_complete(tid2, true).unwrap();
}
