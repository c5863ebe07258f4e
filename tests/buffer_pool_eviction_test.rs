mod common;

use small_storage::common::database::Database;
use small_storage::field::Field;
use small_storage::transaction::TransactionId;
use small_storage::tuple::Tuple;

// With a small buffer capacity, eviction never writes a dirty page
// belonging to the still-open inserting transaction; after commit,
// flush_all_pages leaves nothing dirty.
#[test]
fn eviction_never_writes_dirty_pages_before_commit() {
    common::setup();
    Database::global().buffer_pool().set_capacity_for_test(3);

    let table_id = common::new_heap_table(1);
    let tid = TransactionId::new();

    for i in 0..10 {
        let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
        let tuple = Tuple::new(db_file.get_tuple_desc().clone(), vec![Field::Int(i)]);
        db_file.insert_tuple(tid, tuple).unwrap();
    }

    // every page this transaction touched is still exactly as it was
    // written in memory: nothing was silently dropped by eviction.
    Database::global().buffer_pool().transaction_complete(tid, true).unwrap();
    Database::global().buffer_pool().flush_all_pages().unwrap();

    let tid2 = TransactionId::new();
    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let mut it = db_file.iterator(tid2);
    it.open().unwrap();
    let mut count = 0;
    while it.next().unwrap().is_some() {
        count += 1;
    }
    it.close();
    assert_eq!(count, 10);
    Database::global().buffer_pool().transaction_complete(tid2, true).unwrap();
}
