mod common;

use small_storage::common::database::Database;
use small_storage::dbfile::DbFile;
use small_storage::field::Field;
use small_storage::transaction::TransactionId;
use small_storage::tuple::Tuple;

// Insert keys in ascending order, verify the tree's structural invariants
// hold after every single insert, then confirm an ascending scan returns
// them in order with none lost or duplicated.
#[test]
fn ascending_inserts_keep_tree_invariants_and_order() {
    common::setup();
    // small page size forces many splits over the course of 1000 inserts.
    small_storage::BufferPool::set_page_size(1024);
    let (table_id, btree) = common::new_btree_table_handle(2, 0);
    let tid = TransactionId::new();

    for i in 0..1000 {
        let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
        let tuple = Tuple::new(db_file.get_tuple_desc().clone(), vec![Field::Int(i), Field::Int(i * 2)]);
        db_file.insert_tuple(tid, tuple).unwrap();
        btree.check_integrity(tid).unwrap();
    }

    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let mut it = db_file.iterator(tid);
    it.open().unwrap();
    let mut seen = Vec::new();
    while let Some(t) = it.next().unwrap() {
        seen.push(t.get_field(0).as_int());
    }
    it.close();

    assert_eq!(seen, (0..1000).collect::<Vec<_>>());
    Database::global().buffer_pool().transaction_complete(tid, true).unwrap();
}
