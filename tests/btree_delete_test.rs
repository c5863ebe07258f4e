mod common;

use small_storage::common::database::Database;
use small_storage::dbfile::DbFile;
use small_storage::field::Field;
use small_storage::transaction::TransactionId;
use small_storage::tuple::Tuple;

// Insert keys ascending, then delete them back off in reverse order,
// checking structural invariants (which cover min-occupancy merge/steal)
// after every delete; the tree is empty at the end.
#[test]
fn reverse_deletes_keep_tree_invariants_and_end_empty() {
    common::setup();
    small_storage::BufferPool::set_page_size(1024);
    let (table_id, btree) = common::new_btree_table_handle(2, 0);
    let tid = TransactionId::new();

    let mut tuples = Vec::new();
    for i in 0..500 {
        let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
        let tuple = Tuple::new(db_file.get_tuple_desc().clone(), vec![Field::Int(i), Field::Int(i * 2)]);
        db_file.insert_tuple(tid, tuple.clone()).unwrap();
        tuples.push(tuple);
    }
    btree.check_integrity(tid).unwrap();

    for tuple in tuples.into_iter().rev() {
        let db_file = Database::global().catalog().get_db_file(table_id).unwrap();

        // the record id insert_tuple assigned lives on the stored copy, not
        // the one pushed before insertion, so look it up through a scan.
        let key = tuple.get_field(0).clone();
        let mut it = db_file.iterator(tid);
        it.open().unwrap();
        let mut found = None;
        while let Some(t) = it.next().unwrap() {
            if t.get_field(0) == &key {
                found = Some(t);
                break;
            }
        }
        it.close();
        let found = found.expect("deleted key should still be present before its own delete");

        db_file.delete_tuple(tid, &found).unwrap();
        btree.check_integrity(tid).unwrap();
    }

    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let mut it = db_file.iterator(tid);
    it.open().unwrap();
    assert!(it.next().unwrap().is_none());
    it.close();

    Database::global().buffer_pool().transaction_complete(tid, true).unwrap();
}
