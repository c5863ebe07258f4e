mod common;

use small_storage::common::database::Database;
use small_storage::dbfile::DbFile;
use small_storage::field::Field;
use small_storage::transaction::TransactionId;
use small_storage::tuple::Tuple;

// A heap scan returns exactly the inserted tuples, order irrelevant.
#[test]
fn scan_returns_every_inserted_tuple() {
    common::setup();
    let table_id = common::new_heap_table(2);
    let tid = TransactionId::new();

    for i in 0..10 {
        let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
        let tuple = Tuple::new(db_file.get_tuple_desc().clone(), vec![Field::Int(i), Field::Int(2 * i)]);
        db_file.insert_tuple(tid, tuple).unwrap();
    }

    let db_file = Database::global().catalog().get_db_file(table_id).unwrap();
    let mut it = db_file.iterator(tid);
    it.open().unwrap();

    let mut seen: Vec<(i32, i32)> = Vec::new();
    while let Some(t) = it.next().unwrap() {
        seen.push((t.get_field(0).as_int(), t.get_field(1).as_int()));
    }
    it.close();

    seen.sort();
    let expected: Vec<(i32, i32)> = (0..10).map(|i| (i, 2 * i)).collect();
    assert_eq!(seen, expected);

    Database::global().buffer_pool().transaction_complete(tid, true).unwrap();
}
