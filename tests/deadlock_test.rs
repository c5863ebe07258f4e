mod common;

use std::thread;

use small_storage::common::database::Database;
use small_storage::error::ErrorKind;
use small_storage::page_id::{PageCategory, PageId};
use small_storage::transaction::{Permission, TransactionId};

// Two transactions each hold a shared lock the other wants exclusively;
// whichever one the deadlock detector catches aborts with
// TransactionAborted rather than hanging forever, and the survivor then
// proceeds unimpeded.
#[test]
fn crossing_upgrade_requests_deadlock_and_one_side_aborts() {
    common::setup();
    let table_a = common::new_heap_table(1);
    let table_b = common::new_heap_table(1);
    let page_a = PageId::new(table_a, 0, PageCategory::Heap);
    let page_b = PageId::new(table_b, 0, PageCategory::Heap);

    let t1 = TransactionId::new();
    let t2 = TransactionId::new();

    Database::global().buffer_pool().get_page(t1, page_a, Permission::ReadOnly).unwrap();
    Database::global().buffer_pool().get_page(t2, page_b, Permission::ReadOnly).unwrap();

    let h1 = thread::spawn(move || Database::global().buffer_pool().get_page(t1, page_b, Permission::ReadWrite));
    let h2 = thread::spawn(move || Database::global().buffer_pool().get_page(t2, page_a, Permission::ReadWrite));

    let r1 = h1.join().unwrap();
    let r2 = h2.join().unwrap();

    let aborted = [&r1, &r2].iter().filter(|r| r.is_err()).count();
    assert_eq!(aborted, 1, "exactly one side of the cycle should be aborted");
    for r in [&r1, &r2] {
        if let Err(e) = r {
            assert_eq!(e.kind(), ErrorKind::TransactionAborted);
        }
    }

    Database::global().buffer_pool().transaction_complete(t1, r1.is_ok()).unwrap();
    Database::global().buffer_pool().transaction_complete(t2, r2.is_ok()).unwrap();
}

// Two transactions both hold a shared lock on the SAME page, then both try
// to upgrade it to exclusive at once. Neither can proceed until the other
// releases its shared lock, so this is a deadlock too, just on one page
// instead of two.
#[test]
fn same_page_upgrade_race_deadlocks_and_one_side_aborts() {
    common::setup();
    let table_id = common::new_heap_table(1);
    let page = PageId::new(table_id, 0, PageCategory::Heap);

    let t1 = TransactionId::new();
    let t2 = TransactionId::new();

    Database::global().buffer_pool().get_page(t1, page, Permission::ReadOnly).unwrap();
    Database::global().buffer_pool().get_page(t2, page, Permission::ReadOnly).unwrap();

    let h1 = thread::spawn(move || Database::global().buffer_pool().get_page(t1, page, Permission::ReadWrite));
    let h2 = thread::spawn(move || Database::global().buffer_pool().get_page(t2, page, Permission::ReadWrite));

    let r1 = h1.join().unwrap();
    let r2 = h2.join().unwrap();

    let aborted = [&r1, &r2].iter().filter(|r| r.is_err()).count();
    assert_eq!(aborted, 1, "exactly one side of the upgrade race should be aborted");
    for r in [&r1, &r2] {
        if let Err(e) = r {
            assert_eq!(e.kind(), ErrorKind::TransactionAborted);
        }
    }

    Database::global().buffer_pool().transaction_complete(t1, r1.is_ok()).unwrap();
    Database::global().buffer_pool().transaction_complete(t2, r2.is_ok()).unwrap();
}
