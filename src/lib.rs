pub mod btree;
pub mod buffer_pool;
pub mod catalog;
pub mod common;
pub mod dbfile;
pub mod error;
pub mod field;
pub mod heap;
pub mod io;
pub mod log;
pub mod page_id;
pub mod transaction;
pub mod tuple;
pub mod tx_log;

pub use buffer_pool::BufferPool;
pub use catalog::Catalog;
pub use common::database::Database;
pub use dbfile::{DbFile, DbFileIterator};
pub use error::{SmallError, SmallResult};
