use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::OnceCell;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::transaction::lock_manager::LockManager;
use crate::tx_log::LogManager;

static DB: OnceCell<Database> = OnceCell::new();

const DEFAULT_BUFFER_POOL_CAPACITY: usize = 64;

/// Process-wide context value bundling the catalog, buffer pool, lock
/// manager, and log manager into one explicit singleton rather than
/// scattered statics, built on `once_cell::sync::OnceCell`.
pub struct Database {
    buffer_pool: BufferPool,
    catalog: RwLock<Catalog>,
    lock_manager: LockManager,
    log_manager: LogManager,
}

impl Database {
    fn new() -> Self {
        let log_path = std::env::temp_dir().join(format!("small-storage-wal-{}.log", std::process::id()));
        Self {
            buffer_pool: BufferPool::new(DEFAULT_BUFFER_POOL_CAPACITY),
            catalog: RwLock::new(Catalog::new()),
            lock_manager: LockManager::new(),
            log_manager: LogManager::new(log_path).expect("failed to open WAL file"),
        }
    }

    pub fn global() -> &'static Database {
        DB.get_or_init(Database::new)
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn catalog(&self) -> RwLockReadGuard<Catalog> {
        self.catalog.read().unwrap()
    }

    pub fn catalog_mut(&self) -> RwLockWriteGuard<Catalog> {
        self.catalog.write().unwrap()
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.log_manager
    }
}

