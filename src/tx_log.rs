use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::SmallResult;
use crate::transaction::TransactionId;

/// Opaque write-ahead-log collaborator: `log_write` records a before/after
/// image pair, `force` makes them durable. No recovery replay is
/// implemented; this is intentionally just the append-only sink the buffer
/// pool calls on flush.
pub struct LogManager {
    file: Mutex<File>,
}

impl LogManager {
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    pub fn log_write(&self, tid: TransactionId, before_image: &[u8], after_image: &[u8]) -> SmallResult {
        let mut file = self.file.lock().unwrap();
        writeln!(
            file,
            "UPDATE {} before={}B after={}B",
            tid,
            before_image.len(),
            after_image.len()
        )
        .map_err(|e| e.into())
    }

    pub fn log_abort(&self, tid: TransactionId) -> SmallResult {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "ABORT {}", tid).map_err(|e| e.into())
    }

    pub fn log_commit(&self, tid: TransactionId) -> SmallResult {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "COMMIT {}", tid).map_err(|e| e.into())
    }

    pub fn force(&self) -> SmallResult {
        let mut file = self.file.lock().unwrap();
        file.flush().map_err(|e| e.into())
    }
}
