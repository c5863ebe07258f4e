use std::fmt;

use backtrace::Backtrace;

/// The four error kinds the engine distinguishes, per the error handling
/// design: transactions abort on deadlock/interruption, logical storage
/// failures are `DbException`, I/O failures on write paths are `IoError`,
/// and malformed reads (short reads, past-EOF) are `IllegalArgument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransactionAborted,
    DbException,
    IoError,
    IllegalArgument,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::TransactionAborted => "TransactionAborted",
            ErrorKind::DbException => "DbException",
            ErrorKind::IoError => "IoError",
            ErrorKind::IllegalArgument => "IllegalArgument",
        };
        write!(f, "{}", s)
    }
}

pub struct SmallError {
    kind: ErrorKind,
    message: String,
    backtrace: Backtrace,
}

impl SmallError {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            backtrace: Backtrace::new(),
        }
    }

    pub fn transaction_aborted(message: &str) -> Self {
        Self::new(ErrorKind::TransactionAborted, message)
    }

    pub fn db_exception(message: &str) -> Self {
        Self::new(ErrorKind::DbException, message)
    }

    pub fn io_error(message: &str) -> Self {
        Self::new(ErrorKind::IoError, message)
    }

    pub fn illegal_argument(message: &str) -> Self {
        Self::new(ErrorKind::IllegalArgument, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn show_backtrace(&self) {
        log::error!("{}: {}\n{:?}", self.kind, self.message, self.backtrace);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SmallError {{ kind: {:?}, message: {} }}", self.kind, self.message)
    }
}

impl std::error::Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::io_error(&e.to_string())
    }
}

pub type SmallResult<T = ()> = Result<T, SmallError>;
