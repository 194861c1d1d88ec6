use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not process the file: {0}")]
    Unreadable(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
