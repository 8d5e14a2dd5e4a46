//! Record store error types

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Requested record does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    /// Row holds a type string the current enumeration does not know
    #[error("Unknown record type in database: {0}")]
    UnknownRecordType(String),

    /// Sub-entries do not match the record's type category
    #[error("Record {id} of type {record_type} carries sub-entries of the wrong category")]
    InconsistentSubEntries { id: Uuid, record_type: String },

    /// Stored date or id could not be parsed back
    #[error("Corrupt row: {0}")]
    Corruption(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UnknownRecordType("xray".to_string());
        assert_eq!(err.to_string(), "Unknown record type in database: xray");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
