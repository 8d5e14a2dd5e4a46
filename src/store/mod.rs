//! Record store - durable storage for medical records
//!
//! Layout mirrors the data model: a `records` table, three per-type detail
//! tables with cascade delete, and a tags many-to-many association. The
//! [`Repository`] wraps the store for shared, observable access.

pub mod error;
pub mod records;
pub mod repository;
pub mod schema;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use records::RecordStore;
pub use repository::Repository;
pub use types::{FileRef, Measurement, Profile, Record, RecordCategory, RecordType};
