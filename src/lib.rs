//! # Vitalog
//!
//! Personal Medical Records - A Rust application for keeping, filtering,
//! and analyzing a private health history, with optional encrypted PIN
//! protection and WebDAV backup.
//!
//! ## Features
//!
//! - **Local-first storage**: All records live in an embedded SQLite database
//! - **Ten record kinds**: From consultations and prescriptions to lab exams
//! - **Live snapshots**: Repository republishes the full record list after every change
//! - **Statistics**: Six metrics rendered as point, bar, pie, and scatter data
//! - **Backup**: CSV export and WebDAV sync with per-step status reporting
//! - **Privacy**: PIN stored only as ChaCha20-Poly1305 ciphertext
//!
//! ## Modules
//!
//! - [`store`]: Record types, SQLite persistence, and the async repository
//! - [`filter`]: Composable record filtering
//! - [`stats`]: Metric aggregation into chart-ready data
//! - [`sync`]: WebDAV client and backup orchestration
//! - [`auth`]: PIN vault and authentication state machine
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vitalog::store::{Record, RecordStore, RecordType, Repository};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = Repository::new(RecordStore::open("vitalog.db")?)?;
//!
//!     // Watch for changes
//!     let mut snapshots = repository.subscribe();
//!
//!     // Add a record
//!     let record = Record::new(
//!         RecordType::Consultation,
//!         NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
//!     )
//!     .description("Annual check-up")
//!     .doctor("Dr. Ames")
//!     .tag("routine");
//!
//!     repository.add(&record).await?;
//!
//!     snapshots.changed().await?;
//!     println!("Now holding {} records", snapshots.borrow().len());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod export;
pub mod filter;
pub mod reminders;
pub mod stats;
pub mod store;
pub mod sync;

// Re-export top-level types for convenience
pub use store::{
    FileRef, Measurement, Profile, Record, RecordCategory, RecordStore, RecordType, Repository,
    StoreError, StoreResult,
};

pub use filter::RecordFilter;

pub use stats::{ChartData, ChartEntry, SeriesPoint, StatsMetric, TOP_TAGS_LIMIT};

pub use export::{profile_to_json, to_csv_string, write_csv, ExportError};

pub use sync::{
    SyncManager, SyncReport, SyncStep, WebDavClient, WebDavConfig, WebDavError,
};

pub use auth::{
    AuthError, AuthFlow, AuthState, BiometricCapability, NoBiometrics, PinVault,
};

pub use reminders::{due_reminders, Reminder};

pub use config::{Config, ConfigError, LoggingConfig, StorageConfig, SyncConfig};
