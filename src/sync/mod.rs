//! WebDAV backup sync
//!
//! [`WebDavClient`] speaks the two WebDAV verbs sync needs (MKCOL, PUT);
//! [`SyncManager`] drives the per-step upload and aggregates the report.

pub mod client;
pub mod manager;

pub use client::{WebDavClient, WebDavConfig, WebDavError};
pub use manager::{SyncManager, SyncReport, SyncStep, PROFILE_FILE, RECORDS_FILE};
