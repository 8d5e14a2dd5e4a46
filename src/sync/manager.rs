//! Sync manager
//!
//! Uploads the profile snapshot, the CSV record export, and every file
//! attachment to the WebDAV collection. Each step is attempted once;
//! failures are caught per step and surfaced as human-readable status
//! lines in the final report. No retries.

use chrono::Utc;

use crate::export;
use crate::store::Repository;
use crate::sync::client::WebDavClient;

/// Remote name of the profile snapshot
pub const PROFILE_FILE: &str = "profile.json";
/// Remote name of the CSV export
pub const RECORDS_FILE: &str = "records.csv";

/// Outcome of one sync step
#[derive(Debug, Clone)]
pub struct SyncStep {
    /// Human-readable step name ("profile", "records", an attachment name)
    pub name: String,
    pub ok: bool,
    /// Error text when the step failed
    pub detail: Option<String>,
}

impl SyncStep {
    fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: None,
        }
    }

    fn failed(name: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: Some(detail.to_string()),
        }
    }
}

/// Aggregated result of a sync run
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// When the run started (millis since epoch)
    pub started_at: i64,
    pub duration_ms: u64,
    pub steps: Vec<SyncStep>,
}

impl SyncReport {
    /// True when every step succeeded
    pub fn success(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    /// Human-readable status lines, one per step
    pub fn status_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| match &s.detail {
                Some(detail) => format!("{}: failed ({detail})", s.name),
                None => format!("{}: ok", s.name),
            })
            .collect()
    }
}

/// Drives one backup upload against a WebDAV collection
pub struct SyncManager {
    client: WebDavClient,
    repository: Repository,
}

impl SyncManager {
    pub fn new(client: WebDavClient, repository: Repository) -> Self {
        Self { client, repository }
    }

    /// Run a full sync: collection, profile, CSV export, attachments
    pub async fn sync(&self) -> SyncReport {
        let started_at = Utc::now().timestamp_millis();
        let start = std::time::Instant::now();
        let mut steps = Vec::new();

        steps.push(match self.client.ensure_collection().await {
            Ok(()) => SyncStep::ok("collection"),
            Err(e) => SyncStep::failed("collection", e),
        });

        steps.push(self.upload_profile().await);
        steps.push(self.upload_records().await);
        steps.extend(self.upload_attachments().await);

        let report = SyncReport {
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
        };

        if report.success() {
            tracing::info!(
                steps = report.steps.len(),
                duration_ms = report.duration_ms,
                "Sync completed"
            );
        } else {
            let failed = report.steps.iter().filter(|s| !s.ok).count();
            tracing::warn!(failed, "Sync finished with failures");
        }

        report
    }

    async fn upload_profile(&self) -> SyncStep {
        let profile = match self.repository.profile().await {
            Ok(p) => p,
            Err(e) => return SyncStep::failed("profile", e),
        };
        let json = match export::profile_to_json(&profile) {
            Ok(j) => j,
            Err(e) => return SyncStep::failed("profile", e),
        };
        match self
            .client
            .put(PROFILE_FILE, json.into_bytes(), "application/json")
            .await
        {
            Ok(()) => SyncStep::ok("profile"),
            Err(e) => SyncStep::failed("profile", e),
        }
    }

    async fn upload_records(&self) -> SyncStep {
        let records = match self.repository.all().await {
            Ok(r) => r,
            Err(e) => return SyncStep::failed("records", e),
        };
        let csv = match export::to_csv_string(&records) {
            Ok(c) => c,
            Err(e) => return SyncStep::failed("records", e),
        };
        match self
            .client
            .put(RECORDS_FILE, csv.into_bytes(), "text/csv")
            .await
        {
            Ok(()) => SyncStep::ok("records"),
            Err(e) => SyncStep::failed("records", e),
        }
    }

    /// One step per file sub-entry across all records
    async fn upload_attachments(&self) -> Vec<SyncStep> {
        let records = match self.repository.all().await {
            Ok(r) => r,
            Err(e) => return vec![SyncStep::failed("attachments", e)],
        };

        let mut steps = Vec::new();
        for record in &records {
            for file in record.files() {
                let name = attachment_remote_name(&record.id, file);
                let step = match tokio::fs::read(&file.path).await {
                    Ok(bytes) => match self.client.put(&name, bytes, &file.mime_type).await {
                        Ok(()) => SyncStep::ok(&name),
                        Err(e) => SyncStep::failed(&name, e),
                    },
                    Err(e) => SyncStep::failed(&name, format!("read {}: {e}", file.path)),
                };
                steps.push(step);
            }
        }
        steps
    }
}

/// Remote name of an attachment; the record id prefix keeps files with
/// the same basename on different records from overwriting each other
fn attachment_remote_name(record_id: &uuid::Uuid, file: &crate::store::FileRef) -> String {
    format!("{}-{}", record_id, file.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileRef, Record, RecordType};
    use chrono::NaiveDate;

    #[test]
    fn test_attachment_names_distinct_across_records() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let first =
            Record::new(RecordType::Consultation, date).attachment("/a/scan.pdf", "application/pdf");
        let second =
            Record::new(RecordType::Consultation, date).attachment("/b/scan.pdf", "application/pdf");

        let name_a = attachment_remote_name(&first.id, &first.attachments[0]);
        let name_b = attachment_remote_name(&second.id, &second.attachments[0]);
        assert_ne!(name_a, name_b);
        assert!(name_a.ends_with("scan.pdf"));

        let file = FileRef::new("/a/scan.pdf", "application/pdf");
        assert_eq!(
            attachment_remote_name(&first.id, &file),
            format!("{}-scan.pdf", first.id)
        );
    }

    #[test]
    fn test_report_success_requires_all_steps() {
        let report = SyncReport {
            started_at: 0,
            duration_ms: 12,
            steps: vec![SyncStep::ok("collection"), SyncStep::ok("profile")],
        };
        assert!(report.success());

        let report = SyncReport {
            started_at: 0,
            duration_ms: 12,
            steps: vec![
                SyncStep::ok("collection"),
                SyncStep::failed("profile", "connection refused"),
            ],
        };
        assert!(!report.success());
    }

    #[test]
    fn test_status_lines_are_human_readable() {
        let report = SyncReport {
            started_at: 0,
            duration_ms: 5,
            steps: vec![
                SyncStep::ok("records"),
                SyncStep::failed("scan.pdf", "Server error 507: insufficient storage"),
            ],
        };
        let lines = report.status_lines();
        assert_eq!(lines[0], "records: ok");
        assert_eq!(
            lines[1],
            "scan.pdf: failed (Server error 507: insufficient storage)"
        );
    }
}
