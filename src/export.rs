//! Export - CSV record dump and profile JSON snapshot
//!
//! The CSV schema is fixed: id, type, date, description, notes, doctor,
//! tags (semicolon-joined), measurement summary, attachment filenames.
//! This is the format the sync client uploads as the remote backup.

use std::io::Write;

use thiserror::Error;

use crate::store::types::{Profile, Record};

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

const CSV_HEADER: [&str; 9] = [
    "id",
    "type",
    "date",
    "description",
    "notes",
    "doctor",
    "tags",
    "measurements",
    "attachments",
];

/// Write records as CSV to any writer
pub fn write_csv<W: Write>(records: &[Record], writer: W) -> ExportResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for record in records {
        let measurements = record
            .measurements
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let attachments = record
            .files()
            .map(|f| f.file_name().to_string())
            .collect::<Vec<_>>()
            .join("; ");

        csv_writer.write_record([
            record.id.to_string().as_str(),
            record.record_type.as_str(),
            record.date.to_string().as_str(),
            record.description.as_deref().unwrap_or(""),
            record.notes.as_deref().unwrap_or(""),
            record.doctor.as_deref().unwrap_or(""),
            record.tags.join("; ").as_str(),
            measurements.as_str(),
            attachments.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render records to an in-memory CSV string
pub fn to_csv_string(records: &[Record]) -> ExportResult<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Serialize the profile snapshot as pretty JSON
pub fn profile_to_json(profile: &Profile) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(profile)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::RecordType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_csv_header_and_columns() {
        let records = vec![
            Record::new(RecordType::Consultation, date(2024, 3, 1))
                .description("Annual checkup")
                .doctor("Dr. Osei")
                .tag("routine")
                .tag("gp")
                .attachment("/data/records/scan.pdf", "application/pdf"),
            Record::new(RecordType::VitalSign, date(2024, 3, 2))
                .measurement(120.0, "mmHg")
                .measurement(80.0, "mmHg"),
        ];

        let csv = to_csv_string(&records).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,type,date,description,notes,doctor,tags,measurements,attachments"
        );

        let first = lines.next().unwrap();
        assert!(first.contains("consultation"));
        assert!(first.contains("routine; gp"));
        assert!(first.contains("scan.pdf"));
        assert!(!first.contains("/data/records")); // filenames only

        let second = lines.next().unwrap();
        assert!(second.contains("120 mmHg; 80 mmHg"));
    }

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let records = vec![Record::new(RecordType::Consultation, date(2024, 3, 1))
            .description("Follow-up, post-op")];
        let csv = to_csv_string(&records).unwrap();
        assert!(csv.contains("\"Follow-up, post-op\""));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_profile_json_round_trip() {
        let profile = Profile {
            name: Some("Alex Example".to_string()),
            blood_type: Some("O+".to_string()),
            ..Profile::default()
        };
        let json = profile_to_json(&profile).unwrap();
        let restored: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, profile);
    }
}
