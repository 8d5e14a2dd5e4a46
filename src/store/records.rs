//! Record store - durable storage and retrieval over SQLite
//!
//! All multi-table writes (record + sub-entries + tag associations) run
//! inside a single transaction. Deletes cascade through foreign keys.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::reminders::Reminder;
use crate::store::error::{StoreError, StoreResult};
use crate::store::schema::init_schema;
use crate::store::types::{FileRef, Measurement, Profile, Record, RecordType};

/// Embedded record store
///
/// Wraps a single SQLite connection. Callers needing shared access put it
/// behind the [`Repository`](crate::store::Repository).
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests and dry runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a new record with its sub-entries and tags
    pub fn insert_record(&mut self, record: &Record) -> StoreResult<()> {
        if !record.sub_entries_consistent() {
            return Err(StoreError::InconsistentSubEntries {
                id: record.id,
                record_type: record.record_type.as_str().to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO records (id, date, record_type, description, notes, doctor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.date.to_string(),
                record.record_type.as_str(),
                record.description,
                record.notes,
                record.doctor,
            ],
        )?;
        write_sub_entries(&tx, record)?;
        write_tags(&tx, record)?;
        tx.commit()?;

        tracing::debug!(id = %record.id, record_type = %record.record_type, "Inserted record");
        Ok(())
    }

    /// Load a record by id, or `None` if it does not exist
    pub fn get_record(&self, id: &Uuid) -> StoreResult<Option<Record>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, record_type, description, notes, doctor
                 FROM records WHERE id = ?1",
                params![id.to_string()],
                map_record_row,
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing record; sub-entries and tag associations are
    /// fully replaced, not merged.
    pub fn update_record(&mut self, record: &Record) -> StoreResult<()> {
        if !record.sub_entries_consistent() {
            return Err(StoreError::InconsistentSubEntries {
                id: record.id,
                record_type: record.record_type.as_str().to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE records SET date = ?2, record_type = ?3, description = ?4,
             notes = ?5, doctor = ?6 WHERE id = ?1",
            params![
                record.id.to_string(),
                record.date.to_string(),
                record.record_type.as_str(),
                record.description,
                record.notes,
                record.doctor,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(record.id));
        }

        tx.execute(
            "DELETE FROM measurements WHERE record_id = ?1",
            params![record.id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM clinical_data WHERE record_id = ?1",
            params![record.id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM consultation_files WHERE record_id = ?1",
            params![record.id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM record_tags WHERE record_id = ?1",
            params![record.id.to_string()],
        )?;
        write_sub_entries(&tx, record)?;
        write_tags(&tx, record)?;
        tx.commit()?;

        tracing::debug!(id = %record.id, "Updated record");
        Ok(())
    }

    /// Delete a record; sub-entries and tag associations cascade
    pub fn delete_record(&mut self, id: &Uuid) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(*id));
        }
        tracing::debug!(id = %id, "Deleted record");
        Ok(())
    }

    /// Full scan: every record with its tags, ordered by date then id
    pub fn all_records(&self) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, record_type, description, notes, doctor
             FROM records ORDER BY date, id",
        )?;
        let rows: Vec<RecordRow> = stmt
            .query_map([], map_record_row)?
            .collect::<Result<_, _>>()?;

        rows.into_iter().map(|row| self.hydrate(row)).collect()
    }

    /// All known tag names, sorted
    pub fn tag_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM tags ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(names)
    }

    /// Load the user profile (default if never saved)
    pub fn get_profile(&self) -> StoreResult<Profile> {
        let profile = self
            .conn
            .query_row(
                "SELECT name, date_of_birth, blood_type, height_cm, weight_kg, notes
                 FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        match profile {
            Some((name, dob, blood_type, height_cm, weight_kg, notes)) => Ok(Profile {
                name,
                date_of_birth: dob.map(|s| parse_date(&s)).transpose()?,
                blood_type,
                height_cm,
                weight_kg,
                notes,
            }),
            None => Ok(Profile::default()),
        }
    }

    /// Save the user profile (upsert of the single row)
    pub fn set_profile(&mut self, profile: &Profile) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO profile (id, name, date_of_birth, blood_type, height_cm, weight_kg, notes)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET name = ?1, date_of_birth = ?2, blood_type = ?3,
             height_cm = ?4, weight_kg = ?5, notes = ?6",
            params![
                profile.name,
                profile.date_of_birth.map(|d| d.to_string()),
                profile.blood_type,
                profile.height_cm,
                profile.weight_kg,
                profile.notes,
            ],
        )?;
        Ok(())
    }

    /// Insert a medication reminder
    pub fn insert_reminder(&mut self, reminder: &Reminder) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO reminders (id, medication, dose, interval_hours, start_at, last_taken_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reminder.id.to_string(),
                reminder.medication,
                reminder.dose,
                reminder.interval_hours,
                reminder.start_at,
                reminder.last_taken_at,
            ],
        )?;
        Ok(())
    }

    /// All reminders, ordered by medication name
    pub fn all_reminders(&self) -> StoreResult<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, medication, dose, interval_hours, start_at, last_taken_at
             FROM reminders ORDER BY medication",
        )?;
        let rows: Vec<(String, String, String, i64, i64, Option<i64>)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, medication, dose, interval_hours, start_at, last_taken_at)| {
                Ok(Reminder {
                    id: parse_uuid(&id)?,
                    medication,
                    dose,
                    interval_hours,
                    start_at,
                    last_taken_at,
                })
            })
            .collect()
    }

    /// Record that a dose was taken at the given timestamp (millis)
    pub fn mark_reminder_taken(&mut self, id: &Uuid, taken_at: i64) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE reminders SET last_taken_at = ?2 WHERE id = ?1",
            params![id.to_string(), taken_at],
        )?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(*id));
        }
        Ok(())
    }

    /// Delete a reminder
    pub fn delete_reminder(&mut self, id: &Uuid) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM reminders WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::RecordNotFound(*id));
        }
        Ok(())
    }

    /// Attach sub-entries and tags to a bare record row
    fn hydrate(&self, row: RecordRow) -> StoreResult<Record> {
        let id = parse_uuid(&row.id)?;
        let record_type = RecordType::parse(&row.record_type)
            .ok_or_else(|| StoreError::UnknownRecordType(row.record_type.clone()))?;

        let mut stmt = self.conn.prepare(
            "SELECT value, unit FROM measurements WHERE record_id = ?1 ORDER BY id",
        )?;
        let measurements: Vec<Measurement> = stmt
            .query_map(params![row.id], |r| {
                Ok(Measurement {
                    value: r.get(0)?,
                    unit: r.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT file_path, mime_type FROM clinical_data WHERE record_id = ?1 ORDER BY id",
        )?;
        let clinical_data: Vec<FileRef> = stmt
            .query_map(params![row.id], |r| {
                Ok(FileRef {
                    path: r.get(0)?,
                    mime_type: r.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT file_path, mime_type FROM consultation_files WHERE record_id = ?1 ORDER BY id",
        )?;
        let attachments: Vec<FileRef> = stmt
            .query_map(params![row.id], |r| {
                Ok(FileRef {
                    path: r.get(0)?,
                    mime_type: r.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN record_tags rt ON rt.tag_id = t.id
             WHERE rt.record_id = ?1 ORDER BY rt.position",
        )?;
        let tags: Vec<String> = stmt
            .query_map(params![row.id], |r| r.get(0))?
            .collect::<Result<_, _>>()?;

        Ok(Record {
            id,
            date: parse_date(&row.date)?,
            record_type,
            description: row.description,
            notes: row.notes,
            doctor: row.doctor,
            tags,
            measurements,
            clinical_data,
            attachments,
        })
    }
}

/// Bare row from the records table, before hydration
struct RecordRow {
    id: String,
    date: String,
    record_type: String,
    description: Option<String>,
    notes: Option<String>,
    doctor: Option<String>,
}

fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        date: row.get(1)?,
        record_type: row.get(2)?,
        description: row.get(3)?,
        notes: row.get(4)?,
        doctor: row.get(5)?,
    })
}

fn write_sub_entries(tx: &rusqlite::Transaction<'_>, record: &Record) -> StoreResult<()> {
    for m in &record.measurements {
        tx.execute(
            "INSERT INTO measurements (record_id, value, unit) VALUES (?1, ?2, ?3)",
            params![record.id.to_string(), m.value, m.unit],
        )?;
    }
    for f in &record.clinical_data {
        tx.execute(
            "INSERT INTO clinical_data (record_id, file_path, mime_type) VALUES (?1, ?2, ?3)",
            params![record.id.to_string(), f.path, f.mime_type],
        )?;
    }
    for f in &record.attachments {
        tx.execute(
            "INSERT INTO consultation_files (record_id, file_path, mime_type) VALUES (?1, ?2, ?3)",
            params![record.id.to_string(), f.path, f.mime_type],
        )?;
    }
    Ok(())
}

/// Tags are created on first use and associated in record order
fn write_tags(tx: &rusqlite::Transaction<'_>, record: &Record) -> StoreResult<()> {
    for (position, name) in record.tags.iter().enumerate() {
        tx.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )?;
        let tag_id: i64 =
            tx.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |r| {
                r.get(0)
            })?;
        tx.execute(
            "INSERT INTO record_tags (record_id, tag_id, position) VALUES (?1, ?2, ?3)",
            params![record.id.to_string(), tag_id, position as i64],
        )?;
    }
    Ok(())
}

fn parse_uuid(s: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::Corruption(format!("bad uuid {s:?}: {e}")))
}

fn parse_date(s: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::Corruption(format!("bad date {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::RecordType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_consultation() -> Record {
        Record::new(RecordType::Consultation, date(2024, 3, 1))
            .description("Annual checkup")
            .notes("All clear")
            .doctor("Dr. Osei")
            .tag("routine")
            .tag("gp")
            .attachment("/data/scan.pdf", "application/pdf")
    }

    #[test]
    fn test_insert_and_reload_round_trip() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let record = sample_consultation();
        store.insert_record(&record).unwrap();

        let loaded = store.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_get_missing_record_is_none() {
        let store = RecordStore::open_in_memory().unwrap();
        assert!(store.get_record(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_inconsistent_sub_entries_rejected() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let bad = Record::new(RecordType::Consultation, date(2024, 3, 1)).measurement(72.5, "kg");

        let result = store.insert_record(&bad);
        assert!(matches!(
            result,
            Err(StoreError::InconsistentSubEntries { .. })
        ));
    }

    #[test]
    fn test_update_replaces_sub_entries_and_tags() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let mut record = Record::new(RecordType::VitalSign, date(2024, 3, 1))
            .measurement(120.0, "mmHg")
            .measurement(80.0, "mmHg")
            .tag("bp");
        store.insert_record(&record).unwrap();

        record.measurements = vec![Measurement::new(118.0, "mmHg")];
        record.tags = vec!["bp".to_string(), "morning".to_string()];
        store.update_record(&record).unwrap();

        let loaded = store.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded.measurements, vec![Measurement::new(118.0, "mmHg")]);
        assert_eq!(loaded.tags, vec!["bp", "morning"]);
    }

    #[test]
    fn test_update_missing_record_errors() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let record = sample_consultation();
        assert!(matches!(
            store.update_record(&record),
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let record = sample_consultation();
        store.insert_record(&record).unwrap();
        store.delete_record(&record.id).unwrap();

        assert!(store.get_record(&record.id).unwrap().is_none());
        let orphans: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM consultation_files WHERE record_id = ?1",
                params![record.id.to_string()],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        let associations: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM record_tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(associations, 0);
    }

    #[test]
    fn test_delete_missing_record_errors() {
        let mut store = RecordStore::open_in_memory().unwrap();
        assert!(matches!(
            store.delete_record(&Uuid::new_v4()),
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn test_tags_shared_between_records() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let first = Record::new(RecordType::Consultation, date(2024, 1, 1)).tag("chronic");
        let second = Record::new(RecordType::LabTest, date(2024, 2, 1))
            .tag("chronic")
            .clinical_file("/data/cbc.pdf", "application/pdf");
        store.insert_record(&first).unwrap();
        store.insert_record(&second).unwrap();

        // One tag row shared through two associations
        let tag_count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tag_count, 1);
        assert_eq!(store.tag_names().unwrap(), vec!["chronic"]);
    }

    #[test]
    fn test_all_records_ordered_by_date() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let later = Record::new(RecordType::Consultation, date(2024, 6, 1));
        let earlier = Record::new(RecordType::Consultation, date(2024, 1, 1));
        store.insert_record(&later).unwrap();
        store.insert_record(&earlier).unwrap();

        let all = store.all_records().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].date, date(2024, 1, 1));
        assert_eq!(all[1].date, date(2024, 6, 1));
    }

    #[test]
    fn test_profile_round_trip() {
        let mut store = RecordStore::open_in_memory().unwrap();
        assert_eq!(store.get_profile().unwrap(), Profile::default());

        let profile = Profile {
            name: Some("Alex Example".to_string()),
            date_of_birth: Some(date(1990, 7, 14)),
            blood_type: Some("O+".to_string()),
            height_cm: Some(178.0),
            weight_kg: Some(72.5),
            notes: None,
        };
        store.set_profile(&profile).unwrap();
        assert_eq!(store.get_profile().unwrap(), profile);

        // Upsert replaces the single row
        let updated = Profile {
            weight_kg: Some(71.0),
            ..profile
        };
        store.set_profile(&updated).unwrap();
        assert_eq!(store.get_profile().unwrap(), updated);
    }

    #[test]
    fn test_reminder_round_trip() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let reminder = Reminder::new("Metformin", "500 mg", 12, 1_700_000_000_000);
        store.insert_reminder(&reminder).unwrap();

        let all = store.all_reminders().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], reminder);

        store
            .mark_reminder_taken(&reminder.id, 1_700_000_100_000)
            .unwrap();
        let all = store.all_reminders().unwrap();
        assert_eq!(all[0].last_taken_at, Some(1_700_000_100_000));

        store.delete_reminder(&reminder.id).unwrap();
        assert!(store.all_reminders().unwrap().is_empty());
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitalog.db");
        let record = sample_consultation();

        {
            let mut store = RecordStore::open(&path).unwrap();
            store.insert_record(&record).unwrap();
        }

        let store = RecordStore::open(&path).unwrap();
        let loaded = store.get_record(&record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }
}
