//! Core data types for the Vitalog record store
//!
//! This module defines the fundamental types used throughout the crate:
//! - `Record`: one medical-documentation entry with its sub-entries and tags
//! - `RecordType` and `RecordCategory`: the closed type enumeration
//! - `Measurement` and `FileRef`: per-type sub-entries
//! - `Profile`: the single-row user profile that feeds the sync snapshot

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The ten kinds of medical record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Consultation,
    Surgery,
    Vaccination,
    Treatment,
    Allergy,
    Symptom,
    Measurement,
    VitalSign,
    LabTest,
    Imaging,
}

/// Which family of sub-entries a record type carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCategory {
    /// Consultation-like: carries file attachments
    Consultation,
    /// Measurement-like: carries numeric measurements
    Measurement,
    /// Lab/imaging: carries clinical-data files
    ClinicalData,
}

impl RecordType {
    /// Get all record types for iteration
    pub fn all() -> &'static [RecordType] {
        &[
            RecordType::Consultation,
            RecordType::Surgery,
            RecordType::Vaccination,
            RecordType::Treatment,
            RecordType::Allergy,
            RecordType::Symptom,
            RecordType::Measurement,
            RecordType::VitalSign,
            RecordType::LabTest,
            RecordType::Imaging,
        ]
    }

    /// The sub-entry family this type belongs to
    pub fn category(&self) -> RecordCategory {
        match self {
            RecordType::Consultation
            | RecordType::Surgery
            | RecordType::Vaccination
            | RecordType::Treatment
            | RecordType::Allergy
            | RecordType::Symptom => RecordCategory::Consultation,
            RecordType::Measurement | RecordType::VitalSign => RecordCategory::Measurement,
            RecordType::LabTest | RecordType::Imaging => RecordCategory::ClinicalData,
        }
    }

    /// Stable string form used in the database and CSV export
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Consultation => "consultation",
            RecordType::Surgery => "surgery",
            RecordType::Vaccination => "vaccination",
            RecordType::Treatment => "treatment",
            RecordType::Allergy => "allergy",
            RecordType::Symptom => "symptom",
            RecordType::Measurement => "measurement",
            RecordType::VitalSign => "vital_sign",
            RecordType::LabTest => "lab_test",
            RecordType::Imaging => "imaging",
        }
    }

    /// Parse the stable string form back into a type
    pub fn parse(s: &str) -> Option<Self> {
        RecordType::all().iter().copied().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A numeric measurement sub-entry (e.g. 72.5 kg)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

impl Measurement {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// A file sub-entry: consultation attachment or clinical-data file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    /// Path to the file on local disk
    pub path: String,
    /// MIME type (e.g. "application/pdf", "image/png")
    pub mime_type: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// The final path component, used in CSV export and remote upload names
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A single medical record with its tags and sub-entries
///
/// Sub-entries are only populated consistently with the record's type
/// category: the store rejects a measurement on a consultation, etc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Opaque unique identifier
    pub id: Uuid,
    /// Date the documented event occurred
    pub date: NaiveDate,
    /// Record type (fixed enumeration)
    pub record_type: RecordType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub doctor: Option<String>,
    /// Tag names in stable order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Measurement sub-entries (measurement-like types)
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    /// Clinical-data sub-entries (lab/imaging types)
    #[serde(default)]
    pub clinical_data: Vec<FileRef>,
    /// File attachments (consultation-like types)
    #[serde(default)]
    pub attachments: Vec<FileRef>,
}

impl Record {
    /// Create a new record with a fresh id and no sub-entries
    pub fn new(record_type: RecordType, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            record_type,
            description: None,
            notes: None,
            doctor: None,
            tags: Vec::new(),
            measurements: Vec::new(),
            clinical_data: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: set notes
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder: set doctor
    pub fn doctor(mut self, doctor: impl Into<String>) -> Self {
        self.doctor = Some(doctor.into());
        self
    }

    /// Builder: add a tag (deduplicated, order preserved)
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.tags.contains(&name) {
            self.tags.push(name);
        }
        self
    }

    /// Builder: add a measurement sub-entry
    pub fn measurement(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.measurements.push(Measurement::new(value, unit));
        self
    }

    /// Builder: add a clinical-data sub-entry
    pub fn clinical_file(mut self, path: impl Into<String>, mime: impl Into<String>) -> Self {
        self.clinical_data.push(FileRef::new(path, mime));
        self
    }

    /// Builder: add a consultation attachment
    pub fn attachment(mut self, path: impl Into<String>, mime: impl Into<String>) -> Self {
        self.attachments.push(FileRef::new(path, mime));
        self
    }

    /// Check that sub-entries match the type category
    pub fn sub_entries_consistent(&self) -> bool {
        match self.record_type.category() {
            RecordCategory::Consultation => {
                self.measurements.is_empty() && self.clinical_data.is_empty()
            }
            RecordCategory::Measurement => {
                self.clinical_data.is_empty() && self.attachments.is_empty()
            }
            RecordCategory::ClinicalData => {
                self.measurements.is_empty() && self.attachments.is_empty()
            }
        }
    }

    /// Every file sub-entry regardless of category
    pub fn files(&self) -> impl Iterator<Item = &FileRef> {
        self.attachments.iter().chain(self.clinical_data.iter())
    }
}

/// The single-row user profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}
