//! Vitalog CLI
//!
//! Command-line interface for the Vitalog medical record keeper:
//! - Add, list, and inspect records
//! - Compute statistics
//! - Export to CSV and sync to a WebDAV server
//! - Manage the PIN vault, profile, and medication reminders

use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalog::auth::PinVault;
use vitalog::config::{generate_default_config, Config};
use vitalog::filter::RecordFilter;
use vitalog::reminders::{due_reminders, Reminder};
use vitalog::stats::StatsMetric;
use vitalog::store::{Record, RecordStore, RecordType, Repository};
use vitalog::sync::{SyncManager, WebDavClient, WebDavConfig};

#[derive(Parser)]
#[command(name = "vitalog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal medical record keeper")]
#[command(
    long_about = "Vitalog keeps your medical history on your own machine.\nRecords live in a local SQLite database; backups go to a WebDAV server you control."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a record
    Add {
        /// Record type (consultation, surgery, vaccination, treatment, allergy,
        /// symptom, measurement, vital_sign, lab_test, imaging)
        record_type: String,
        /// Date of the event (YYYY-MM-DD, "today", or "today-7d")
        #[arg(short, long, default_value = "today")]
        date: String,
        /// Short description
        #[arg(long)]
        description: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Attending doctor
        #[arg(long)]
        doctor: Option<String>,
        /// Tags (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Measurements in "value:unit" format (repeatable)
        #[arg(short, long)]
        measurement: Vec<String>,
        /// Attached document in "path:mime" format (repeatable)
        #[arg(short, long)]
        attachment: Vec<String>,
    },

    /// List records, optionally filtered
    List {
        /// Only these record types (repeatable)
        #[arg(short = 't', long = "type")]
        record_type: Vec<String>,
        /// Only records carrying at least one of these tags (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Start of date range, inclusive (YYYY-MM-DD or "today-30d")
        #[arg(long)]
        from: Option<String>,
        /// End of date range, inclusive
        #[arg(long)]
        to: Option<String>,
        /// Case-insensitive text search over the description
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a single record in full
    Show {
        /// Record id
        id: String,
    },

    /// Delete a record and its sub-entries
    Delete {
        /// Record id
        id: String,
    },

    /// List all known tags
    Tags,

    /// Compute a statistics metric
    Stats {
        /// Metric (count_over_time, average_measurement, type_distribution_bar,
        /// type_distribution_pie, top_tags_bar, measurement_scatter)
        metric: String,
    },

    /// Export all records as CSV
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Back up profile, records, and attachments to the WebDAV server
    Sync,

    /// Manage the PIN vault
    Pin {
        #[command(subcommand)]
        command: PinCommands,
    },

    /// Show or update the patient profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Medication reminders
    Remind {
        #[command(subcommand)]
        command: RemindCommands,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PinCommands {
    /// Set or replace the PIN
    Set {
        /// New PIN (at least 4 digits)
        pin: String,
    },
    /// Check a PIN against the stored one
    Verify { pin: String },
    /// Remove the PIN and its key material
    Clear,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Print the stored profile
    Show,
    /// Update profile fields (unset fields keep their value)
    Set {
        #[arg(long)]
        name: Option<String>,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        born: Option<String>,
        #[arg(long)]
        blood_type: Option<String>,
        #[arg(long)]
        height_cm: Option<f64>,
        #[arg(long)]
        weight_kg: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RemindCommands {
    /// Add a medication reminder
    Add {
        /// Medication name
        medication: String,
        /// Dose description (e.g. "5 mg")
        dose: String,
        /// Interval between doses in hours
        #[arg(short, long, default_value = "24")]
        every: i64,
    },
    /// List reminders that are due now
    Due,
    /// List all reminders
    List,
    /// Mark a reminder as taken now
    Taken {
        /// Reminder id
        id: String,
    },
    /// Delete a reminder
    Delete {
        /// Reminder id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config);

    match cli.command {
        Commands::Add {
            record_type,
            date,
            description,
            notes,
            doctor,
            tag,
            measurement,
            attachment,
        } => {
            let record_type = parse_record_type(&record_type)?;
            let date = parse_date(&date)?;

            let mut record = Record::new(record_type, date);
            if let Some(d) = description {
                record = record.description(d);
            }
            if let Some(n) = notes {
                record = record.notes(n);
            }
            if let Some(d) = doctor {
                record = record.doctor(d);
            }
            for t in tag {
                record = record.tag(t);
            }
            for m in measurement {
                let (value, unit) = m
                    .split_once(':')
                    .with_context(|| format!("Measurement must be value:unit, got '{}'", m))?;
                let value: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid measurement value '{}'", value))?;
                record = record.measurement(value, unit);
            }
            for a in attachment {
                let (path, mime) = a
                    .split_once(':')
                    .with_context(|| format!("Attachment must be path:mime, got '{}'", a))?;
                record = record.attachment(path, mime);
            }

            let repository = open_repository(&config)?;
            let id = record.id;
            repository.add(&record).await?;
            println!("Added {} record {}", record.record_type, id);
        }

        Commands::List {
            record_type,
            tag,
            from,
            to,
            search,
        } => {
            let mut filter = RecordFilter::new();
            for t in record_type {
                filter = filter.with_type(parse_record_type(&t)?);
            }
            for t in tag {
                filter = filter.with_tag(t);
            }
            match (from, to) {
                (Some(from), Some(to)) => {
                    filter = filter.with_date_range(parse_date(&from)?, parse_date(&to)?);
                }
                (Some(from), None) => {
                    filter = filter.with_date_range(parse_date(&from)?, Utc::now().date_naive());
                }
                (None, Some(to)) => {
                    filter = filter.with_date_range(NaiveDate::MIN, parse_date(&to)?);
                }
                (None, None) => {}
            }
            if let Some(s) = search {
                filter = filter.with_text(s);
            }

            let repository = open_repository(&config)?;
            let records = repository.all().await?;
            let matched = filter.apply(&records);

            for record in &matched {
                let description = record.description.as_deref().unwrap_or("-");
                let tags = if record.tags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", record.tags.join(", "))
                };
                println!(
                    "{}  {}  {:<13} {}{}",
                    record.id,
                    record.date,
                    record.record_type.as_str(),
                    description,
                    tags
                );
            }
            println!("{} of {} records", matched.len(), records.len());
        }

        Commands::Show { id } => {
            let id = parse_id(&id)?;
            let repository = open_repository(&config)?;
            let record = repository
                .get(&id)
                .await?
                .with_context(|| format!("No record with id {}", id))?;

            println!("Id:          {}", record.id);
            println!("Type:        {}", record.record_type);
            println!("Date:        {}", record.date);
            if let Some(d) = &record.description {
                println!("Description: {}", d);
            }
            if let Some(d) = &record.doctor {
                println!("Doctor:      {}", d);
            }
            if let Some(n) = &record.notes {
                println!("Notes:       {}", n);
            }
            if !record.tags.is_empty() {
                println!("Tags:        {}", record.tags.join(", "));
            }
            for m in &record.measurements {
                println!("Measurement: {}", m);
            }
            for f in record.files() {
                println!("File:        {} ({})", f.path, f.mime_type);
            }
        }

        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            let repository = open_repository(&config)?;
            repository.delete(&id).await?;
            println!("Deleted record {}", id);
        }

        Commands::Tags => {
            let repository = open_repository(&config)?;
            for tag in repository.tag_names().await? {
                println!("{}", tag);
            }
        }

        Commands::Stats { metric } => {
            let metric = StatsMetric::parse(&metric).with_context(|| {
                format!(
                    "Unknown metric '{}'. Available: {}",
                    metric,
                    StatsMetric::all()
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })?;

            let repository = open_repository(&config)?;
            let records = repository.all().await?;
            let chart = metric.compute(&records);
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }

        Commands::Export { output } => {
            let repository = open_repository(&config)?;
            let records = repository.all().await?;
            let csv = vitalog::export::to_csv_string(&records)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Exported {} records to {:?}", records.len(), path);
                }
                None => print!("{}", csv),
            }
        }

        Commands::Sync => {
            if !config.sync.enabled || config.sync.url.is_empty() {
                bail!("Sync is not configured. Set [sync] in the config file or VITALOG_WEBDAV_URL.");
            }

            let client = WebDavClient::new(WebDavConfig {
                base_url: config.sync.url.clone(),
                remote_dir: config.sync.remote_dir.clone(),
                username: config.sync.username.clone(),
                password: config.sync.password.clone(),
                request_timeout_ms: config.sync.request_timeout_ms,
            })?;

            let repository = open_repository(&config)?;
            let manager = SyncManager::new(client, repository);
            let report = manager.sync().await;

            for line in report.status_lines() {
                println!("{}", line);
            }
            if report.success() {
                println!("Sync complete in {} ms", report.duration_ms);
            } else {
                bail!("Sync finished with errors");
            }
        }

        Commands::Pin { command } => {
            let vault = PinVault::open(&config.storage.vault_dir())?;
            match command {
                PinCommands::Set { pin } => {
                    vault.set_pin(&pin)?;
                    println!("PIN set");
                }
                PinCommands::Verify { pin } => {
                    if vault.verify_pin(&pin)? {
                        println!("PIN ok");
                    } else {
                        bail!("Wrong PIN");
                    }
                }
                PinCommands::Clear => {
                    vault.clear()?;
                    println!("PIN cleared");
                }
            }
        }

        Commands::Profile { command } => {
            let repository = open_repository(&config)?;
            match command {
                ProfileCommands::Show => {
                    let profile = repository.profile().await?;
                    println!("{}", vitalog::export::profile_to_json(&profile)?);
                }
                ProfileCommands::Set {
                    name,
                    born,
                    blood_type,
                    height_cm,
                    weight_kg,
                    notes,
                } => {
                    let mut profile = repository.profile().await?;
                    if name.is_some() {
                        profile.name = name;
                    }
                    if let Some(born) = born {
                        profile.date_of_birth = Some(parse_date(&born)?);
                    }
                    if blood_type.is_some() {
                        profile.blood_type = blood_type;
                    }
                    if height_cm.is_some() {
                        profile.height_cm = height_cm;
                    }
                    if weight_kg.is_some() {
                        profile.weight_kg = weight_kg;
                    }
                    if notes.is_some() {
                        profile.notes = notes;
                    }
                    repository.set_profile(&profile).await?;
                    println!("Profile updated");
                }
            }
        }

        Commands::Remind { command } => {
            let repository = open_repository(&config)?;
            match command {
                RemindCommands::Add {
                    medication,
                    dose,
                    every,
                } => {
                    if every <= 0 {
                        bail!("Interval must be a positive number of hours");
                    }
                    let now = Utc::now().timestamp_millis();
                    let reminder = Reminder::new(medication, dose, every, now);
                    let id = reminder.id;
                    repository
                        .with_store(|store| store.insert_reminder(&reminder))
                        .await?;
                    println!("Added reminder {}", id);
                }
                RemindCommands::Due => {
                    let reminders = repository.with_store(|store| store.all_reminders()).await?;
                    let now = Utc::now().timestamp_millis();
                    for reminder in due_reminders(&reminders, now) {
                        println!(
                            "{}  {} {} (every {} h)",
                            reminder.id, reminder.medication, reminder.dose, reminder.interval_hours
                        );
                    }
                }
                RemindCommands::List => {
                    let reminders = repository.with_store(|store| store.all_reminders()).await?;
                    for reminder in &reminders {
                        println!(
                            "{}  {} {} (every {} h, next due {})",
                            reminder.id,
                            reminder.medication,
                            reminder.dose,
                            reminder.interval_hours,
                            reminder.next_due()
                        );
                    }
                }
                RemindCommands::Taken { id } => {
                    let id = parse_id(&id)?;
                    let now = Utc::now().timestamp_millis();
                    repository
                        .with_store(move |store| store.mark_reminder_taken(&id, now))
                        .await?;
                    println!("Marked {} as taken", id);
                }
                RemindCommands::Delete { id } => {
                    let id = parse_id(&id)?;
                    repository
                        .with_store(move |store| store.delete_reminder(&id))
                        .await?;
                    println!("Deleted reminder {}", id);
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, &content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vitalog={}", config.logging.level)),
    );

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_repository(config: &Config) -> anyhow::Result<Repository> {
    let path = config.storage.database_path();
    tracing::debug!(path = %path.display(), "Opening record store");
    let store = RecordStore::open(&path)?;
    Ok(Repository::new(store)?)
}

fn parse_record_type(s: &str) -> anyhow::Result<RecordType> {
    RecordType::parse(s).with_context(|| {
        format!(
            "Unknown record type '{}'. Available: {}",
            s,
            RecordType::all()
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

fn parse_id(s: &str) -> anyhow::Result<uuid::Uuid> {
    s.parse()
        .with_context(|| format!("Invalid record id '{}'", s))
}

/// Parse a date argument. Supports "today"/"now", relative offsets of the
/// form "today-30d" / "now-4w", and plain ISO dates.
fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    if s == "today" || s == "now" {
        return Ok(Utc::now().date_naive());
    }

    let relative = regex::Regex::new(r"^(?:today|now)-(\d+)([dwm])$").unwrap();
    if let Some(caps) = relative.captures(s) {
        let amount: i64 = caps[1].parse()?;
        let delta = match &caps[2] {
            "d" => Duration::days(amount),
            "w" => Duration::weeks(amount),
            _ => Duration::days(amount * 30),
        };
        return Ok(Utc::now().date_naive() - delta);
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD or today-Nd)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_today() {
        assert_eq!(parse_date("today").unwrap(), Utc::now().date_naive());
    }

    #[test]
    fn test_parse_date_relative() {
        let expected = Utc::now().date_naive() - Duration::days(30);
        assert_eq!(parse_date("today-30d").unwrap(), expected);

        let expected = Utc::now().date_naive() - Duration::weeks(2);
        assert_eq!(parse_date("today-2w").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(
            parse_date("2024-03-12").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("today-xd").is_err());
    }

    #[test]
    fn test_parse_record_type_error_lists_options() {
        let err = parse_record_type("nope").unwrap_err().to_string();
        assert!(err.contains("consultation"));
    }
}
