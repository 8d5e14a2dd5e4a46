//! Medication reminders - schedule computation
//!
//! A reminder fires every `interval_hours` counted from the last taken
//! dose, or from its start time if no dose was recorded yet. Delivery
//! (notifications) is out of scope; this module only answers "what is due
//! when".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const HOUR_MS: i64 = 3600 * 1000;

/// A recurring medication reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub medication: String,
    /// Free-text dose ("500 mg", "2 drops")
    pub dose: String,
    pub interval_hours: i64,
    /// Schedule anchor, millis since epoch
    pub start_at: i64,
    /// When the last dose was recorded, millis since epoch
    #[serde(default)]
    pub last_taken_at: Option<i64>,
}

impl Reminder {
    pub fn new(
        medication: impl Into<String>,
        dose: impl Into<String>,
        interval_hours: i64,
        start_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            medication: medication.into(),
            dose: dose.into(),
            interval_hours,
            start_at,
            last_taken_at: None,
        }
    }

    /// When the next dose is due (millis since epoch); an interval too
    /// large to represent saturates instead of wrapping
    pub fn next_due(&self) -> i64 {
        match self.last_taken_at {
            Some(taken) => taken.saturating_add(self.interval_hours.saturating_mul(HOUR_MS)),
            None => self.start_at,
        }
    }

    /// Whether a dose is due at `now`
    pub fn is_due(&self, now: i64) -> bool {
        self.next_due() <= now
    }
}

/// The reminders due at `now`, soonest first
pub fn due_reminders(reminders: &[Reminder], now: i64) -> Vec<&Reminder> {
    let mut due: Vec<&Reminder> = reminders.iter().filter(|r| r.is_due(now)).collect();
    due.sort_by_key(|r| r.next_due());
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_due_before_first_dose() {
        let reminder = Reminder::new("Metformin", "500 mg", 12, 1_000_000);
        assert_eq!(reminder.next_due(), 1_000_000);
        assert!(reminder.is_due(1_000_000));
        assert!(!reminder.is_due(999_999));
    }

    #[test]
    fn test_next_due_counts_from_last_taken() {
        let mut reminder = Reminder::new("Metformin", "500 mg", 12, 1_000_000);
        reminder.last_taken_at = Some(2_000_000);
        assert_eq!(reminder.next_due(), 2_000_000 + 12 * HOUR_MS);
        assert!(!reminder.is_due(2_000_000 + HOUR_MS));
        assert!(reminder.is_due(2_000_000 + 12 * HOUR_MS));
    }

    #[test]
    fn test_next_due_saturates_on_huge_interval() {
        let mut reminder = Reminder::new("Metformin", "500 mg", i64::MAX, 0);
        reminder.last_taken_at = Some(1);
        assert_eq!(reminder.next_due(), i64::MAX);
        assert!(!reminder.is_due(i64::MAX - 1));
    }

    #[test]
    fn test_due_reminders_sorted_soonest_first() {
        let mut soon = Reminder::new("A", "1", 6, 0);
        soon.last_taken_at = Some(0);
        let mut later = Reminder::new("B", "1", 12, 0);
        later.last_taken_at = Some(0);
        let not_due = Reminder::new("C", "1", 6, i64::MAX);

        let reminders = vec![later.clone(), not_due, soon.clone()];
        let now = 24 * HOUR_MS;
        let due = due_reminders(&reminders, now);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].medication, "A");
        assert_eq!(due[1].medication, "B");
    }
}
