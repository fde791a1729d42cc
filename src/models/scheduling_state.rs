//! Scheduling fields of a card, as read and written by the SM-2 scheduler.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CardId = i64;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardSchedulingState {
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub interval_days: u32,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
}

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

impl Default for CardSchedulingState {
    fn default() -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            repetitions: 0,
            interval_days: 0,
            due_date: None,
            last_reviewed: None,
        }
    }
}

impl CardSchedulingState {
    /// A card is due when it was never reviewed or its due date has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_none_or(|due| due <= now)
    }
}

/// A state together with the store version it was read at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}
