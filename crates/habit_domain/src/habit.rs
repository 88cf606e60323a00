use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HabitError, Result};

pub const ICONS: [&str; 8] = [
    "fitness",
    "book",
    "cafe",
    "code-slash",
    "bed",
    "water",
    "bicycle",
    "musical-notes",
];

pub const COLORS: [&str; 8] = [
    "#4B0082", "#FF3B30", "#FF9500", "#4CD964", "#5AC8FA", "#007AFF", "#5856D6", "#FF2D55",
];

pub const DEFAULT_ICON: &str = "fitness";
pub const DEFAULT_COLOR: &str = "#4B0082";
pub const DEFAULT_REMINDER_TIME: &str = "07:00";
pub const DEFAULT_REMINDER_MESSAGE: &str = "Cố lên!";

/// A user-defined recurring task, tracked by the calendar days it was done on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub frequency: HabitFrequency,
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,
    #[serde(default = "default_reminder_message")]
    pub reminder_message: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub streak: Streak,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
}

/// `current` counts every completion ever recorded, not a run of consecutive
/// days. `longest` is carried for the stored layout and never written.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}

impl Habit {
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completed_dates.contains(&date)
    }

    /// Flips membership of `date` in the completion set and returns whether the
    /// habit is completed on that day afterwards.
    pub fn toggle_completion(&mut self, date: NaiveDate) -> bool {
        let completed = if self.completed_dates.remove(&date) {
            false
        } else {
            self.completed_dates.insert(date)
        };
        self.streak.current = self.completion_count();
        completed
    }

    pub fn completion_count(&self) -> u32 {
        u32::try_from(self.completed_dates.len()).unwrap_or(u32::MAX)
    }

    /// Calendar day the habit was created on, in the device's zone.
    pub fn start_day(&self) -> NaiveDate {
        self.start_date.with_timezone(&Local).date_naive()
    }
}

/// Input of the add flow. Unset presentation fields fall back to the catalog
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitDraft {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub frequency: Option<HabitFrequency>,
    pub reminder_time: Option<String>,
    pub reminder_message: Option<String>,
}

impl HabitDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_habit(self, id: String, now: DateTime<Utc>) -> Result<Habit> {
        let title = validate_title(&self.title)?;
        Ok(Habit {
            id,
            title,
            description: self.description.unwrap_or_default(),
            icon: non_blank_or(self.icon, DEFAULT_ICON),
            color: non_blank_or(self.color, DEFAULT_COLOR),
            frequency: self.frequency.unwrap_or_default(),
            reminder_time: non_blank_or(self.reminder_time, DEFAULT_REMINDER_TIME),
            reminder_message: non_blank_or(self.reminder_message, DEFAULT_REMINDER_MESSAGE),
            start_date: now,
            completed_dates: BTreeSet::new(),
            streak: Streak::default(),
        })
    }
}

/// The fields the edit screen may replace. Identity, start date and the
/// completion history are never touched by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitPatch {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub frequency: HabitFrequency,
    pub reminder_time: String,
}

impl From<&Habit> for HabitPatch {
    fn from(habit: &Habit) -> Self {
        Self {
            title: habit.title.clone(),
            description: habit.description.clone(),
            icon: habit.icon.clone(),
            color: habit.color.clone(),
            frequency: habit.frequency,
            reminder_time: habit.reminder_time.clone(),
        }
    }
}

impl HabitPatch {
    /// Trims the title, rejecting it when nothing is left.
    pub(crate) fn validated(mut self) -> Result<Self> {
        self.title = validate_title(&self.title)?;
        Ok(self)
    }

    pub(crate) fn apply_to(self, habit: &mut Habit) {
        habit.title = self.title;
        habit.description = self.description;
        habit.icon = self.icon;
        habit.color = self.color;
        habit.frequency = self.frequency;
        habit.reminder_time = self.reminder_time;
    }
}

pub fn is_known_icon(icon: &str) -> bool {
    ICONS.contains(&icon)
}

pub fn is_known_color(color: &str) -> bool {
    COLORS.iter().any(|known| known.eq_ignore_ascii_case(color))
}

/// Time-based id: Unix milliseconds of `now`, bumped past any id already taken.
pub fn generate_id(existing: &[Habit], now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !existing.iter().any(|habit| habit.id == id) {
            return id;
        }
        candidate += 1;
    }
}

fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(HabitError::Validation("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_reminder_time() -> String {
    DEFAULT_REMINDER_TIME.to_string()
}

fn default_reminder_message() -> String {
    DEFAULT_REMINDER_MESSAGE.to_string()
}
