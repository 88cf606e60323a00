use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::Habit;

pub const WEEK_DAYS: usize = 7;

/// Aggregates shown on the report screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total_habits: usize,
    pub perfect_streak: u32,
    pub best_habit: Option<String>,
    /// Completions per day, oldest first, ending with `today`.
    pub weekly_data: [u32; WEEK_DAYS],
    pub completion_rate: u32,
}

pub fn compute_report(habits: &[Habit], today: NaiveDate) -> Report {
    let mut perfect_streak = 0;
    let mut best_habit = None;
    for habit in habits {
        // Strictly greater: the first habit reaching the maximum keeps the title.
        if habit.streak.current > perfect_streak {
            perfect_streak = habit.streak.current;
            best_habit = Some(habit.title.clone());
        }
    }

    let mut weekly_data = [0; WEEK_DAYS];
    for (slot, value) in weekly_data.iter_mut().enumerate() {
        let offset = (WEEK_DAYS - 1 - slot) as i64;
        *value = completed_on(habits, today - Duration::days(offset));
    }

    Report {
        total_habits: habits.len(),
        perfect_streak,
        best_habit,
        weekly_data,
        completion_rate: completion_rate(habits, today),
    }
}

/// Percentage of habits done on `day`, rounded to the nearest integer.
pub fn completion_rate(habits: &[Habit], day: NaiveDate) -> u32 {
    if habits.is_empty() {
        return 0;
    }
    let done = completed_on(habits, day) as f64;
    (100.0 * done / habits.len() as f64).round() as u32
}

fn completed_on(habits: &[Habit], day: NaiveDate) -> u32 {
    habits.iter().filter(|h| h.is_completed_on(day)).count() as u32
}

/// Header numbers of the detail screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
}

pub fn habit_stats(habit: &Habit) -> HabitStats {
    HabitStats {
        current_streak: habit.streak.current,
        longest_streak: habit.streak.longest,
        total_completions: habit.completion_count(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayMark {
    Completed,
    Missed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub mark: DayMark,
}

/// Every day from the habit's start day through `today`, marked done or missed.
pub fn calendar_history(habit: &Habit, today: NaiveDate) -> Vec<CalendarDay> {
    habit
        .start_day()
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| CalendarDay {
            date,
            mark: if habit.is_completed_on(date) {
                DayMark::Completed
            } else {
                DayMark::Missed
            },
        })
        .collect()
}

/// One row of the home list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRow {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub completed_today: bool,
    pub streak: u32,
}

pub fn today_overview(habits: &[Habit], today: NaiveDate) -> Vec<OverviewRow> {
    habits
        .iter()
        .map(|habit| OverviewRow {
            id: habit.id.clone(),
            title: habit.title.clone(),
            icon: habit.icon.clone(),
            color: habit.color.clone(),
            completed_today: habit.is_completed_on(today),
            streak: habit.streak.current,
        })
        .collect()
}
