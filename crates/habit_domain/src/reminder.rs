use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::habit::Habit;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReminderDecision {
    Schedule,
    Cancel,
}

/// Keep the evening reminder while any habit is still open for `today`.
/// An empty list has nothing open, so the reminder is cancelled.
pub fn decide_reminder(habits: &[Habit], today: NaiveDate) -> ReminderDecision {
    if habits.iter().any(|habit| !habit.is_completed_on(today)) {
        ReminderDecision::Schedule
    } else {
        ReminderDecision::Cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;
    use crate::repository;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn two_habits() -> Vec<Habit> {
        let now = Utc.with_ymd_and_hms(2023, 12, 1, 8, 0, 0).unwrap();
        let list = repository::create(&[], HabitDraft::new("A"), now).unwrap();
        let list = repository::create(&list, HabitDraft::new("B"), now).unwrap();
        let a = list[0].id.clone();
        repository::toggle_completion(&list, &a, today())
            .applied()
            .unwrap()
    }

    #[test]
    fn empty_list_cancels() {
        assert_eq!(decide_reminder(&[], today()), ReminderDecision::Cancel);
    }

    #[test]
    fn incomplete_habit_schedules_until_all_done() {
        let list = two_habits();
        assert_eq!(decide_reminder(&list, today()), ReminderDecision::Schedule);

        let b = list[1].id.clone();
        let list = repository::toggle_completion(&list, &b, today())
            .applied()
            .unwrap();
        assert_eq!(decide_reminder(&list, today()), ReminderDecision::Cancel);

        let tomorrow = today().succ_opt().unwrap();
        assert_eq!(decide_reminder(&list, tomorrow), ReminderDecision::Schedule);
    }
}
