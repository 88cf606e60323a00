//! Pure transforms over the habit list. Callers own persisting the result.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::habit::{generate_id, Habit, HabitDraft, HabitPatch};

/// Result of an operation addressed at a single habit by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    NotFound,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::NotFound => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.applied().unwrap_or(fallback)
    }
}

pub fn create(list: &[Habit], draft: HabitDraft, now: DateTime<Utc>) -> Result<Vec<Habit>> {
    let habit = draft.into_habit(generate_id(list, now), now)?;
    let mut next = list.to_vec();
    next.push(habit);
    Ok(next)
}

/// Replaces the editable fields of the habit `id`. A blank title is rejected
/// even when no habit matches.
pub fn update(list: &[Habit], id: &str, patch: HabitPatch) -> Result<Outcome<Vec<Habit>>> {
    let patch = patch.validated()?;
    let Some(index) = position(list, id) else {
        return Ok(Outcome::NotFound);
    };
    let mut next = list.to_vec();
    patch.apply_to(&mut next[index]);
    Ok(Outcome::Applied(next))
}

pub fn remove(list: &[Habit], id: &str) -> Outcome<Vec<Habit>> {
    if position(list, id).is_none() {
        return Outcome::NotFound;
    }
    Outcome::Applied(list.iter().filter(|h| h.id != id).cloned().collect())
}

pub fn toggle_completion(list: &[Habit], id: &str, date: NaiveDate) -> Outcome<Vec<Habit>> {
    let Some(index) = position(list, id) else {
        return Outcome::NotFound;
    };
    let mut next = list.to_vec();
    next[index].toggle_completion(date);
    Outcome::Applied(next)
}

pub fn find<'a>(list: &'a [Habit], id: &str) -> Option<&'a Habit> {
    list.iter().find(|habit| habit.id == id)
}

fn position(list: &[Habit], id: &str) -> Option<usize> {
    list.iter().position(|habit| habit.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HabitError;
    use crate::habit::HabitFrequency;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample() -> Vec<Habit> {
        let list = create(&[], HabitDraft::new("A"), now()).unwrap();
        create(&list, HabitDraft::new("B"), now()).unwrap()
    }

    #[test]
    fn create_appends_fresh_record() {
        let list = create(&[], HabitDraft::new("Read"), now()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Read");
        assert!(list[0].completed_dates.is_empty());
        assert_eq!(list[0].streak.current, 0);
        assert_eq!(list[0].start_date, now());
    }

    #[test]
    fn create_rejects_blank_title() {
        let err = create(&[], HabitDraft::new("  "), now()).unwrap_err();
        assert!(matches!(err, HabitError::Validation(_)));
    }

    #[test]
    fn ids_stay_unique_when_created_in_the_same_millisecond() {
        let list = sample();
        assert_ne!(list[0].id, list[1].id);
    }

    #[test]
    fn update_replaces_editable_fields_only() {
        let mut list = sample();
        list[0].toggle_completion(day(1));
        let id = list[0].id.clone();
        let mut patch = HabitPatch::from(&list[0]);
        patch.title = "Read more".into();
        patch.frequency = HabitFrequency::Weekly;
        patch.icon = "book".into();

        let next = update(&list, &id, patch).unwrap().applied().unwrap();
        let habit = find(&next, &id).unwrap();
        assert_eq!(habit.title, "Read more");
        assert_eq!(habit.frequency, HabitFrequency::Weekly);
        assert_eq!(habit.icon, "book");
        assert_eq!(habit.start_date, list[0].start_date);
        assert_eq!(habit.completed_dates, list[0].completed_dates);
        assert_eq!(habit.streak, list[0].streak);
        assert_eq!(next[1], list[1]);
    }

    #[test]
    fn update_reports_missing_id_and_blank_title() {
        let list = sample();
        let patch = HabitPatch::from(&list[0]);
        assert_eq!(
            update(&list, "missing", patch.clone()).unwrap(),
            Outcome::NotFound
        );

        let mut blank = patch;
        blank.title = "   ".into();
        assert!(matches!(
            update(&list, &list[0].id, blank),
            Err(HabitError::Validation(_))
        ));
    }

    #[test]
    fn remove_filters_matching_record() {
        let list = sample();
        let next = remove(&list, &list[0].id).applied().unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].title, "B");
        assert_eq!(remove(&list, "missing"), Outcome::NotFound);
    }

    #[test]
    fn toggle_twice_restores_the_list() {
        let list = sample();
        let id = list[1].id.clone();
        let once = toggle_completion(&list, &id, day(3)).applied().unwrap();
        assert!(once[1].is_completed_on(day(3)));
        assert_eq!(once[1].streak.current, 1);
        let twice = toggle_completion(&once, &id, day(3)).applied().unwrap();
        assert_eq!(twice, list);
    }

    #[test]
    fn streak_counts_all_completions() {
        let list = sample();
        let id = list[0].id.clone();
        let mut current = list;
        for d in [1, 5, 9] {
            current = toggle_completion(&current, &id, day(d)).unwrap_or(current.clone());
        }
        assert_eq!(current[0].streak.current, 3);
        assert_eq!(
            toggle_completion(&current, "missing", day(1)),
            Outcome::NotFound
        );
    }
}
