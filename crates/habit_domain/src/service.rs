use std::path::Path;

use chrono::{Local, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    error::{HabitError, Result},
    habit::{Habit, HabitDraft, HabitPatch},
    notifications::{DailyTrigger, NotificationBackend, ReminderNotifier},
    reminder::{self, ReminderDecision},
    report::{self, CalendarDay, HabitStats, OverviewRow, Report},
    repository::{self, Outcome},
    storage::{FileKeyValueStore, HabitStore, KeyValueStore, MemoryKeyValueStore},
};

/// Everything the detail screen shows for one habit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitDetail {
    pub habit: Habit,
    pub stats: HabitStats,
    pub calendar: Vec<CalendarDay>,
}

/// Owner of the in-memory habit list. Each mutation runs a repository
/// transform, persists the result and, for completion toggles, re-applies the
/// reminder policy.
pub struct HabitService {
    store: HabitStore,
    notifier: ReminderNotifier,
    habits: RwLock<Vec<Habit>>,
}

pub struct HabitServiceBuilder {
    kv: Option<Box<dyn KeyValueStore>>,
    storage_key: Option<String>,
    backend: Option<Box<dyn NotificationBackend>>,
    trigger: DailyTrigger,
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            kv: None,
            storage_key: None,
            backend: None,
            trigger: DailyTrigger::default(),
        }
    }

    pub fn storage_dir(self, path: impl AsRef<Path>) -> Self {
        self.with_key_value_store(Box::new(FileKeyValueStore::new(path)))
    }

    pub fn with_key_value_store(mut self, kv: Box<dyn KeyValueStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn with_notification_backend(mut self, backend: Box<dyn NotificationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn reminder_trigger(mut self, trigger: DailyTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn build(self) -> HabitService {
        let kv = self
            .kv
            .unwrap_or_else(|| Box::new(MemoryKeyValueStore::new()));
        let store = match self.storage_key {
            Some(key) => HabitStore::with_key(kv, key),
            None => HabitStore::new(kv),
        };
        let notifier = match self.backend {
            Some(backend) => ReminderNotifier::new(backend, self.trigger),
            None => ReminderNotifier::degraded(self.trigger),
        };
        let habits = store.load();
        info!(count = habits.len(), key = %store.key(), "habit service ready");
        HabitService {
            store,
            notifier,
            habits: RwLock::new(habits),
        }
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn notifier(&self) -> &ReminderNotifier {
        &self.notifier
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.habits.read().clone()
    }

    pub fn get(&self, id: &str) -> Result<Habit> {
        repository::find(&self.habits.read(), id)
            .cloned()
            .ok_or_else(|| HabitError::not_found(id))
    }

    /// Drops the in-memory list and re-reads it from storage.
    pub fn reload(&self) {
        *self.habits.write() = self.store.load();
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn add(&self, draft: HabitDraft) -> Result<Habit> {
        let mut habits = self.habits.write();
        let next = repository::create(&habits, draft, Utc::now())?;
        let Some(created) = next.last().cloned() else {
            return Err(HabitError::Validation("habit was not created".into()));
        };
        self.store.save(&next);
        *habits = next;
        info!(habit_id = %created.id, "habit created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub fn update(&self, id: &str, patch: HabitPatch) -> Result<Habit> {
        let mut habits = self.habits.write();
        let next = Self::applied(repository::update(&habits, id, patch)?, id)?;
        self.store.save(&next);
        *habits = next;
        info!(habit_id = %id, "habit updated");
        repository::find(&habits, id)
            .cloned()
            .ok_or_else(|| HabitError::not_found(id))
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut habits = self.habits.write();
        let next = Self::applied(repository::remove(&habits, id), id)?;
        self.store.save(&next);
        *habits = next;
        info!(habit_id = %id, "habit removed");
        Ok(())
    }

    /// Flips completion of `id` on `date`, persists, then keeps or drops
    /// tonight's reminder depending on what is still open on `today`. Returns
    /// whether the habit is now completed on `date`.
    #[instrument(skip(self))]
    pub fn toggle_completion(
        &self,
        id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool> {
        let (completed, decision) = {
            let mut habits = self.habits.write();
            let next = Self::applied(repository::toggle_completion(&habits, id, date), id)?;
            let completed =
                repository::find(&next, id).is_some_and(|habit| habit.is_completed_on(date));
            self.store.save(&next);
            *habits = next;
            (completed, reminder::decide_reminder(&habits, today))
        };
        info!(habit_id = %id, %date, completed, ?decision, "completion toggled");
        self.notifier.apply(decision);
        Ok(completed)
    }

    pub fn toggle_today(&self, id: &str) -> Result<bool> {
        let today = today();
        self.toggle_completion(id, today, today)
    }

    /// Re-applies the reminder policy without changing any habit.
    pub fn refresh_reminder(&self, today: NaiveDate) -> ReminderDecision {
        let decision = reminder::decide_reminder(&self.habits.read(), today);
        self.notifier.apply(decision);
        decision
    }

    pub fn report(&self, today: NaiveDate) -> Report {
        report::compute_report(&self.habits.read(), today)
    }

    pub fn overview(&self, today: NaiveDate) -> Vec<OverviewRow> {
        report::today_overview(&self.habits.read(), today)
    }

    pub fn detail(&self, id: &str, today: NaiveDate) -> Result<HabitDetail> {
        let habit = self.get(id)?;
        Ok(HabitDetail {
            stats: report::habit_stats(&habit),
            calendar: report::calendar_history(&habit, today),
            habit,
        })
    }

    fn applied(outcome: Outcome<Vec<Habit>>, id: &str) -> Result<Vec<Habit>> {
        outcome.applied().ok_or_else(|| {
            info!(habit_id = %id, "no habit matched, nothing changed");
            HabitError::not_found(id)
        })
    }
}

/// Current calendar day in the device's zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
