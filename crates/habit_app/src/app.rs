use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use habit_domain::{
    habit::{Habit, HabitDraft, HabitPatch},
    notifications::{DailyTrigger, LocalNotice, LocalReminderScheduler},
    report::{OverviewRow, Report},
    service::{self, HabitDetail},
    storage::HABITS_KEY,
    HabitService,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

const DATA_DIR_ENV: &str = "HABIT_DATA_DIR";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) storage_key: String,
    pub(crate) reminder: DailyTrigger,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            let dir = dir.trim();
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("habit-tracker");
        Self {
            data_dir,
            storage_key: HABITS_KEY.to_string(),
            reminder: DailyTrigger::default(),
        }
    }
}

/// Home screen payload.
#[derive(Debug, Clone, Serialize)]
pub struct HomeSnapshot {
    pub date: NaiveDate,
    pub rows: Vec<OverviewRow>,
    pub notice: Option<LocalNotice>,
}

/// Screen-level facade the host UI calls into. Owns the habit service and
/// the in-process reminder scheduler.
pub struct HabitAppController {
    service: HabitService,
    scheduler: Arc<LocalReminderScheduler>,
    config: AppConfig,
}

impl HabitAppController {
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_scheduler(config, Arc::new(LocalReminderScheduler::new()))
    }

    pub fn with_scheduler(
        config: AppConfig,
        scheduler: Arc<LocalReminderScheduler>,
    ) -> Result<Self> {
        info!(data_dir = %config.data_dir.display(), "initializing controller");
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "failed to prepare data directory {}",
                config.data_dir.display()
            )
        })?;
        let service = HabitService::builder()
            .storage_dir(&config.data_dir)
            .storage_key(config.storage_key.clone())
            .with_notification_backend(Box::new(scheduler.clone()))
            .reminder_trigger(config.reminder)
            .build();
        if !service.notifier().request_permission() {
            warn!("notification permission not granted, reminders degrade to local notices");
        }
        Ok(Self {
            service,
            scheduler,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn service(&self) -> &HabitService {
        &self.service
    }

    /// Whether the evening reminder is currently pending.
    pub fn reminder_pending(&self) -> bool {
        self.scheduler
            .pending(&self.service.notifier().request().identifier)
            .is_some()
    }

    /// Home payload. The pending local notice is handed over once and then
    /// cleared.
    pub fn home(&self, today: NaiveDate) -> HomeSnapshot {
        HomeSnapshot {
            date: today,
            rows: self.service.overview(today),
            notice: self.service.notifier().take_notice(),
        }
    }

    pub fn toggle(&self, id: &str, today: NaiveDate) -> Result<HomeSnapshot> {
        let start = Instant::now();
        self.service
            .toggle_completion(id, today, today)
            .with_context(|| format!("failed to toggle habit {id}"))?;
        debug!(elapsed_ms = %start.elapsed().as_millis(), "toggle handled");
        Ok(self.home(today))
    }

    pub fn add(&self, draft: HabitDraft) -> Result<Habit> {
        self.service.add(draft).context("failed to create habit")
    }

    pub fn edit(&self, id: &str, patch: HabitPatch) -> Result<Habit> {
        self.service
            .update(id, patch)
            .with_context(|| format!("failed to update habit {id}"))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.service
            .remove(id)
            .with_context(|| format!("failed to delete habit {id}"))
    }

    pub fn detail(&self, id: &str, today: NaiveDate) -> Result<HabitDetail> {
        self.service
            .detail(id, today)
            .with_context(|| format!("habit not loaded: {id}"))
    }

    pub fn report(&self, today: NaiveDate) -> Report {
        self.service.report(today)
    }

    pub fn snapshot_json(&self, today: NaiveDate) -> serde_json::Value {
        let home = HomeSnapshot {
            date: today,
            rows: self.service.overview(today),
            notice: self.service.notifier().last_notice(),
        };
        json!({
            "home": home,
            "report": self.report(today),
            "reminderPending": self.reminder_pending(),
        })
    }
}

/// Boots the controller, re-evaluates today's reminder and logs a summary.
pub fn run(config: AppConfig) -> Result<()> {
    let start = Instant::now();
    let controller = HabitAppController::new(config)?;
    let today = service::today();
    let decision = controller.service().refresh_reminder(today);

    let home = controller.home(today);
    for row in &home.rows {
        info!(
            habit_id = %row.id,
            title = %row.title,
            done = row.completed_today,
            streak = row.streak,
            "habit"
        );
    }
    let report = controller.report(today);
    info!(
        total = report.total_habits,
        completion_rate = report.completion_rate,
        best = report.best_habit.as_deref().unwrap_or("-"),
        ?decision,
        elapsed_ms = %start.elapsed().as_millis(),
        "today's summary"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn controller_round_trips_through_data_dir() {
        let temp = tempdir().unwrap();
        let config = AppConfig::default().with_data_dir(temp.path().join("nested"));
        let controller = HabitAppController::new(config.clone()).unwrap();

        let habit = controller.add(HabitDraft::new("Meditate")).unwrap();
        let home = controller.toggle(&habit.id, day()).unwrap();
        assert!(home.rows[0].completed_today);
        assert!(!controller.reminder_pending());
        assert!(home.notice.is_none());

        let snapshot = controller.snapshot_json(day());
        assert_eq!(snapshot["report"]["completionRate"], 100);
        assert_eq!(snapshot["home"]["rows"][0]["title"], "Meditate");

        let reopened = HabitAppController::new(config).unwrap();
        assert_eq!(reopened.service().habits().len(), 1);
        reopened.toggle(&habit.id, day()).unwrap();
        assert!(reopened.reminder_pending());
    }

    #[test]
    fn errors_carry_context() {
        let temp = tempdir().unwrap();
        let controller =
            HabitAppController::new(AppConfig::default().with_data_dir(temp.path())).unwrap();
        let err = controller.delete("missing").unwrap_err();
        assert!(err.to_string().contains("failed to delete habit missing"));
        assert!(controller.add(HabitDraft::new("")).is_err());
    }

    #[test]
    fn snapshot_leaves_pending_notice_for_the_home_screen() {
        let temp = tempdir().unwrap();
        let controller = HabitAppController::with_scheduler(
            AppConfig::default().with_data_dir(temp.path()),
            Arc::new(LocalReminderScheduler::denied()),
        )
        .unwrap();
        let habit = controller.add(HabitDraft::new("Journal")).unwrap();
        controller
            .service()
            .toggle_completion(&habit.id, day(), day())
            .unwrap();

        for _ in 0..2 {
            let snapshot = controller.snapshot_json(day());
            assert_eq!(snapshot["home"]["notice"]["kind"], "Cancelled");
        }
        assert!(controller.home(day()).notice.is_some());
        assert!(controller.home(day()).notice.is_none());
    }

    #[test]
    fn from_env_reads_data_dir_override() {
        std::env::set_var(DATA_DIR_ENV, "  /tmp/habit-override  ");
        let overridden = AppConfig::from_env().unwrap();
        std::env::set_var(DATA_DIR_ENV, "   ");
        let blank = AppConfig::from_env().unwrap();
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(overridden.data_dir(), &PathBuf::from("/tmp/habit-override"));
        assert_eq!(blank.data_dir(), AppConfig::default().data_dir());
    }
}
