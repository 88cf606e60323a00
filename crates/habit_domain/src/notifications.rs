use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HabitError, Result};
use crate::reminder::ReminderDecision;

/// Identifier of the single app-wide evening reminder.
pub const SMART_REMINDER_ID: &str = "smart-reminder-8pm";
pub const REMINDER_TITLE: &str = "Đừng quên thói quen! 🌙";
pub const REMINDER_BODY: &str = "Bạn vẫn còn thói quen chưa hoàn thành.";

/// Repeating local trigger at a fixed wall-clock time. Always holds a valid
/// hour and minute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawTrigger")]
pub struct DailyTrigger {
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct RawTrigger {
    hour: u32,
    minute: u32,
}

impl TryFrom<RawTrigger> for DailyTrigger {
    type Error = HabitError;

    fn try_from(raw: RawTrigger) -> Result<Self> {
        Self::new(raw.hour, raw.minute).ok_or_else(|| {
            HabitError::Validation(format!(
                "invalid reminder time {:02}:{:02}",
                raw.hour, raw.minute
            ))
        })
    }
}

impl Default for DailyTrigger {
    fn default() -> Self {
        Self {
            hour: 20,
            minute: 0,
        }
    }
}

impl DailyTrigger {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0)?;
        Some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }

    /// First firing strictly after `now`, in the same local clock.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time());
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub trigger: DailyTrigger,
}

impl ReminderRequest {
    pub fn smart_reminder(trigger: DailyTrigger) -> Self {
        Self {
            identifier: SMART_REMINDER_ID.to_string(),
            title: REMINDER_TITLE.to_string(),
            body: REMINDER_BODY.to_string(),
            trigger,
        }
    }
}

/// Platform scheduler seam. Implementations talk to the OS notification
/// centre; errors are absorbed by [`ReminderNotifier`].
pub trait NotificationBackend: Send + Sync {
    fn request_permission(&self) -> Result<bool>;
    fn schedule(&self, request: &ReminderRequest) -> Result<()>;
    fn cancel(&self, identifier: &str) -> Result<()>;
}

impl<T: NotificationBackend + ?Sized> NotificationBackend for Arc<T> {
    fn request_permission(&self) -> Result<bool> {
        (**self).request_permission()
    }

    fn schedule(&self, request: &ReminderRequest) -> Result<()> {
        (**self).schedule(request)
    }

    fn cancel(&self, identifier: &str) -> Result<()> {
        (**self).cancel(identifier)
    }
}

/// In-process scheduler keeping at most one pending request per identifier.
pub struct LocalReminderScheduler {
    granted: bool,
    pending: Mutex<HashMap<String, ReminderRequest>>,
}

impl Default for LocalReminderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalReminderScheduler {
    pub fn new() -> Self {
        Self {
            granted: true,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// A scheduler whose permission prompt is always refused.
    pub fn denied() -> Self {
        Self {
            granted: false,
            ..Self::new()
        }
    }

    pub fn pending(&self, identifier: &str) -> Option<ReminderRequest> {
        self.pending.lock().get(identifier).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl NotificationBackend for LocalReminderScheduler {
    fn request_permission(&self) -> Result<bool> {
        Ok(self.granted)
    }

    fn schedule(&self, request: &ReminderRequest) -> Result<()> {
        if !self.granted {
            return Err(HabitError::NotificationUnavailable(
                "permission denied".into(),
            ));
        }
        self.pending
            .lock()
            .insert(request.identifier.clone(), request.clone());
        Ok(())
    }

    fn cancel(&self, identifier: &str) -> Result<()> {
        self.pending.lock().remove(identifier);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoticeKind {
    Scheduled,
    Cancelled,
}

/// On-screen stand-in for an OS alert when notifications are unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalNotice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl LocalNotice {
    fn scheduled(trigger: DailyTrigger) -> Self {
        Self {
            kind: NoticeKind::Scheduled,
            title: "⏰ Đã Lên Lịch Nhắc Nhở (Mô phỏng)".to_string(),
            body: format!(
                "Hệ thống sẽ nhắc bạn vào lúc {:02}:{:02} tối nay nếu chưa hoàn thành nhiệm vụ.",
                trigger.hour, trigger.minute
            ),
        }
    }

    fn cancelled() -> Self {
        Self {
            kind: NoticeKind::Cancelled,
            title: "✅ Tuyệt vời!".to_string(),
            body: "Bạn đã hoàn thành hết thói quen. Đã HỦY nhắc nhở tối nay.".to_string(),
        }
    }
}

/// Schedules and cancels the single daily reminder. Never fails: without a
/// usable backend it falls back to a [`LocalNotice`].
pub struct ReminderNotifier {
    backend: Option<Box<dyn NotificationBackend>>,
    request: ReminderRequest,
    permission: Mutex<Option<bool>>,
    last_notice: Mutex<Option<LocalNotice>>,
}

impl ReminderNotifier {
    pub fn new(backend: Box<dyn NotificationBackend>, trigger: DailyTrigger) -> Self {
        Self {
            backend: Some(backend),
            ..Self::degraded(trigger)
        }
    }

    /// Notifier for platforms without a notification centre.
    pub fn degraded(trigger: DailyTrigger) -> Self {
        Self {
            backend: None,
            request: ReminderRequest::smart_reminder(trigger),
            permission: Mutex::new(None),
            last_notice: Mutex::new(None),
        }
    }

    pub fn request(&self) -> &ReminderRequest {
        &self.request
    }

    pub fn request_permission(&self) -> bool {
        let Some(backend) = &self.backend else {
            debug!("no notification backend, running in degraded mode");
            return false;
        };
        let granted = match backend.request_permission() {
            Ok(granted) => granted,
            Err(err) => {
                warn!(%err, "permission request failed");
                false
            }
        };
        *self.permission.lock() = Some(granted);
        granted
    }

    /// Replaces any pending reminder under the fixed identifier.
    pub fn schedule(&self) {
        let outcome = self.usable_backend().map(|backend| {
            backend.cancel(&self.request.identifier)?;
            backend.schedule(&self.request)
        });
        match outcome {
            Some(Ok(())) => {
                info!(identifier = %self.request.identifier, "reminder scheduled");
            }
            Some(Err(err)) => {
                warn!(%err, "reminder scheduling failed");
                self.notify_locally(LocalNotice::scheduled(self.request.trigger));
            }
            None => self.notify_locally(LocalNotice::scheduled(self.request.trigger)),
        }
    }

    pub fn cancel(&self) {
        match self
            .usable_backend()
            .map(|backend| backend.cancel(&self.request.identifier))
        {
            Some(Ok(())) => {
                info!(identifier = %self.request.identifier, "reminder cancelled");
            }
            Some(Err(err)) => {
                warn!(%err, "reminder cancellation failed");
                self.notify_locally(LocalNotice::cancelled());
            }
            None => self.notify_locally(LocalNotice::cancelled()),
        }
    }

    pub fn apply(&self, decision: ReminderDecision) {
        match decision {
            ReminderDecision::Schedule => self.schedule(),
            ReminderDecision::Cancel => self.cancel(),
        }
    }

    pub fn last_notice(&self) -> Option<LocalNotice> {
        self.last_notice.lock().clone()
    }

    pub fn take_notice(&self) -> Option<LocalNotice> {
        self.last_notice.lock().take()
    }

    fn usable_backend(&self) -> Option<&dyn NotificationBackend> {
        let backend = self.backend.as_deref()?;
        let known = *self.permission.lock();
        let granted = match known {
            Some(granted) => granted,
            None => self.request_permission(),
        };
        granted.then_some(backend)
    }

    fn notify_locally(&self, notice: LocalNotice) {
        info!(title = %notice.title, body = %notice.body, "local notice");
        *self.last_notice.lock() = Some(notice);
    }
}
