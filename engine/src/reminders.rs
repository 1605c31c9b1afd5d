//! Background task that announces due reminders.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use nexus_tools::ReminderStore;
use tokio::task::JoinHandle;

use crate::events::AgentEvent;
use crate::narrator::Narrator;

pub struct ReminderChecker {
    store: ReminderStore,
    narrator: Narrator,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderChecker {
    #[must_use]
    pub fn new(store: ReminderStore, narrator: Narrator, interval: Duration) -> Self {
        Self {
            store,
            narrator,
            interval: interval.max(Duration::from_secs(1)),
            task: Mutex::new(None),
        }
    }

    /// Spawn the polling task. A no-op while a previous task is alive.
    /// Returns whether a new task was started.
    pub fn start(&self) -> bool {
        let Ok(mut task) = self.task.lock() else {
            return false;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let store = self.store.clone();
        let narrator = self.narrator.clone();
        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                announce_due(&store, &narrator, Local::now().naive_local()).await;
            }
        }));
        tracing::info!(interval_secs = interval.as_secs(), "Reminder checker started");
        true
    }

    pub fn stop(&self) {
        if let Ok(mut task) = self.task.lock()
            && let Some(handle) = task.take()
        {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Run one check immediately.
    pub async fn check(&self, now: NaiveDateTime) -> usize {
        announce_due(&self.store, &self.narrator, now).await
    }
}

impl Drop for ReminderChecker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn announce_due(store: &ReminderStore, narrator: &Narrator, now: NaiveDateTime) -> usize {
    let due = store.take_due(now);
    for reminder in &due {
        tracing::info!(message = %reminder.message, "Reminder due");
        narrator.emit(AgentEvent::ReminderDue(reminder.message.clone()));
        narrator.say(&format!("Reminder: {}", reminder.message)).await;
    }
    due.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nexus_tools::Reminder;
    use nexus_voice::RecordingSpeaker;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn reminder(message: &str, time: NaiveDateTime) -> Reminder {
        Reminder {
            message: message.to_string(),
            time,
            created: at(8, 0),
        }
    }

    #[tokio::test]
    async fn due_reminders_are_spoken_once_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::load(dir.path().join("reminders.json"));
        store.add(reminder("Stretch", at(9, 0))).unwrap();
        store.add(reminder("Call mom", at(9, 30))).unwrap();
        store.add(reminder("Lunch", at(12, 0))).unwrap();

        let speaker = RecordingSpeaker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let narrator = Narrator::new(Arc::new(speaker.clone())).with_events(tx);
        let checker = ReminderChecker::new(store.clone(), narrator, Duration::from_secs(30));

        assert_eq!(checker.check(at(9, 30)).await, 2);
        assert_eq!(checker.check(at(9, 45)).await, 0);
        assert_eq!(speaker.spoken(), vec!["Reminder: Stretch", "Reminder: Call mom"]);
        assert_eq!(rx.recv().await, Some(AgentEvent::ReminderDue("Stretch".to_string())));

        let reloaded = ReminderStore::load(dir.path().join("reminders.json"));
        assert_eq!(reloaded.list(), vec![reminder("Lunch", at(12, 0))]);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReminderStore::load(dir.path().join("reminders.json"));
        let narrator = Narrator::new(Arc::new(RecordingSpeaker::new()));
        let checker = ReminderChecker::new(store, narrator, Duration::from_secs(30));

        assert!(checker.start());
        assert!(!checker.start());
        assert!(checker.is_running());

        checker.stop();
        tokio::task::yield_now().await;
        assert!(checker.start());
    }
}
