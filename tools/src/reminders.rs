//! Reminders: the persisted store, natural time phrases and the three skills.
//!
//! The store is shared between the skills (which add, list and cancel) and
//! the engine's reminder checker (which takes due entries). Every mutation is
//! written straight back to `reminders.json` through the atomic writer.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use nexus_types::ToolCategory;
use nexus_utils::{atomic_write, recover_bak_file};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, lenient_int, str_field};

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(SetReminderTool),
        Box::new(ListRemindersTool),
        Box::new(CancelReminderTool),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub message: String,
    pub time: NaiveDateTime,
    pub created: NaiveDateTime,
}

/// Reminders in creation order, mirrored to disk.
#[derive(Debug, Clone)]
pub struct ReminderStore {
    path: PathBuf,
    entries: Arc<Mutex<Vec<Reminder>>>,
}

impl ReminderStore {
    /// Load from `path`. A missing or unreadable file starts an empty store.
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        recover_bak_file(&path);
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "Ignoring unreadable reminders file: {e}");
                Vec::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read reminders: {e}");
                Vec::new()
            }
        };
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reminder>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, entries: &[Reminder]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(entries).map_err(io::Error::other)?;
        atomic_write(&self.path, &json)
    }

    pub fn add(&self, reminder: Reminder) -> io::Result<()> {
        let mut entries = self.lock();
        entries.push(reminder);
        self.save(&entries)
    }

    #[must_use]
    pub fn list(&self) -> Vec<Reminder> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove by 1-based position. `Ok(None)` when out of range.
    pub fn cancel(&self, position: usize) -> io::Result<Option<Reminder>> {
        let mut entries = self.lock();
        if position == 0 || position > entries.len() {
            return Ok(None);
        }
        let removed = entries.remove(position - 1);
        self.save(&entries)?;
        Ok(Some(removed))
    }

    /// Remove and return every reminder due at `now`, persisting the rest.
    ///
    /// Due entries are returned even when the file cannot be rewritten; they
    /// are gone from memory either way and must still be announced.
    #[must_use]
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<Reminder> {
        let mut entries = self.lock();
        let (due, pending): (Vec<Reminder>, Vec<Reminder>) =
            entries.drain(..).partition(|r| r.time <= now);
        *entries = pending;
        if !due.is_empty()
            && let Err(e) = self.save(&entries)
        {
            tracing::warn!(path = %self.path.display(), "Failed to update reminders: {e}");
        }
        due
    }
}

// ============================================================================
// Time phrases
// ============================================================================

/// Parse "in 5 minutes", "in an hour", "at 3:00 PM", "15:30" relative to `now`.
///
/// Clock times that already passed today refer to tomorrow.
#[must_use]
pub fn parse_time_phrase(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim().to_lowercase();
    if let Some(rest) = text.strip_prefix("in ") {
        return parse_offset(rest).and_then(|offset| now.checked_add_signed(offset));
    }
    let clock = text.strip_prefix("at ").unwrap_or(&text);
    let time = parse_clock(clock.trim())?;
    let mut target = now.date().and_time(time);
    if target < now {
        target = target.checked_add_signed(ChronoDuration::days(1))?;
    }
    Some(target)
}

fn parse_offset(text: &str) -> Option<ChronoDuration> {
    let mut words = text.split_whitespace();
    let amount: i64 = match words.next()? {
        "a" | "an" | "one" => 1,
        n => n.parse().ok().filter(|n| *n >= 0)?,
    };
    let unit = words.next()?;
    if words.next().is_some() {
        return None;
    }
    match unit {
        "second" | "seconds" | "sec" | "secs" => ChronoDuration::try_seconds(amount),
        "minute" | "minutes" | "min" | "mins" => ChronoDuration::try_minutes(amount),
        "hour" | "hours" | "hr" | "hrs" => ChronoDuration::try_hours(amount),
        "day" | "days" => ChronoDuration::try_days(amount),
        _ => None,
    }
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let (digits, meridiem) = split_meridiem(text);
    let (hour, minute) = match digits.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        Some(_) => return None,
        // A bare hour needs am/pm.
        None if meridiem.is_some() => (digits.parse::<u32>().ok()?, 0),
        None => return None,
    };
    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Split a trailing am/pm marker. `Some(true)` means pm.
fn split_meridiem(text: &str) -> (&str, Option<bool>) {
    for (suffix, pm) in [("a.m.", false), ("p.m.", true), ("am", false), ("pm", true)] {
        if let Some(rest) = text.strip_suffix(suffix) {
            return (rest.trim_end(), Some(pm));
        }
    }
    (text, None)
}

/// "N minutes" when under an hour away, otherwise the clock time.
#[must_use]
pub fn describe_due(target: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (target - now).num_seconds();
    if secs < 3600 {
        format!("{} minutes", secs.max(0) / 60)
    } else {
        target.format("%I:%M %p").to_string()
    }
}

// ============================================================================
// Skills
// ============================================================================

struct SetReminderTool;

impl SetReminderTool {
    fn set(store: &ReminderStore, message: &str, when: &str, now: NaiveDateTime) -> Result<String, ToolError> {
        let Some(time) = parse_time_phrase(when, now) else {
            return Ok(format!(
                "Could not understand time '{when}'. Try 'in 5 minutes' or 'at 3:00 PM'"
            ));
        };
        store
            .add(Reminder {
                message: message.to_string(),
                time,
                created: now,
            })
            .map_err(|e| ToolError::failed("setting reminder", e))?;
        tracing::info!(%time, "Reminder set");
        Ok(format!("Reminder set for {}: {message}", describe_due(time, now)))
    }
}

impl ToolExecutor for SetReminderTool {
    fn name(&self) -> &'static str {
        "set_reminder"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "Remind the user of something at a time ('in 10 minutes', 'at 3:00 PM')"
    }

    fn arguments(&self) -> Value {
        json!({ "message": "...", "time": "in 10 minutes" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let now = Local::now().naive_local();
            Self::set(
                &ctx.reminders,
                str_field(&args, "message"),
                str_field(&args, "time"),
                now,
            )
        })
    }
}

#[must_use]
pub fn format_reminders(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return "You have no active reminders.".to_string();
    }
    let mut text = format!("Active Reminders ({}):\n\n", reminders.len());
    for (i, reminder) in reminders.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} - {}\n",
            i + 1,
            reminder.message,
            reminder.time.format("%I:%M %p on %b %d")
        ));
    }
    text
}

struct ListRemindersTool;

impl ToolExecutor for ListRemindersTool {
    fn name(&self) -> &'static str {
        "list_reminders"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "List active reminders"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move { Ok(format_reminders(&ctx.reminders.list())) })
    }
}

struct CancelReminderTool;

impl ToolExecutor for CancelReminderTool {
    fn name(&self) -> &'static str {
        "cancel_reminder"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "Cancel a reminder by its number in the list"
    }

    fn arguments(&self) -> Value {
        json!({ "index": 1 })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let index = args.get("index").and_then(lenient_int).unwrap_or(0);
            let position = usize::try_from(index).unwrap_or(0);
            let removed = ctx
                .reminders
                .cancel(position)
                .map_err(|e| ToolError::failed("cancelling reminder", e))?;
            Ok(match removed {
                Some(reminder) => format!("Reminder cancelled: {}", reminder.message),
                None => format!(
                    "Invalid reminder number. You have {} reminders.",
                    ctx.reminders.len()
                ),
            })
        })
    }
}
