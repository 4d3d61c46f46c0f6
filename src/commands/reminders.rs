//! Reminder lists
//!
//! The payload is a subcommand followed by its arguments:
//!
//! ```text
//! lists
//! search <query>
//! new <list title>\n<due date>\n<title...>
//! delete <identifier>
//! ```
//!
//! Failures are answered in-band so the assistant can explain them.

use super::{CommandHandler, HandlerContext, HandlerError};
use crate::protocol::RequestPayload;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersList {
    pub identifier: String,
    pub title: String,
    pub allows_content_modifications: bool,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub identifier: String,
    pub title: String,
    /// Unix seconds, 0 when unset
    pub due_date: i64,
    /// Unix seconds, 0 while incomplete
    pub completion_date: i64,
}

impl Reminder {
    pub fn is_complete(&self) -> bool {
        self.completion_date != 0
    }
}

#[derive(Debug, Error)]
pub enum RemindersError {
    #[error("No lists enabled")]
    NoListsEnabled,
    #[error("Unable to find list with the given name: {0}")]
    ListNotFound(String),
    #[error("Unable to find the reminder")]
    ReminderNotFound,
    #[error("Unable to parse due date: {0}")]
    InvalidDueDate(String),
    #[error("Invalid subcommand")]
    InvalidSubcommand,
}

/// Backing store for reminders
#[async_trait]
pub trait RemindersStore: Send + Sync {
    async fn lists(&self) -> Result<Vec<RemindersList>, RemindersError>;

    /// Reminders in the lists identified by `lists`
    async fn reminders(
        &self,
        lists: &[String],
        only_incomplete: bool,
    ) -> Result<Vec<Reminder>, RemindersError>;

    /// Add a reminder to the list titled `list_title`; returns its identifier
    async fn add(
        &self,
        list_title: &str,
        title: &str,
        due: DateTime<Local>,
    ) -> Result<String, RemindersError>;

    async fn delete(&self, identifier: &str) -> Result<(), RemindersError>;
}

#[derive(Default)]
struct Store {
    lists: Vec<RemindersList>,
    /// (list identifier, reminder)
    reminders: Vec<(String, Reminder)>,
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryReminders {
    store: Mutex<Store>,
}

impl InMemoryReminders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, identifier: impl Into<String>, title: impl Into<String>) -> Self {
        let list = RemindersList {
            identifier: identifier.into(),
            title: title.into(),
            allows_content_modifications: true,
            source: "Local".to_string(),
        };
        self.lock().lists.push(list);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RemindersStore for InMemoryReminders {
    async fn lists(&self) -> Result<Vec<RemindersList>, RemindersError> {
        Ok(self.lock().lists.clone())
    }

    async fn reminders(
        &self,
        lists: &[String],
        only_incomplete: bool,
    ) -> Result<Vec<Reminder>, RemindersError> {
        Ok(self
            .lock()
            .reminders
            .iter()
            .filter(|(list, r)| lists.contains(list) && !(only_incomplete && r.is_complete()))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn add(
        &self,
        list_title: &str,
        title: &str,
        due: DateTime<Local>,
    ) -> Result<String, RemindersError> {
        let mut store = self.lock();
        let list = store
            .lists
            .iter()
            .find(|l| l.title == list_title)
            .ok_or_else(|| RemindersError::ListNotFound(list_title.to_string()))?
            .identifier
            .clone();

        let identifier = uuid::Uuid::new_v4().to_string();
        store.reminders.push((
            list,
            Reminder {
                identifier: identifier.clone(),
                title: title.to_string(),
                due_date: due.timestamp(),
                completion_date: 0,
            },
        ));
        Ok(identifier)
    }

    async fn delete(&self, identifier: &str) -> Result<(), RemindersError> {
        let mut store = self.lock();
        let index = store
            .reminders
            .iter()
            .position(|(_, r)| r.identifier == identifier)
            .ok_or(RemindersError::ReminderNotFound)?;
        store.reminders.remove(index);
        Ok(())
    }
}

/// Parse a due date written by the assistant.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD` (09:00 local),
/// `now`, `today`, `tomorrow` and `in <n> minutes|hours|days|weeks`.
pub fn parse_due_date(text: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Local.from_local_datetime(&date.and_hms_opt(9, 0, 0)?).earliest();
    }

    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "now" | "today" => return Some(now),
        "tomorrow" => return now.checked_add_signed(TimeDelta::try_days(1)?),
        _ => {}
    }

    let (count, unit) = lower.strip_prefix("in ")?.trim().split_once(' ')?;
    let count: i64 = count.parse().ok()?;
    let delta = match unit.trim().trim_end_matches('s') {
        "min" | "minute" => TimeDelta::try_minutes(count)?,
        "hour" => TimeDelta::try_hours(count)?,
        "day" => TimeDelta::try_days(count)?,
        "week" => TimeDelta::try_weeks(count)?,
        _ => return None,
    };
    now.checked_add_signed(delta)
}

pub struct RemindersHandler {
    store: Arc<dyn RemindersStore>,
}

impl RemindersHandler {
    pub fn new(store: Arc<dyn RemindersStore>) -> Self {
        Self { store }
    }

    async fn enabled_lists(&self, enabled: &[String]) -> Result<Vec<RemindersList>, RemindersError> {
        Ok(self
            .store
            .lists()
            .await?
            .into_iter()
            .filter(|l| enabled.contains(&l.identifier))
            .collect())
    }

    async fn run(
        &self,
        subcommand: &str,
        rest: &str,
        ctx: &HandlerContext,
    ) -> Result<Value, RemindersError> {
        let enabled = ctx.settings.load().reminders_lists;

        match subcommand {
            "lists" => {
                let lists = self.enabled_lists(&enabled).await?;
                if lists.is_empty() {
                    return Err(RemindersError::NoListsEnabled);
                }
                Ok(json!(lists.into_iter().map(|l| l.title).collect::<Vec<_>>()))
            }
            "search" => {
                ctx.notifier.status("Searching reminders", true);
                let reminders = self.store.reminders(&enabled, true).await?;
                Ok(json!({ "query": rest, "reminders": reminders }))
            }
            "new" => {
                let mut lines = rest.split('\n');
                let list = lines.next().unwrap_or_default().trim();
                let due_text = lines.next().unwrap_or_default();
                let title = lines.collect::<Vec<_>>().join("\n");

                if !self.enabled_lists(&enabled).await?.iter().any(|l| l.title == list) {
                    return Err(RemindersError::ListNotFound(list.to_string()));
                }
                let due = parse_due_date(due_text, Local::now())
                    .ok_or_else(|| RemindersError::InvalidDueDate(due_text.to_string()))?;
                Ok(json!(self.store.add(list, &title, due).await?))
            }
            "delete" => {
                self.store.delete(rest.trim()).await?;
                Ok(json!(true))
            }
            _ => Err(RemindersError::InvalidSubcommand),
        }
    }
}

#[async_trait]
impl CommandHandler for RemindersHandler {
    fn error_title(&self) -> &'static str {
        "Reminders Error"
    }

    async fn handle(
        &self,
        args: String,
        ctx: &HandlerContext,
    ) -> Result<Vec<RequestPayload>, HandlerError> {
        let args = args.trim();
        let (subcommand, rest) = args
            .split_once(char::is_whitespace)
            .unwrap_or((args, ""));

        let data = match self.run(subcommand, rest, ctx).await {
            Ok(result) => json!({ subcommand: result }),
            Err(e) => {
                tracing::warn!(subcommand, error = %e, "Reminders command failed");
                json!({ "error": { subcommand: e.to_string() } })
            }
        };
        Ok(vec![RequestPayload::new("reminders", data)])
    }
}
