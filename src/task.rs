//! Task records and the ordering rule shared by the store and the CLI.
//!
//! The API speaks [`ApiTask`] (string timestamps); everything local works on
//! [`Task`], which carries parsed `chrono` values.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Server-assigned task identifier.
pub type TaskId = u64;

/// Owner of a task.
pub type UserId = u64;

const API_DATE_FORMAT: &str = "%Y-%m-%d";
const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TITLE_MAX_LEN: usize = 255;
const DESCRIPTION_MAX_LEN: usize = 1000;

/// A task as serialized by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub user_id: UserId,
    #[serde(default)]
    pub order: Option<i64>,
}

/// A task as held in local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub user_id: UserId,
    pub order: Option<i64>,
}

impl Task {
    /// True when the task is due on `date`.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.due_date == Some(date)
    }

    /// Case-insensitive substring match on title or description.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_query(&self, needle: &str) -> bool {
        if self.title.to_lowercase().contains(needle) {
            return true;
        }
        self.description
            .as_deref()
            .map(|desc| desc.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

impl TryFrom<ApiTask> for Task {
    type Error = Error;

    fn try_from(raw: ApiTask) -> Result<Self> {
        let created_at = parse_timestamp("created_at", &raw.created_at)?;
        let updated_at = parse_timestamp("updated_at", &raw.updated_at)?;
        let due_date = match raw.due_date.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => Some(parse_due_date(value)?),
            _ => None,
        };

        Ok(Self {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            completed: raw.completed,
            created_at,
            updated_at,
            due_date,
            user_id: raw.user_id,
            order: raw.order,
        })
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())
    }
}

/// Body of an update request. `None` leaves a field untouched.
///
/// `Some(None)` on `description` or `due_date` clears the field on the
/// server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidArgument(
                "nothing to update; pass at least one field".to_string(),
            ));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
            validate_title(title)?;
        }
        validate_description(self.description.as_ref().and_then(Option::as_deref))?;
        if let Some(order) = self.order {
            if order < 1 {
                return Err(Error::InvalidArgument(format!(
                    "order must be >= 1 (got {order})"
                )));
            }
        }
        Ok(())
    }
}

/// One `{id, order}` pair of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub id: TaskId,
    pub order: i64,
}

impl OrderAssignment {
    pub fn new(id: TaskId, order: i64) -> Self {
        Self { id, order }
    }
}

impl FromStr for OrderAssignment {
    type Err = Error;

    /// Parses `ID=ORDER`.
    fn from_str(raw: &str) -> Result<Self> {
        let (id, order) = raw.split_once('=').ok_or_else(|| {
            Error::InvalidArgument(format!("invalid assignment '{raw}' (expected ID=ORDER)"))
        })?;
        let id = id.trim().parse::<TaskId>().map_err(|err| {
            Error::InvalidArgument(format!("invalid task id in '{raw}': {err}"))
        })?;
        let order = order.trim().parse::<i64>().map_err(|err| {
            Error::InvalidArgument(format!("invalid order in '{raw}': {err}"))
        })?;
        Ok(Self { id, order })
    }
}

/// Ordering used for every view of the local collection.
///
/// Ascending `order`, with a missing order sorting after all present ones.
/// Equal or missing orders fall back to creation time, oldest first, so new
/// tasks land at the bottom.
pub fn compare_tasks(left: &Task, right: &Task) -> Ordering {
    match (left.order, right.order) {
        (Some(a), Some(b)) if a != b => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => left.created_at.cmp(&right.created_at),
    }
}

/// Stable in-place sort by [`compare_tasks`].
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// Format a date the way the API expects it in queries and bodies.
pub fn format_api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Parse a user-supplied `YYYY-MM-DD` date.
pub fn parse_api_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), API_DATE_FORMAT).map_err(|err| {
        Error::InvalidArgument(format!("invalid date '{value}' (expected YYYY-MM-DD): {err}"))
    })
}

fn parse_timestamp(label: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, SQL_TIMESTAMP_FORMAT) {
        return Ok(parsed.and_utc());
    }
    Err(Error::InvalidResponse(format!(
        "invalid {label} timestamp '{value}'"
    )))
}

fn parse_due_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, API_DATE_FORMAT) {
        return Ok(date);
    }
    // Some API versions send the due date as a full timestamp.
    parse_timestamp("due_date", value).map(|ts| ts.date_naive())
}

fn validate_title(title: &str) -> Result<()> {
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(Error::InvalidArgument(format!(
            "title may not be longer than {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    match description {
        Some(desc) if desc.chars().count() > DESCRIPTION_MAX_LEN => {
            Err(Error::InvalidArgument(format!(
                "description may not be longer than {DESCRIPTION_MAX_LEN} characters"
            )))
        }
        _ => Ok(()),
    }
}
