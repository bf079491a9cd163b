//! Task domain model.
//!
//! A task belongs to exactly one owner for its whole lifetime. The owner is
//! fixed when the task is built and no method on [`Task`] can change it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Category assigned when the caller does not provide one.
pub const DEFAULT_CATEGORY: &str = "Others";

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a task.
///
/// New identifiers are UUID v7, so they sort in creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new time-ordered `TaskId` (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Stable identity of the user that owns a task.
///
/// Only the authorization layer produces these; request payloads never do.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A timestamp wrapper for `DateTime<Utc>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the current time as a `Timestamp`.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Formats the timestamp as RFC 3339 with millisecond precision.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.to_rfc3339())
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Error returned when a priority string is not one of the allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid priority '{0}': expected one of low, medium, high")]
pub struct InvalidPriority(pub String);

/// The priority level of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    /// Parses a priority. Matching is exact: `"High"` is rejected.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(InvalidPriority(other.to_string())),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// Task Input
// =============================================================================

/// Caller-supplied fields for a new task, before validation.
///
/// There is deliberately no owner field here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub predicted_deadline: Option<String>,
    pub priority: Option<String>,
}

impl NewTask {
    /// Creates input holding only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Caller-supplied partial fields for an update, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub predicted_deadline: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
}

// =============================================================================
// Task Changes
// =============================================================================

/// Already-validated field replacements for an existing task.
///
/// `None` means "leave the field as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub predicted_deadline: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

// =============================================================================
// Task
// =============================================================================

/// The task record.
///
/// Stored as a single document; `created_at` and `updated_at` are
/// maintained by the store, never by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Task {
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub category: String,
    /// `YYYY-MM-DD` or empty. Not checked against the calendar.
    pub predicted_deadline: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Creates a task with every optional field at its default.
    ///
    /// Defaults: empty description, summary and deadline, category
    /// `"Others"`, not completed, medium priority.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        owner_id: OwnerId,
        title: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            task_id,
            owner_id,
            title: title.into(),
            description: String::new(),
            summary: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            predicted_deadline: String::new(),
            completed: false,
            priority: Priority::default(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_category(self, category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_predicted_deadline(self, predicted_deadline: impl Into<String>) -> Self {
        Self {
            predicted_deadline: predicted_deadline.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    #[must_use]
    pub fn with_completed(self, completed: bool) -> Self {
        Self { completed, ..self }
    }

    /// Returns `true` if `owner` owns this task.
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Merges `changes` over this task and stamps `updated_at`.
    ///
    /// Identity, owner and `created_at` are carried over untouched.
    #[must_use]
    pub fn apply_changes(self, changes: TaskChanges, now: Timestamp) -> Self {
        Self {
            title: changes.title.unwrap_or(self.title),
            description: changes.description.unwrap_or(self.description),
            summary: changes.summary.unwrap_or(self.summary),
            category: changes.category.unwrap_or(self.category),
            predicted_deadline: changes
                .predicted_deadline
                .unwrap_or(self.predicted_deadline),
            completed: changes.completed.unwrap_or(self.completed),
            priority: changes.priority.unwrap_or(self.priority),
            updated_at: now,
            ..self
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn timestamp(seconds: i64) -> Timestamp {
        Timestamp::from_datetime(Utc.timestamp_opt(seconds, 0).unwrap())
    }

    #[rstest]
    fn test_task_new_applies_defaults() {
        let task = Task::new(
            TaskId::generate(),
            OwnerId::new("u1"),
            "Fix bug",
            timestamp(100),
        );

        assert_eq!(task.title, "Fix bug");
        assert_eq!(task.description, "");
        assert_eq!(task.summary, "");
        assert_eq!(task.category, "Others");
        assert_eq!(task.predicted_deadline, "");
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[rstest]
    #[case("low", Priority::Low)]
    #[case("medium", Priority::Medium)]
    #[case("high", Priority::High)]
    fn test_priority_from_str_valid(#[case] input: &str, #[case] expected: Priority) {
        assert_eq!(input.parse::<Priority>().unwrap(), expected);
        assert_eq!(expected.as_str(), input);
    }

    #[rstest]
    #[case("urgent")]
    #[case("High")]
    #[case("")]
    #[case("critical")]
    fn test_priority_from_str_invalid(#[case] input: &str) {
        let error = input.parse::<Priority>().unwrap_err();
        assert_eq!(error, InvalidPriority(input.to_string()));
    }

    #[rstest]
    fn test_builders_replace_only_their_field() {
        let base = Task::new(
            TaskId::generate(),
            OwnerId::new("u1"),
            "Fix bug",
            timestamp(100),
        )
        .with_summary("short");

        let built = base.clone().with_priority(Priority::Low).with_completed(true);

        assert_eq!(built.priority, Priority::Low);
        assert!(built.completed);
        assert_eq!(built.summary, "short");
        assert_eq!(built.title, base.title);
        assert_eq!(built.task_id, base.task_id);
        assert_eq!(built.updated_at, base.updated_at);
    }

    #[rstest]
    fn test_apply_changes_merges_only_present_fields() {
        let original = Task::new(
            TaskId::generate(),
            OwnerId::new("u1"),
            "Fix bug",
            timestamp(100),
        )
        .with_priority(Priority::High)
        .with_description("details");

        let changes = TaskChanges {
            completed: Some(true),
            ..TaskChanges::default()
        };
        let updated = original.clone().apply_changes(changes, timestamp(200));

        assert!(updated.completed);
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.description, original.description);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.task_id, original.task_id);
        assert_eq!(updated.owner_id, original.owner_id);
        assert_eq!(updated.created_at, timestamp(100));
        assert_eq!(updated.updated_at, timestamp(200));
    }

    #[rstest]
    fn test_task_id_parse_round_trip() {
        let id = TaskId::generate();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }

    #[rstest]
    fn test_task_id_generate_is_time_ordered() {
        let first = TaskId::generate();
        let second = TaskId::generate();
        assert!(second > first);
    }

    #[rstest]
    fn test_is_owned_by() {
        let task = Task::new(TaskId::generate(), OwnerId::new("a"), "t", timestamp(1));
        assert!(task.is_owned_by(&OwnerId::new("a")));
        assert!(!task.is_owned_by(&OwnerId::new("b")));
    }
}
