use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test: intervals that only share a boundary instant do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "StoredTimeBlock")]
pub struct TimeBlock {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
    pub category: String,
    pub completed: bool,
}

impl TimeBlock {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "time_block.id")?;
        validate_non_empty(&self.label, "time_block.label")?;
        validate_range(self.start, self.end, "time_block")
    }
}

// Persisted records come from older dashboard builds that wrote `isCompleted`
// and sometimes left `category` out.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTimeBlock {
    id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    label: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    is_completed: Option<bool>,
}

impl From<StoredTimeBlock> for TimeBlock {
    fn from(stored: StoredTimeBlock) -> Self {
        Self {
            id: stored.id,
            start: stored.start,
            end: stored.end,
            label: stored.label,
            category: normalize_category(stored.category.as_deref()),
            completed: stored.completed.or(stored.is_completed).unwrap_or(false),
        }
    }
}

/// A candidate block before admission: no id, not completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlockDraft {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
}

impl TimeBlockDraft {
    pub fn new(label: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.label, "draft.label")?;
        validate_range(self.start, self.end, "draft")
    }

    pub fn into_block(self, id: String) -> TimeBlock {
        TimeBlock {
            id,
            start: self.start,
            end: self.end,
            label: self.label.trim().to_string(),
            category: normalize_category(self.category.as_deref()),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Conflict,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub conflicting: TimeBlock,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Admission {
    Admitted(TimeBlock),
    Rejected(Rejection),
}

impl Admission {
    pub fn admitted(&self) -> Option<&TimeBlock> {
        match self {
            Self::Admitted(block) => Some(block),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Reminder {
    pub block_id: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub minutes_until_start: i64,
}

fn normalize_category(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>, prefix: &str) -> Result<(), String> {
    if end <= start {
        return Err(format!("{prefix}.end must be after {prefix}.start"));
    }
    Ok(())
}
