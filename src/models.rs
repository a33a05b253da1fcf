//! Domain models shared by the store, the report engine and the API
//!
//! Timestamps are local wall-clock times without a zone. They are parsed from
//! text exactly once, here, and stored as fixed-width `YYYY-MM-DDTHH:MM:SS`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{MonthId, WeekId};
use crate::error::{PdcaError, Result};

/// Storage and wire format for task timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a client or database timestamp. Date-only input means midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(|| PdcaError::validation(format!("invalid timestamp '{raw}'")))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for `NaiveDateTime` fields using `parse_timestamp`
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    Plan,
    Canceled,
    Completed,
    /// Any stored value outside the known set. Counted in totals only.
    Unknown,
}

impl Serialize for TaskStatus {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(match raw.as_str() {
            "PLANNED" => TaskStatus::Plan,
            other => TaskStatus::from_db(other),
        })
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Plan => "PLAN",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "PLAN" => TaskStatus::Plan,
            "CANCELED" => TaskStatus::Canceled,
            "COMPLETED" => TaskStatus::Completed,
            _ => TaskStatus::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Plan => "Planned",
            TaskStatus::Canceled => "Canceled",
            TaskStatus::Completed => "Completed",
            TaskStatus::Unknown => "Unknown",
        }
    }
}

/// Where the work happens
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkLocation {
    #[default]
    Internal,
    External {
        #[serde(default)]
        location: Option<String>,
    },
}

impl WorkLocation {
    pub fn label(&self) -> &str {
        match self {
            WorkLocation::Internal => "Office",
            WorkLocation::External { location: Some(loc) } if !loc.trim().is_empty() => loc,
            WorkLocation::External { .. } => "External",
        }
    }
}

/// A scheduled unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub owner_id: i64,
    pub title: String,
    #[serde(with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub all_day: bool,
    pub status: TaskStatus,
    #[serde(default)]
    pub do_text: Option<String>,
    #[serde(default)]
    pub check_text: Option<String>,
    #[serde(default)]
    pub act_text: Option<String>,
    #[serde(default)]
    pub location: WorkLocation,
    pub created_at: String,
    pub updated_at: String,
}

/// Editable task fields, as submitted for create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    #[serde(with = "timestamp")]
    pub start: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub do_text: Option<String>,
    #[serde(default)]
    pub check_text: Option<String>,
    #[serde(default)]
    pub act_text: Option<String>,
    #[serde(default)]
    pub location: WorkLocation,
}

impl TaskInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PdcaError::validation("title must not be empty"));
        }
        if self.end < self.start {
            return Err(PdcaError::validation(format!(
                "end {} is before start {}",
                format_timestamp(&self.end),
                format_timestamp(&self.start)
            )));
        }
        if self.status == TaskStatus::Unknown {
            return Err(PdcaError::validation(
                "status must be one of PLAN, CANCELED, COMPLETED",
            ));
        }
        Ok(())
    }
}

/// Period a narrative plan belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum PlanPeriod {
    Week(WeekId),
    Month(MonthId),
}

impl PlanPeriod {
    pub fn key(&self) -> String {
        match self {
            PlanPeriod::Week(w) => w.to_string(),
            PlanPeriod::Month(m) => m.to_string(),
        }
    }
}

/// Narrative plan text for one owner and period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub owner_id: i64,
    pub period: PlanPeriod,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Public view of an account; the password hash never leaves the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    /// Question key chosen at registration, asked again on recovery
    pub security_question: String,
    pub security_answer: String,
}

/// Password reset by security question
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRecovery {
    pub username: String,
    pub security_question: String,
    pub security_answer: String,
    pub new_password: String,
}
