//! Database models
//!
//! Rust structs representing mirrored entities.
//! Serde names match the remote store's columns and enum spellings, so the
//! same types travel in queued mutation payloads and remote snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Remote columns are nullable; treat null the same as a missing value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of working day recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum DayType {
    #[serde(rename = "Work Day")]
    #[sqlx(rename = "Work Day")]
    WorkDay,
    #[serde(rename = "Rest Day")]
    #[sqlx(rename = "Rest Day")]
    RestDay,
    #[serde(rename = "Special Overtime")]
    #[sqlx(rename = "Special Overtime")]
    SpecialOvertime,
}

impl DayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::WorkDay => "Work Day",
            DayType::RestDay => "Rest Day",
            DayType::SpecialOvertime => "Special Overtime",
        }
    }

    /// Rest days carry no tonnage and no wagons
    pub fn is_rest(&self) -> bool {
        matches!(self, DayType::RestDay)
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "work day" | "work" | "workday" => Ok(DayType::WorkDay),
            "rest day" | "rest" | "restday" => Ok(DayType::RestDay),
            "special overtime" | "overtime" | "special" => Ok(DayType::SpecialOvertime),
            other => Err(format!(
                "Invalid day type '{}'. Use 'work', 'rest' or 'overtime'",
                other
            )),
        }
    }
}

/// Attendance recorded for one worker on one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[serde(rename = "Paid Leave")]
    #[sqlx(rename = "Paid Leave")]
    PaidLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::PaidLeave => "Paid Leave",
        }
    }

    /// Counts against the worker's combined leave allowance
    pub fn is_leave(&self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::PaidLeave)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the monthly allowance is split over a pay period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
pub enum AllowanceType {
    #[default]
    Normal,
    #[serde(rename = "Pro-Rata")]
    #[sqlx(rename = "Pro-Rata")]
    ProRata,
}

/// Which of the two agreements a rate sheet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum AgreementName {
    #[serde(rename = "Current Agreement")]
    #[sqlx(rename = "Current Agreement")]
    Current,
    #[serde(rename = "New Agreement")]
    #[sqlx(rename = "New Agreement")]
    New,
}

impl AgreementName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementName::Current => crate::config::CURRENT_AGREEMENT,
            AgreementName::New => crate::config::NEW_AGREEMENT,
        }
    }
}

impl fmt::Display for AgreementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's recorded work for a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyEntry {
    pub local_id: i64,
    pub remote_id: Option<i64>,
    pub user_id: String,
    pub entry_date: NaiveDate,
    pub day_type: DayType,
    /// None on rest days
    pub tonnage: Option<f64>,
    pub wagons: i64,
    pub synced: bool,
}

/// One worker's computed pay and attendance for an entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyEarning {
    pub local_id: i64,
    pub remote_id: Option<i64>,
    pub entry_local_id: i64,
    pub user_id: String,
    pub worker_name: String,
    pub earning: f64,
    pub attendance_status: AttendanceStatus,
}

/// Entry fields as submitted, before local or remote ids exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub user_id: String,
    pub entry_date: NaiveDate,
    pub day_type: DayType,
    pub tonnage: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wagons: i64,
}

/// Earning fields as computed for a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningDraft {
    pub worker_name: String,
    pub earning: f64,
    pub attendance_status: AttendanceStatus,
}

/// Named rate sheet and leave rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Agreement {
    pub user_id: String,
    pub agreement_name: AgreementName,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ton_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rest_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layoff_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wagon_rate: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monthly_allowance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowance_calculation_type: AllowanceType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paid_leaves: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub without_paid_leaves: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paid_leave_rate: f64,
}

impl Agreement {
    /// Combined paid and unpaid leave days allowed per agreement year
    pub fn total_allowed_leaves(&self) -> i64 {
        self.paid_leaves + self.without_paid_leaves
    }
}

/// Roster member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub user_id: String,
    pub worker_name: String,
}

/// Per-user switches and the agreement anchor date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSettings {
    pub user_id: String,
    pub agreement_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_wagon_system_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_penalty_system_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub penalty_amount: f64,
}

impl UserSettings {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agreement_start_date: None,
            is_wagon_system_enabled: false,
            is_penalty_system_enabled: false,
            penalty_amount: 0.0,
        }
    }
}

/// Visibility profile; `allowed_workers` filters report rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_workers: Vec<String>,
}

/// Stored form of a profile; the worker list is JSON text
#[derive(Debug, FromRow)]
pub(crate) struct ProfileRow {
    pub id: String,
    pub allowed_workers: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = serde_json::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            allowed_workers: serde_json::from_str(&row.allowed_workers)?,
        })
    }
}

/// Session persisted so the client can start without network
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfflineSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// Raw row of the sync queue
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QueueRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}
