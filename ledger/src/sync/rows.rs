//! Remote row shapes and the per-user snapshot used by the pull resync

use super::remote::{Filter, RemoteError, RemoteStore, RemoteTable};
use crate::database::models::null_as_default;
use crate::database::{
    Agreement, AttendanceStatus, DayType, EarningDraft, EntryDraft, Profile, UserSettings, Worker,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Remote `daily_entries` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDailyEntry {
    pub id: i64,
    pub user_id: String,
    pub entry_date: NaiveDate,
    pub day_type: DayType,
    pub tonnage: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wagons: i64,
}

impl RemoteDailyEntry {
    pub fn draft(&self) -> EntryDraft {
        EntryDraft {
            user_id: self.user_id.clone(),
            entry_date: self.entry_date,
            day_type: self.day_type,
            tonnage: self.tonnage,
            wagons: self.wagons,
        }
    }
}

/// Remote `daily_earnings` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDailyEarning {
    pub id: i64,
    pub entry_id: i64,
    pub user_id: String,
    pub worker_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub earning: f64,
    pub attendance_status: AttendanceStatus,
}

impl RemoteDailyEarning {
    pub fn draft(&self) -> EarningDraft {
        EarningDraft {
            worker_name: self.worker_name.clone(),
            earning: self.earning,
            attendance_status: self.attendance_status,
        }
    }

    /// Row to insert for an earning that belongs to remote entry `entry_id`
    pub fn new_row(entry_id: i64, user_id: &str, earning: &EarningDraft) -> Value {
        json!({
            "entry_id": entry_id,
            "user_id": user_id,
            "worker_name": earning.worker_name,
            "earning": earning.earning,
            "attendance_status": earning.attendance_status,
        })
    }
}

/// Everything the remote store holds for one user
#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    pub user_id: String,
    pub entries: Vec<RemoteDailyEntry>,
    pub earnings: Vec<RemoteDailyEarning>,
    pub agreements: Vec<Agreement>,
    pub workers: Vec<Worker>,
    pub settings: Option<UserSettings>,
    pub profile: Option<Profile>,
}

impl RemoteSnapshot {
    pub async fn fetch(remote: &dyn RemoteStore, user_id: &str) -> Result<Self, RemoteError> {
        tracing::info!("Fetching remote snapshot for {}", user_id);

        let by_user = [Filter::eq("user_id", user_id)];

        let mut entries: Vec<RemoteDailyEntry> =
            fetch_rows(remote, RemoteTable::DailyEntries, &by_user).await?;
        entries.sort_by_key(|e| e.entry_date);

        let mut earnings: Vec<RemoteDailyEarning> =
            fetch_rows(remote, RemoteTable::DailyEarnings, &by_user).await?;
        earnings.sort_by_key(|e| e.id);

        let agreements = fetch_rows(remote, RemoteTable::Agreements, &by_user).await?;
        let workers = fetch_rows(remote, RemoteTable::Workers, &by_user).await?;
        let settings = fetch_rows::<UserSettings>(remote, RemoteTable::Settings, &by_user)
            .await?
            .into_iter()
            .next();
        let profile = fetch_rows::<Profile>(remote, RemoteTable::Profiles, &[Filter::eq("id", user_id)])
            .await?
            .into_iter()
            .next();

        tracing::info!(
            "Remote snapshot for {}: {} entries, {} earnings, {} workers",
            user_id,
            entries.len(),
            earnings.len(),
            workers.len()
        );

        Ok(Self {
            user_id: user_id.to_string(),
            entries,
            earnings,
            agreements,
            workers,
            settings,
            profile,
        })
    }
}

async fn fetch_rows<T: DeserializeOwned>(
    remote: &dyn RemoteStore,
    table: RemoteTable,
    filters: &[Filter],
) -> Result<Vec<T>, RemoteError> {
    remote
        .select(table, filters)
        .await?
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| RemoteError::Decode(format!("{} row: {}", table, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_entry_tolerates_null_wagons() {
        let row = json!({
            "id": 7,
            "user_id": "u1",
            "entry_date": "2024-03-01",
            "day_type": "Rest Day",
            "tonnage": null,
            "wagons": null,
            "created_at": "2024-03-01T10:00:00Z"
        });

        let entry: RemoteDailyEntry = serde_json::from_value(row).unwrap();
        assert_eq!(entry.day_type, DayType::RestDay);
        assert_eq!(entry.tonnage, None);
        assert_eq!(entry.wagons, 0);
    }

    #[test]
    fn test_new_earning_row_uses_wire_names() {
        let earning = EarningDraft {
            worker_name: "Ali".to_string(),
            earning: 12.5,
            attendance_status: AttendanceStatus::PaidLeave,
        };

        let row = RemoteDailyEarning::new_row(3, "u1", &earning);
        assert_eq!(row["entry_id"], 3);
        assert_eq!(row["attendance_status"], "Paid Leave");
    }
}
