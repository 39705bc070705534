//! Payroll snapshot
//!
//! Everything the reports need for one user, loaded either from the local
//! mirror or from a remote fetch. Both sources produce the same shape so the
//! report functions never know where their data came from.

use crate::database::{
    Agreement, AgreementName, AttendanceStatus, DayType, EarningDraft, Profile, Repository,
    UserSettings,
};
use crate::error::{AppError, Result};
use crate::sync::rows::RemoteSnapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// An entry with its earning records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    pub entry_date: NaiveDate,
    pub day_type: DayType,
    pub tonnage: Option<f64>,
    pub wagons: i64,
    pub synced: bool,
    pub earnings: Vec<EarningDraft>,
}

impl EntryRecord {
    pub fn names_with(&self, pred: impl Fn(AttendanceStatus) -> bool) -> Vec<String> {
        self.earnings
            .iter()
            .filter(|e| pred(e.attendance_status))
            .map(|e| e.worker_name.clone())
            .collect()
    }

    pub fn present_workers(&self) -> Vec<String> {
        self.names_with(|s| s == AttendanceStatus::Present)
    }

    /// Absent and paid-leave workers
    pub fn absent_workers(&self) -> Vec<String> {
        self.names_with(|s| s.is_leave())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollSnapshot {
    pub user_id: String,
    /// Oldest first
    pub entries: Vec<EntryRecord>,
    /// Roster in insertion order
    pub workers: Vec<String>,
    pub agreements: Vec<Agreement>,
    pub settings: Option<UserSettings>,
    pub profile: Option<Profile>,
}

impl PayrollSnapshot {
    /// Read the local mirror for `user_id`
    pub async fn load(repo: &Repository, user_id: &str) -> Result<Self> {
        let entries = repo.list_entries(user_id).await?;

        let mut by_entry: HashMap<i64, Vec<EarningDraft>> = HashMap::new();
        for earning in repo.list_earnings(user_id).await? {
            by_entry
                .entry(earning.entry_local_id)
                .or_default()
                .push(EarningDraft {
                    worker_name: earning.worker_name,
                    earning: earning.earning,
                    attendance_status: earning.attendance_status,
                });
        }

        let entries = entries
            .into_iter()
            .map(|entry| EntryRecord {
                entry_date: entry.entry_date,
                day_type: entry.day_type,
                tonnage: entry.tonnage,
                wagons: entry.wagons,
                synced: entry.synced,
                earnings: by_entry.remove(&entry.local_id).unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            user_id: user_id.to_string(),
            entries,
            workers: repo
                .list_workers(user_id)
                .await?
                .into_iter()
                .map(|w| w.worker_name)
                .collect(),
            agreements: repo.list_agreements(user_id).await?,
            settings: repo.get_settings(user_id).await?,
            profile: repo.get_profile(user_id).await?,
        })
    }

    pub fn agreement(&self, name: AgreementName) -> Option<&Agreement> {
        self.agreements.iter().find(|a| a.agreement_name == name)
    }

    pub fn require_agreement(&self, name: AgreementName) -> Result<&Agreement> {
        self.agreement(name)
            .ok_or_else(|| AppError::missing_agreement(name.as_str()))
    }

    pub fn require_settings(&self) -> Result<&UserSettings> {
        self.settings.as_ref().ok_or_else(AppError::missing_settings)
    }

    /// Agreement start date
    pub fn anchor(&self) -> Result<NaiveDate> {
        self.settings
            .as_ref()
            .and_then(|s| s.agreement_start_date)
            .ok_or_else(AppError::missing_start_date)
    }

    pub fn require_roster(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(AppError::EmptyRoster);
        }
        Ok(())
    }

    /// Entries dated within `[from, to]`
    pub fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Iterator<Item = &EntryRecord> + '_ {
        self.entries
            .iter()
            .filter(move |e| from <= e.entry_date && e.entry_date <= to)
    }

    /// Worker names the profile allows to be shown, in display order.
    ///
    /// Without an allowed list only the first roster worker is visible.
    pub fn visible_workers(&self) -> Vec<String> {
        match &self.profile {
            Some(profile) if !profile.allowed_workers.is_empty() => profile.allowed_workers.clone(),
            _ => self.workers.iter().take(1).cloned().collect(),
        }
    }

    /// Keep only visible rows, ordered like [`Self::visible_workers`]
    pub fn visible_rows<T>(&self, mut rows: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
        let mut visible = Vec::new();
        for worker in self.visible_workers() {
            if let Some(pos) = rows.iter().position(|row| name(row) == worker) {
                visible.push(rows.swap_remove(pos));
            }
        }
        visible
    }
}

impl From<RemoteSnapshot> for PayrollSnapshot {
    fn from(remote: RemoteSnapshot) -> Self {
        // One entry per date; a later remote id wins
        let mut by_date = BTreeMap::new();
        for entry in remote.entries {
            match by_date.get(&entry.entry_date) {
                Some((id, _)) if *id > entry.id => {}
                _ => {
                    by_date.insert(entry.entry_date, (entry.id, entry));
                }
            }
        }

        let mut by_entry: HashMap<i64, Vec<EarningDraft>> = HashMap::new();
        for earning in &remote.earnings {
            by_entry
                .entry(earning.entry_id)
                .or_default()
                .push(earning.draft());
        }

        let entries = by_date
            .into_values()
            .map(|(id, entry)| EntryRecord {
                entry_date: entry.entry_date,
                day_type: entry.day_type,
                tonnage: entry.tonnage,
                wagons: entry.wagons,
                synced: true,
                earnings: by_entry.remove(&id).unwrap_or_default(),
            })
            .collect();

        Self {
            user_id: remote.user_id,
            entries,
            workers: remote.workers.into_iter().map(|w| w.worker_name).collect(),
            agreements: remote.agreements,
            settings: remote.settings,
            profile: remote.profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Worker;
    use crate::sync::rows::{RemoteDailyEarning, RemoteDailyEntry};

    fn snapshot(workers: &[&str], allowed: Option<&[&str]>) -> PayrollSnapshot {
        PayrollSnapshot {
            user_id: "u1".to_string(),
            entries: Vec::new(),
            workers: workers.iter().map(|s| s.to_string()).collect(),
            agreements: Vec::new(),
            settings: None,
            profile: allowed.map(|names| Profile {
                id: "u1".to_string(),
                allowed_workers: names.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    #[test]
    fn test_without_allowed_list_only_first_worker_is_visible() {
        assert_eq!(snapshot(&["Ali", "Bilal"], None).visible_workers(), vec!["Ali"]);
        assert_eq!(snapshot(&["Ali", "Bilal"], Some(&[][..])).visible_workers(), vec!["Ali"]);
        assert!(snapshot(&[], None).visible_workers().is_empty());
    }

    #[test]
    fn test_visible_rows_follow_allowed_order() {
        let snapshot = snapshot(&["Ali", "Bilal", "Chand"], Some(&["Chand", "Ali", "Zed"][..]));
        let rows = vec!["Ali", "Bilal", "Chand"];

        let visible = snapshot.visible_rows(rows, |r| *r);
        assert_eq!(visible, vec!["Chand", "Ali"]);
    }

    #[test]
    fn test_missing_configuration_errors() {
        let snapshot = snapshot(&[], None);
        assert!(matches!(snapshot.require_roster(), Err(AppError::EmptyRoster)));
        assert!(matches!(snapshot.anchor(), Err(AppError::Configuration(_))));
        assert!(matches!(
            snapshot.require_agreement(AgreementName::New),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_remote_snapshot_groups_earnings_by_entry() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let remote = RemoteSnapshot {
            user_id: "u1".to_string(),
            entries: vec![RemoteDailyEntry {
                id: 9,
                user_id: "u1".to_string(),
                entry_date: date,
                day_type: DayType::WorkDay,
                tonnage: Some(2.0),
                wagons: 0,
            }],
            earnings: vec![
                RemoteDailyEarning {
                    id: 10,
                    entry_id: 9,
                    user_id: "u1".to_string(),
                    worker_name: "Ali".to_string(),
                    earning: 200.0,
                    attendance_status: AttendanceStatus::Present,
                },
                RemoteDailyEarning {
                    id: 11,
                    entry_id: 9,
                    user_id: "u1".to_string(),
                    worker_name: "Bilal".to_string(),
                    earning: 50.0,
                    attendance_status: AttendanceStatus::Absent,
                },
            ],
            workers: vec![Worker {
                user_id: "u1".to_string(),
                worker_name: "Ali".to_string(),
            }],
            ..RemoteSnapshot::default()
        };

        let snapshot = PayrollSnapshot::from(remote);
        assert_eq!(snapshot.entries.len(), 1);
        assert!(snapshot.entries[0].synced);
        assert_eq!(snapshot.entries[0].present_workers(), vec!["Ali"]);
        assert_eq!(snapshot.entries[0].absent_workers(), vec!["Bilal"]);
        assert_eq!(snapshot.workers, vec!["Ali"]);
    }
}
