//! Daily entry service
//!
//! Prices a day of work against the local mirror and stores the entry, its
//! earnings and the queued upload in one transaction. Works fully offline.

use crate::database::{
    AgreementName, DayType, EarningDraft, EntryDraft, Repository, Table,
};
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use crate::payroll::earnings::{compute_daily_earnings, leave_counts, red_flagged_workers, DayInput};
use crate::payroll::periods::agreement_year_start;
use crate::sync::{Mutation, MutationQueue, SyncEngine, SyncHandle};
use chrono::NaiveDate;

/// A day of work as entered by the user
#[derive(Debug, Clone)]
pub struct SubmitEntry {
    pub user_id: String,
    pub entry_date: NaiveDate,
    pub day_type: DayType,
    /// Required unless the day is a rest day
    pub tonnage: Option<f64>,
    pub wagons: i64,
    /// Roster workers who did not work; everyone else is present
    pub absent: Vec<String>,
}

#[derive(Debug)]
pub struct EntrySubmission {
    pub local_id: i64,
    pub earnings: Vec<EarningDraft>,
    /// Background upload started because the client was online
    pub sync: Option<SyncHandle>,
}

/// Service for recording daily entries
#[derive(Clone)]
pub struct DailyEntryService {
    repo: Repository,
    notifier: Notifier,
    engine: SyncEngine,
}

impl DailyEntryService {
    pub fn new(repo: Repository, notifier: Notifier, engine: SyncEngine) -> Self {
        Self {
            repo,
            notifier,
            engine,
        }
    }

    /// Price and store a day of work, replacing any entry for the same date.
    ///
    /// With no workers on the roster this fails with [`AppError::EmptyRoster`]
    /// and writes nothing to the mirror or the queue.
    pub async fn submit(&self, request: SubmitEntry) -> Result<EntrySubmission> {
        match self.store(request).await {
            Ok(submission) => Ok(submission),
            Err(e) => {
                self.notifier.report(&e);
                Err(e)
            }
        }
    }

    async fn store(&self, request: SubmitEntry) -> Result<EntrySubmission> {
        let SubmitEntry {
            user_id,
            entry_date,
            day_type,
            tonnage,
            wagons,
            absent,
        } = request;

        tracing::info!("Recording {} for {} on {}", day_type, user_id, entry_date);

        let roster: Vec<String> = self
            .repo
            .list_workers(&user_id)
            .await?
            .into_iter()
            .map(|w| w.worker_name)
            .collect();
        if roster.is_empty() {
            return Err(AppError::EmptyRoster);
        }

        let agreement = self.repo.get_agreement(&user_id, AgreementName::Current).await?;
        let settings = self.repo.get_settings(&user_id).await?;
        let (Some(agreement), Some(settings)) = (agreement, settings) else {
            return Err(AppError::missing_settings());
        };

        if let Some(unknown) = absent.iter().find(|name| !roster.contains(name)) {
            return Err(AppError::Generic(format!(
                "'{}' is not on the worker list",
                unknown
            )));
        }

        let (tonnage, wagons) = if day_type.is_rest() {
            (None, 0)
        } else {
            match tonnage {
                Some(t) if t >= 0.0 && t.is_finite() => {}
                Some(_) => return Err(AppError::Generic("Tonnage cannot be negative".to_string())),
                None => {
                    return Err(AppError::Generic(format!(
                        "Tonnage is required for a {}",
                        day_type
                    )))
                }
            }
            if wagons < 0 {
                return Err(AppError::Generic("Wagons cannot be negative".to_string()));
            }
            (tonnage, wagons)
        };

        // Roster order, absent workers removed
        let present: Vec<String> = roster
            .iter()
            .filter(|name| !absent.contains(name))
            .cloned()
            .collect();
        let absent: Vec<String> = roster
            .iter()
            .filter(|name| absent.contains(name))
            .cloned()
            .collect();

        let red_flagged = if settings.is_penalty_system_enabled && !absent.is_empty() && !present.is_empty() {
            let anchor = settings
                .agreement_start_date
                .ok_or_else(AppError::missing_start_date)?;
            let year_start = agreement_year_start(anchor, entry_date);

            match entry_date.pred_opt() {
                Some(day_before) if day_before >= year_start => {
                    let prior = self
                        .repo
                        .earnings_between(&user_id, year_start, day_before)
                        .await?;
                    let counts = leave_counts(
                        prior
                            .iter()
                            .map(|e| (e.worker_name.as_str(), e.attendance_status)),
                    );
                    red_flagged_workers(&absent, &counts, &agreement)
                }
                _ => red_flagged_workers(&absent, &Default::default(), &agreement),
            }
        } else {
            Vec::new()
        };

        if !red_flagged.is_empty() {
            tracing::info!("Red-flagged for {}: {}", entry_date, red_flagged.join(", "));
        }

        let earnings = compute_daily_earnings(
            &DayInput {
                day_type,
                tonnage,
                wagons,
                present: &present,
                absent: &absent,
                red_flagged: &red_flagged,
            },
            &agreement,
            &settings,
        );

        let entry = EntryDraft {
            user_id,
            entry_date,
            day_type,
            tonnage,
            wagons,
        };

        let mut tx = self
            .repo
            .begin(&[Table::DailyEntries, Table::DailyEarnings, Table::SyncQueue])
            .await?;
        let local_id = tx.replace_daily_entry(&entry, &earnings).await?;
        MutationQueue::enqueue(
            &mut tx,
            &Mutation::CreateDailyEntry {
                entry_local_id: local_id,
                entry,
                earnings: earnings.clone(),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Entry {} saved with {} earning records", local_id, earnings.len());

        let sync = self.engine.request_sync();
        if sync.is_some() {
            self.notifier.success("Entry saved locally. Sync will start shortly.");
        } else {
            self.notifier
                .success("Entry saved offline. It will upload when you are back online.");
        }

        Ok(EntrySubmission {
            local_id,
            earnings,
            sync,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory_repository, Agreement, AllowanceType, AttendanceStatus, UserSettings};
    use crate::notify::NoticeLevel;
    use crate::sync::{ConnectivityMonitor, MemoryRemote};
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn create_test_service(penalty: bool) -> (DailyEntryService, Repository) {
        let repo = memory_repository().await;
        let notifier = Notifier::new();
        let engine = SyncEngine::new(
            repo.clone(),
            Arc::new(MemoryRemote::new()),
            ConnectivityMonitor::new(false),
            notifier.clone(),
        );

        let mut settings = UserSettings::new("u1");
        settings.agreement_start_date = Some(date("2024-01-01"));
        settings.is_penalty_system_enabled = penalty;
        settings.penalty_amount = 20.0;

        let mut tx = repo
            .begin(&[Table::Workers, Table::Agreements, Table::Settings])
            .await
            .unwrap();
        tx.replace_workers("u1", &["Ali".to_string(), "Bilal".to_string(), "Chand".to_string()])
            .await
            .unwrap();
        tx.upsert_agreement(&Agreement {
            user_id: "u1".to_string(),
            agreement_name: AgreementName::Current,
            ton_rate: 100.0,
            rest_rate: 80.0,
            layoff_rate: 50.0,
            wagon_rate: 0.0,
            monthly_allowance: 3000.0,
            allowance_calculation_type: AllowanceType::Normal,
            paid_leaves: 1,
            without_paid_leaves: 0,
            paid_leave_rate: 0.0,
        })
        .await
        .unwrap();
        tx.upsert_settings(&settings).await.unwrap();
        tx.commit().await.unwrap();

        (DailyEntryService::new(repo.clone(), notifier, engine), repo)
    }

    fn work_day(day: &str, tonnage: f64, absent: &[&str]) -> SubmitEntry {
        SubmitEntry {
            user_id: "u1".to_string(),
            entry_date: date(day),
            day_type: DayType::WorkDay,
            tonnage: Some(tonnage),
            wagons: 0,
            absent: absent.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_submit_stores_entry_earnings_and_queue_row() {
        let (service, repo) = create_test_service(false).await;

        let submission = service.submit(work_day("2024-03-01", 3.0, &["Chand"])).await.unwrap();

        assert!(submission.sync.is_none());
        assert_eq!(submission.earnings.len(), 3);
        assert_eq!(submission.earnings[0].earning, 150.0);
        assert_eq!(submission.earnings[2].attendance_status, AttendanceStatus::Absent);

        let entry = repo.get_entry("u1", date("2024-03-01")).await.unwrap().unwrap();
        assert!(!entry.synced);
        assert_eq!(repo.earnings_for_entry(entry.local_id).await.unwrap().len(), 3);
        assert_eq!(MutationQueue::new(repo).pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resubmitting_a_date_replaces_the_entry() {
        let (service, repo) = create_test_service(false).await;

        service.submit(work_day("2024-03-01", 3.0, &[])).await.unwrap();
        service.submit(work_day("2024-03-01", 6.0, &["Bilal"])).await.unwrap();

        let entries = repo.list_entries("u1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tonnage, Some(6.0));
        assert_eq!(repo.earnings_for_entry(entries[0].local_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rest_day_drops_tonnage_and_wagons() {
        let (service, repo) = create_test_service(false).await;

        let mut request = work_day("2024-03-02", 9.0, &[]);
        request.day_type = DayType::RestDay;
        request.wagons = 4;
        service.submit(request).await.unwrap();

        let entry = repo.get_entry("u1", date("2024-03-02")).await.unwrap().unwrap();
        assert_eq!(entry.tonnage, None);
        assert_eq!(entry.wagons, 0);
    }

    #[tokio::test]
    async fn test_repeat_absence_is_red_flagged() {
        let (service, _repo) = create_test_service(true).await;

        // One leave allowed per year: the first absence is covered
        let first = service.submit(work_day("2024-03-01", 0.0, &["Chand"])).await.unwrap();
        assert_eq!(first.earnings[2].earning, 50.0);

        let second = service.submit(work_day("2024-03-02", 4.0, &["Chand"])).await.unwrap();
        assert_eq!(second.earnings[2].earning, 0.0);
        // 4 * 100 / 2 - 20 / 2
        assert_eq!(second.earnings[0].earning, 190.0);
    }

    #[tokio::test]
    async fn test_unknown_worker_and_missing_tonnage_rejected() {
        let (service, repo) = create_test_service(false).await;

        assert!(service.submit(work_day("2024-03-01", 1.0, &["Zed"])).await.is_err());

        let mut request = work_day("2024-03-01", 1.0, &[]);
        request.tonnage = None;
        assert!(service.submit(request).await.is_err());

        assert!(repo.list_entries("u1").await.unwrap().is_empty());
        assert_eq!(MutationQueue::new(repo).pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let (service, repo) = create_test_service(false).await;
        let mut tx = repo.begin(&[Table::Workers]).await.unwrap();
        tx.replace_workers("u1", &[]).await.unwrap();
        tx.commit().await.unwrap();

        let mut notices = service.notifier.subscribe();

        let result = service.submit(work_day("2024-03-01", 1.0, &[])).await;
        assert!(matches!(result, Err(AppError::EmptyRoster)));

        assert!(repo.list_entries("u1").await.unwrap().is_empty());
        assert_eq!(MutationQueue::new(repo).pending_count().await.unwrap(), 0);
        assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Info);
    }
}
