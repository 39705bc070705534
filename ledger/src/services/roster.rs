//! Roster, agreement and settings service
//!
//! Every save lands in the local mirror together with a queued upload.

use crate::database::{Agreement, AgreementName, Repository, Table, UserSettings};
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use crate::sync::{Mutation, MutationQueue, SyncEngine, SyncHandle};

/// Service for the per-user configuration that payroll depends on
#[derive(Clone)]
pub struct RosterService {
    repo: Repository,
    notifier: Notifier,
    engine: SyncEngine,
}

impl RosterService {
    pub fn new(repo: Repository, notifier: Notifier, engine: SyncEngine) -> Self {
        Self {
            repo,
            notifier,
            engine,
        }
    }

    /// Roster in insertion order
    pub async fn list_workers(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .repo
            .list_workers(user_id)
            .await?
            .into_iter()
            .map(|w| w.worker_name)
            .collect())
    }

    /// Replace the whole roster
    pub async fn save_workers(&self, user_id: &str, names: Vec<String>) -> Result<Option<SyncHandle>> {
        let mut workers: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(self.reject("Worker names cannot be empty"));
            }
            if workers.contains(&name) {
                return Err(self.reject(format!("'{}' is listed twice", name)));
            }
            workers.push(name);
        }

        tracing::info!("Saving {} workers for {}", workers.len(), user_id);

        let mutation = Mutation::ReplaceWorkers {
            user_id: user_id.to_string(),
            workers,
        };
        self.persist(&[Table::Workers, Table::SyncQueue], mutation, "Workers saved.")
            .await
    }

    pub async fn get_agreement(&self, user_id: &str, name: AgreementName) -> Result<Option<Agreement>> {
        self.repo.get_agreement(user_id, name).await
    }

    pub async fn save_agreement(&self, agreement: Agreement) -> Result<Option<SyncHandle>> {
        let rates = [
            agreement.ton_rate,
            agreement.rest_rate,
            agreement.layoff_rate,
            agreement.wagon_rate,
            agreement.monthly_allowance,
            agreement.paid_leave_rate,
        ];
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0)
            || agreement.paid_leaves < 0
            || agreement.without_paid_leaves < 0
        {
            return Err(self.reject("Agreement rates and leave days cannot be negative"));
        }

        tracing::info!("Saving '{}' for {}", agreement.agreement_name, agreement.user_id);

        let message = format!("{} saved.", agreement.agreement_name);
        self.persist(
            &[Table::Agreements, Table::SyncQueue],
            Mutation::UpsertAgreement { agreement },
            &message,
        )
        .await
    }

    pub async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        self.repo.get_settings(user_id).await
    }

    pub async fn save_settings(&self, settings: UserSettings) -> Result<Option<SyncHandle>> {
        if !settings.penalty_amount.is_finite() || settings.penalty_amount < 0.0 {
            return Err(self.reject("Penalty amount cannot be negative"));
        }

        tracing::info!("Saving settings for {}", settings.user_id);

        self.persist(
            &[Table::Settings, Table::SyncQueue],
            Mutation::UpsertSettings { settings },
            "Settings saved.",
        )
        .await
    }

    /// Invalid input, surfaced to the user like any failed save
    fn reject(&self, message: impl Into<String>) -> AppError {
        let err = AppError::Generic(message.into());
        self.notifier.report(&err);
        err
    }

    /// Apply `mutation` locally and queue it, in one transaction
    async fn persist(
        &self,
        tables: &[Table],
        mutation: Mutation,
        message: &str,
    ) -> Result<Option<SyncHandle>> {
        let result = async {
            let mut tx = self.repo.begin(tables).await?;
            match &mutation {
                Mutation::ReplaceWorkers { user_id, workers } => {
                    tx.replace_workers(user_id, workers).await?
                }
                Mutation::UpsertAgreement { agreement } => tx.upsert_agreement(agreement).await?,
                Mutation::UpsertSettings { settings } => tx.upsert_settings(settings).await?,
                Mutation::CreateDailyEntry { .. } => {
                    return Err(AppError::Generic(
                        "Daily entries are recorded through the entry service".to_string(),
                    ))
                }
            }
            MutationQueue::enqueue(&mut tx, &mutation).await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = result {
            self.notifier.report(&e);
            return Err(e);
        }

        self.notifier.success(message);
        Ok(self.engine.request_sync())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory_repository, AllowanceType};
    use crate::notify::NoticeLevel;
    use crate::sync::{ConnectivityMonitor, MemoryRemote};
    use std::sync::Arc;

    async fn create_test_service() -> (RosterService, Repository) {
        let repo = memory_repository().await;
        let notifier = Notifier::new();
        let engine = SyncEngine::new(
            repo.clone(),
            Arc::new(MemoryRemote::new()),
            ConnectivityMonitor::new(false),
            notifier.clone(),
        );
        (RosterService::new(repo.clone(), notifier, engine), repo)
    }

    #[tokio::test]
    async fn test_save_workers_replaces_roster_and_queues() {
        let (service, repo) = create_test_service().await;

        service
            .save_workers("u1", vec!["Ali".to_string(), "Bilal".to_string()])
            .await
            .unwrap();
        service
            .save_workers("u1", vec![" Chand ".to_string(), "Ali".to_string()])
            .await
            .unwrap();

        assert_eq!(service.list_workers("u1").await.unwrap(), vec!["Chand", "Ali"]);

        let queued = MutationQueue::new(repo).list().await.unwrap();
        assert_eq!(queued.len(), 2);
        assert!(matches!(
            &queued[1].mutation,
            Mutation::ReplaceWorkers { workers, .. } if workers == &vec!["Chand".to_string(), "Ali".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_duplicate_worker_rejected() {
        let (service, repo) = create_test_service().await;
        let mut notices = service.notifier.subscribe();

        let result = service
            .save_workers("u1", vec!["Ali".to_string(), "Ali".to_string()])
            .await;

        assert!(result.is_err());
        assert_eq!(MutationQueue::new(repo).pending_count().await.unwrap(), 0);

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "'Ali' is listed twice");
    }

    #[tokio::test]
    async fn test_save_agreement_and_settings() {
        let (service, repo) = create_test_service().await;

        let agreement = Agreement {
            user_id: "u1".to_string(),
            agreement_name: AgreementName::New,
            ton_rate: 120.0,
            rest_rate: 90.0,
            layoff_rate: 60.0,
            wagon_rate: 10.0,
            monthly_allowance: 3500.0,
            allowance_calculation_type: AllowanceType::ProRata,
            paid_leaves: 14,
            without_paid_leaves: 4,
            paid_leave_rate: 120.0,
        };
        service.save_agreement(agreement.clone()).await.unwrap();

        let mut settings = UserSettings::new("u1");
        settings.is_wagon_system_enabled = true;
        service.save_settings(settings.clone()).await.unwrap();

        assert_eq!(
            service.get_agreement("u1", AgreementName::New).await.unwrap(),
            Some(agreement)
        );
        assert_eq!(service.get_settings("u1").await.unwrap(), Some(settings));
        assert_eq!(MutationQueue::new(repo).pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_negative_rate_rejected() {
        let (service, _repo) = create_test_service().await;
        let mut notices = service.notifier.subscribe();

        let mut settings = UserSettings::new("u1");
        settings.penalty_amount = -1.0;
        assert!(service.save_settings(settings).await.is_err());
        assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);
    }
}
