//! Reports service
//!
//! Loads a payroll snapshot from the local mirror (the default) or straight
//! from the remote store and runs the report functions on it.

use crate::database::Repository;
use crate::error::Result;
use crate::payroll::{
    self, agreement_years, pay_periods, AgreementYear, ArrearsReport, BonusReport, LeavesReport,
    PayPeriod, PayrollSnapshot, SalaryReport,
};
use crate::sync::{RemoteSnapshot, SyncEngine};
use chrono::NaiveDate;

/// Where report data is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportSource {
    #[default]
    Local,
    /// Requires connectivity
    Remote,
}

#[derive(Clone)]
pub struct ReportsService {
    repo: Repository,
    engine: SyncEngine,
}

impl ReportsService {
    pub fn new(repo: Repository, engine: SyncEngine) -> Self {
        Self { repo, engine }
    }

    pub async fn snapshot(&self, user_id: &str, source: ReportSource) -> Result<PayrollSnapshot> {
        match source {
            ReportSource::Local => PayrollSnapshot::load(&self.repo, user_id).await,
            ReportSource::Remote => {
                let remote = RemoteSnapshot::fetch(self.engine.remote(), user_id).await?;
                Ok(PayrollSnapshot::from(remote))
            }
        }
    }

    /// Pay periods up to `today`, newest first
    pub async fn pay_periods(&self, user_id: &str, today: NaiveDate) -> Result<Vec<PayPeriod>> {
        let snapshot = PayrollSnapshot::load(&self.repo, user_id).await?;
        let mut periods = pay_periods(snapshot.anchor()?, today);
        periods.reverse();
        Ok(periods)
    }

    /// Agreement years started before `today`, newest first
    pub async fn agreement_years(&self, user_id: &str, today: NaiveDate) -> Result<Vec<AgreementYear>> {
        let snapshot = PayrollSnapshot::load(&self.repo, user_id).await?;
        let mut years = agreement_years(snapshot.anchor()?, today);
        years.reverse();
        Ok(years)
    }

    pub async fn salary(
        &self,
        user_id: &str,
        period: PayPeriod,
        source: ReportSource,
    ) -> Result<SalaryReport> {
        let snapshot = self.snapshot(user_id, source).await?;
        payroll::salary_report(&snapshot, period)
    }

    pub async fn leaves(
        &self,
        user_id: &str,
        year: AgreementYear,
        source: ReportSource,
    ) -> Result<LeavesReport> {
        let snapshot = self.snapshot(user_id, source).await?;
        payroll::leaves_report(&snapshot, year)
    }

    pub async fn bonus(
        &self,
        user_id: &str,
        year: AgreementYear,
        source: ReportSource,
    ) -> Result<BonusReport> {
        let snapshot = self.snapshot(user_id, source).await?;
        payroll::bonus_report(&snapshot, year)
    }

    /// Arrears for every day before `as_of`
    pub async fn arrears(
        &self,
        user_id: &str,
        as_of: NaiveDate,
        source: ReportSource,
    ) -> Result<ArrearsReport> {
        let snapshot = self.snapshot(user_id, source).await?;
        payroll::arrears_report(&snapshot, as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory_repository, Table, UserSettings};
    use crate::error::AppError;
    use crate::notify::Notifier;
    use crate::sync::{ConnectivityMonitor, MemoryRemote};
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn create_test_service(online: bool) -> (ReportsService, Repository) {
        let repo = memory_repository().await;
        let engine = SyncEngine::new(
            repo.clone(),
            Arc::new(MemoryRemote::new()),
            ConnectivityMonitor::new(online),
            Notifier::new(),
        );
        (ReportsService::new(repo.clone(), engine), repo)
    }

    #[tokio::test]
    async fn test_periods_need_start_date() {
        let (service, _repo) = create_test_service(false).await;

        let result = service.pay_periods("u1", date("2024-03-20")).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_periods_newest_first() {
        let (service, repo) = create_test_service(false).await;

        let mut settings = UserSettings::new("u1");
        settings.agreement_start_date = Some(date("2024-03-01"));
        let mut tx = repo.begin(&[Table::Settings]).await.unwrap();
        tx.upsert_settings(&settings).await.unwrap();
        tx.commit().await.unwrap();

        let periods = service.pay_periods("u1", date("2024-03-20")).await.unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].start, date("2024-03-16"));

        let years = service.agreement_years("u1", date("2024-03-20")).await.unwrap();
        assert_eq!(years.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_source_fails_fast_offline() {
        let (service, _repo) = create_test_service(false).await;

        let result = service.snapshot("u1", ReportSource::Remote).await;
        assert!(matches!(result, Err(AppError::Offline)));
    }
}
