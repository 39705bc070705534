//! Application state and initialization
//!
//! This module wires the local store, the remote store and the sync engine
//! together. All services are initialized here and made available through
//! AppState.

use crate::config::DATABASE_FILE_NAME;
use crate::database::{create_pool, OfflineSession, Repository};
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use crate::services::{
    ClientConfig, ClientConfigService, DailyEntryService, ReportsService, RosterService,
};
use crate::sync::{ConnectivityMonitor, MemoryRemote, RemoteStore, RestRemote, SyncEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the reachability probe points, when a remote is configured
#[derive(Clone)]
pub struct ProbeTarget {
    pub client: reqwest::Client,
    pub url: String,
}

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ClientConfig,
    pub config_service: ClientConfigService,
    pub repo: Repository,
    pub notifier: Notifier,
    pub connectivity: ConnectivityMonitor,
    pub engine: SyncEngine,
    pub entries: DailyEntryService,
    pub roster: RosterService,
    pub reports: ReportsService,
    pub probe: Option<ProbeTarget>,
}

impl AppState {
    /// Open the data directory and build every service.
    ///
    /// With `offline` set (or no remote configured) the client starts offline
    /// and never probes.
    pub async fn open(data_dir: &Path, offline: bool) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Data directory: {:?}", data_dir);

        std::fs::create_dir_all(data_dir)?;

        let config_service = ClientConfigService::new(data_dir);
        let config = config_service.load().await?;

        let pool = create_pool(&data_dir.join(DATABASE_FILE_NAME)).await?;
        let repo = Repository::new(pool);
        let session = repo.load_session().await?;

        let remote: Arc<dyn RemoteStore>;
        let mut probe = None;
        match (&config.remote.base_url, &config.remote.anon_key) {
            (Some(url), Some(key)) if config.remote.is_configured() => {
                let token = session.as_ref().and_then(|s| s.access_token.clone());
                let rest = RestRemote::new(url, key)?.with_access_token(token);
                probe = Some(ProbeTarget {
                    client: rest.client().clone(),
                    url: format!("{}/rest/v1/", rest.base_url()),
                });
                remote = Arc::new(rest);
            }
            _ => {
                tracing::warn!("No remote store configured, working offline against the local mirror");
                remote = Arc::new(MemoryRemote::new());
            }
        }

        let connectivity = ConnectivityMonitor::new(false);
        let probe = if offline { None } else { probe };
        if let Some(target) = &probe {
            connectivity.probe(&target.client, &target.url).await;
        }

        let notifier = Notifier::new();
        let engine = SyncEngine::new(
            repo.clone(),
            remote,
            connectivity.clone(),
            notifier.clone(),
        );

        let state = Self {
            data_dir: data_dir.to_path_buf(),
            entries: DailyEntryService::new(repo.clone(), notifier.clone(), engine.clone()),
            roster: RosterService::new(repo.clone(), notifier.clone(), engine.clone()),
            reports: ReportsService::new(repo.clone(), engine.clone()),
            config,
            config_service,
            repo,
            notifier,
            connectivity,
            engine,
            probe,
        };

        tracing::info!(
            "Application initialized ({})",
            if state.connectivity.is_online() {
                "online"
            } else {
                "offline"
            }
        );

        Ok(state)
    }

    /// Session saved by the last login
    pub async fn require_session(&self) -> Result<OfflineSession> {
        self.repo
            .load_session()
            .await?
            .ok_or_else(|| AppError::Configuration("Not logged in. Run `login` first.".to_string()))
    }
}
