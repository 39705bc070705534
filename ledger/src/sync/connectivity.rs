//! Connectivity monitor
//!
//! Holds the online/offline state on a watch channel. Platform events (or
//! the optional reachability probe) call [`ConnectivityMonitor::set_online`];
//! the sync engine subscribes to the transitions.

use super::remote::RemoteError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self {
            state: Arc::new(state),
        }
    }

    /// Record the current reachability. Only real transitions notify subscribers.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            if online {
                tracing::info!("Connectivity restored");
            } else {
                tracing::warn!("Connectivity lost, remote calls will fail fast");
            }
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(RemoteError::Offline)
        }
    }

    /// One reachability check against `url`. Any HTTP response counts as reachable.
    pub async fn probe(&self, client: &reqwest::Client, url: &str) -> bool {
        let reachable = match client.head(url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Reachability probe failed: {}", e);
                false
            }
        };

        self.set_online(reachable);
        reachable
    }

    /// Probe `url` every `interval` for hosts without platform connectivity events
    pub fn spawn_probe(&self, client: reqwest::Client, url: String, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();

        tokio::spawn(async move {
            tracing::info!("Starting reachability probe for {}", url);

            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                monitor.probe(&client, &url).await;
            }
        })
    }
}
