//! Session and remote endpoint commands

use crate::app::AppState;
use crate::database::Table;
use crate::error::Result;
use crate::services::{ClientConfigService, RemoteSettings};
use std::path::Path;

/// Save the session so later runs work offline, then pull the user's data
pub async fn login(
    data_dir: &Path,
    offline: bool,
    user_id: String,
    email: Option<String>,
    token: Option<String>,
) -> Result<()> {
    {
        let state = AppState::open(data_dir, true).await?;
        let mut tx = state.repo.begin(&[Table::OfflineSession]).await?;
        tx.save_session(&user_id, email.as_deref(), token.as_deref())
            .await?;
        tx.commit().await?;
    }

    tracing::info!("Session saved for {}", user_id);

    // Reopen so the remote store authenticates with the new token
    let state = AppState::open(data_dir, offline).await?;
    if !state.connectivity.is_online() {
        println!("Logged in as {} (offline). Data will be pulled at the next sync.", user_id);
        return Ok(());
    }

    if state.engine.full_resync(&user_id).await? {
        println!("Logged in as {}. Local data refreshed from the server.", user_id);
    } else {
        println!(
            "Logged in as {}. Local changes are still queued; run `sync` to upload them.",
            user_id
        );
    }
    Ok(())
}

pub async fn logout(state: &AppState) -> Result<()> {
    let mut tx = state.repo.begin(&[Table::OfflineSession]).await?;
    tx.clear_session().await?;
    tx.commit().await?;

    println!("Logged out.");
    Ok(())
}

pub async fn set_remote(data_dir: &Path, url: String, key: String) -> Result<()> {
    let service = ClientConfigService::new(data_dir);
    service
        .update_remote(RemoteSettings {
            base_url: Some(url),
            anon_key: Some(key),
        })
        .await?;

    println!("Remote store saved to {}", service.path().display());
    Ok(())
}
