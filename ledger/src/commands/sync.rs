//! Sync commands

use super::entries::print_summaries;
use super::print_sync_report;
use crate::app::AppState;
use crate::error::Result;
use crate::services::CurrentPeriodView;
use chrono::Local;

pub async fn sync(state: &AppState) -> Result<()> {
    let session = state.require_session().await?;

    let report = state.engine.sync_now().await?;
    print_sync_report(&report);

    // A pass with nothing queued uploads nothing and skips the pull
    let idle = !report.skipped && report.pushed == 0 && report.halted_on.is_none() && !report.pulled;
    if idle && state.engine.full_resync(&session.user_id).await? {
        println!("Local data refreshed from the server.");
    }
    Ok(())
}

/// Run until Ctrl-C: probe reachability, sync after reconnects and print the
/// current period whenever it changes
pub async fn watch(state: &AppState) -> Result<()> {
    let session = state.require_session().await?;

    let probe = match &state.probe {
        Some(target) if state.config.sync.probe_enabled => Some(state.connectivity.spawn_probe(
            target.client.clone(),
            target.url.clone(),
            state.config.sync.probe_interval(),
        )),
        _ => None,
    };
    let auto_sync = state.engine.spawn_auto_sync(state.config.sync.debounce());

    let view = CurrentPeriodView::spawn(state.repo.clone(), session.user_id.clone(), || {
        Local::now().date_naive()
    })
    .await?;
    let mut summaries = view.subscribe();
    let mut notices = state.notifier.subscribe();

    print_summaries(&view.current());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = summaries.changed() => {
                if changed.is_err() {
                    break;
                }
                let rows = summaries.borrow_and_update().clone();
                print_summaries(&rows);
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    println!("[{:?}] {}", notice.level, notice.message);
                }
            }
        }
    }

    tracing::info!("Stopping background sync");
    auto_sync.abort();
    if let Some(probe) = probe {
        probe.abort();
    }
    Ok(())
}
