//! CLI command handlers
//!
//! This module organizes commands into logical submodules:
//! - `session`: Login, logout and the remote endpoint
//! - `entries`: Recording days and the current period view
//! - `settings`: Roster, agreements and payroll settings
//! - `reports`: Pay periods and payroll reports
//! - `sync`: Manual and background sync
//!
//! Every handler takes the opened AppState and returns Result<(), AppError>.

pub mod entries;
pub mod reports;
pub mod session;
pub mod settings;
pub mod sync;

use crate::app::AppState;
use crate::cli::{Cli, Commands};
use crate::error::{AppError, Result};
use crate::sync::{SyncHandle, SyncReport};
use chrono::{Local, NaiveDate};

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        data_dir,
        offline,
        command,
    } = cli;

    // These manage the session or the endpoint themselves
    match command {
        Commands::Remote { url, key } => session::set_remote(&data_dir, url, key).await,
        Commands::Login {
            user_id,
            email,
            token,
        } => session::login(&data_dir, offline, user_id, email, token).await,
        command => {
            let state = AppState::open(&data_dir, offline).await?;
            dispatch(&state, command).await
        }
    }
}

async fn dispatch(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Logout => session::logout(state).await,
        Commands::Entry {
            date,
            day_type,
            tonnage,
            wagons,
            absent,
        } => entries::record(state, date, day_type, tonnage, wagons, absent).await,
        Commands::Workers { action } => settings::workers(state, action).await,
        Commands::Agreement { action } => settings::agreement(state, action).await,
        Commands::Settings { action } => settings::settings(state, action).await,
        Commands::Sync => sync::sync(state).await,
        Commands::Status => entries::status(state).await,
        Commands::Periods => reports::periods(state).await,
        Commands::Watch => sync::watch(state).await,
        Commands::Report { kind, remote } => reports::report(state, kind, remote).await,
        Commands::Remote { .. } | Commands::Login { .. } => Ok(()),
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Wait for a background pass started by a save, so a short-lived process
/// does not exit mid-upload
pub(crate) async fn finish_sync(handle: Option<SyncHandle>) -> Result<()> {
    let Some(handle) = handle else {
        return Ok(());
    };

    let report = handle
        .await
        .map_err(|e| AppError::Generic(format!("Sync task failed: {}", e)))??;
    print_sync_report(&report);
    Ok(())
}

pub(crate) fn print_sync_report(report: &SyncReport) {
    if report.skipped {
        println!("Sync skipped (offline or already running).");
        return;
    }

    println!("Uploaded {} queued change(s).", report.pushed);
    if let Some(id) = report.halted_on {
        println!("Stopped at queued change #{}; it will be retried.", id);
    }
    if report.pulled {
        println!("Local data refreshed from the server.");
    }
}
