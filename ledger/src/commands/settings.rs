//! Roster, agreement and settings commands

use super::finish_sync;
use crate::app::AppState;
use crate::cli::{AgreementAction, SettingsAction, WorkersAction};
use crate::database::{Agreement, AgreementName, UserSettings};
use crate::error::Result;
use crate::payroll::format_money;

// ===== Workers =====

pub async fn workers(state: &AppState, action: WorkersAction) -> Result<()> {
    let session = state.require_session().await?;

    match action {
        WorkersAction::Set { names } => {
            let handle = state.roster.save_workers(&session.user_id, names).await?;
            println!("Workers saved.");
            finish_sync(handle).await
        }
        WorkersAction::List => {
            let workers = state.roster.list_workers(&session.user_id).await?;
            if workers.is_empty() {
                println!("No workers yet. Add them with `workers set`.");
            }
            for (i, name) in workers.iter().enumerate() {
                println!("{:>3}. {}", i + 1, name);
            }
            Ok(())
        }
    }
}

// ===== Agreements =====

pub async fn agreement(state: &AppState, action: AgreementAction) -> Result<()> {
    let session = state.require_session().await?;

    match action {
        AgreementAction::Set { name, rates } => {
            let agreement = Agreement {
                user_id: session.user_id,
                agreement_name: name.into(),
                ton_rate: rates.ton_rate,
                rest_rate: rates.rest_rate,
                layoff_rate: rates.layoff_rate,
                wagon_rate: rates.wagon_rate,
                monthly_allowance: rates.monthly_allowance,
                allowance_calculation_type: rates.allowance.into(),
                paid_leaves: rates.paid_leaves,
                without_paid_leaves: rates.without_paid_leaves,
                paid_leave_rate: rates.paid_leave_rate,
            };
            let handle = state.roster.save_agreement(agreement).await?;
            println!("Agreement saved.");
            finish_sync(handle).await
        }
        AgreementAction::Show { name } => {
            let name: AgreementName = name.into();
            match state.roster.get_agreement(&session.user_id, name).await? {
                Some(a) => {
                    println!("{}", a.agreement_name);
                    println!("  Ton rate:          {}", format_money(a.ton_rate));
                    println!("  Rest rate:         {}", format_money(a.rest_rate));
                    println!("  Layoff rate:       {}", format_money(a.layoff_rate));
                    println!("  Wagon rate:        {}", format_money(a.wagon_rate));
                    println!(
                        "  Monthly allowance: {} ({:?})",
                        format_money(a.monthly_allowance),
                        a.allowance_calculation_type
                    );
                    println!(
                        "  Leaves:            {} paid, {} unpaid",
                        a.paid_leaves, a.without_paid_leaves
                    );
                    println!("  Paid leave rate:   {}", format_money(a.paid_leave_rate));
                }
                None => println!("{} has not been set up.", name),
            }
            Ok(())
        }
    }
}

// ===== Settings =====

pub async fn settings(state: &AppState, action: SettingsAction) -> Result<()> {
    let session = state.require_session().await?;
    let current = state
        .roster
        .get_settings(&session.user_id)
        .await?
        .unwrap_or_else(|| UserSettings::new(session.user_id.clone()));

    match action {
        SettingsAction::Set {
            start_date,
            wagons,
            penalty,
            penalty_amount,
        } => {
            let settings = UserSettings {
                agreement_start_date: start_date.or(current.agreement_start_date),
                is_wagon_system_enabled: wagons.unwrap_or(current.is_wagon_system_enabled),
                is_penalty_system_enabled: penalty.unwrap_or(current.is_penalty_system_enabled),
                penalty_amount: penalty_amount.unwrap_or(current.penalty_amount),
                ..current
            };
            let handle = state.roster.save_settings(settings).await?;
            println!("Settings saved.");
            finish_sync(handle).await
        }
        SettingsAction::Show => {
            println!(
                "Agreement start date: {}",
                current
                    .agreement_start_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "not set".to_string())
            );
            println!("Wagon system:         {}", current.is_wagon_system_enabled);
            println!("Penalty system:       {}", current.is_penalty_system_enabled);
            println!("Penalty amount:       {}", format_money(current.penalty_amount));
            Ok(())
        }
    }
}
