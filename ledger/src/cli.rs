//! Command-line interface definition

use crate::database::{AgreementName, AllowanceType, DayType};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Offline-first payroll ledger for tonnage crews
#[derive(Parser)]
#[command(
    name = "tonnage-ledger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Record daily tonnage work offline, sync it when online and run payroll reports",
    long_about = None
)]
pub struct Cli {
    /// Directory holding the local database and client config
    #[arg(global = true, long = "data-dir", default_value = ".tonnage-ledger")]
    pub data_dir: PathBuf,

    /// Do not contact the remote store
    #[arg(global = true, long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save the session for offline use and pull the remote data
    Login {
        #[arg(long = "user-id")]
        user_id: String,
        #[arg(long)]
        email: Option<String>,
        /// Access token issued by the remote store
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the saved session
    Logout,

    /// Configure the remote store endpoint
    Remote {
        #[arg(long)]
        url: String,
        /// Public API key
        #[arg(long)]
        key: String,
    },

    /// Record the work of one day
    Entry {
        /// Date of the work (YYYY-MM-DD)
        date: NaiveDate,

        /// work, rest or overtime
        #[arg(long = "day-type", default_value = "work")]
        day_type: DayType,

        #[arg(long)]
        tonnage: Option<f64>,

        #[arg(long, default_value_t = 0)]
        wagons: i64,

        /// Absent worker; repeat for several
        #[arg(long)]
        absent: Vec<String>,
    },

    /// Manage the worker roster
    Workers {
        #[command(subcommand)]
        action: WorkersAction,
    },

    /// Manage agreement rates
    Agreement {
        #[command(subcommand)]
        action: AgreementAction,
    },

    /// Manage payroll settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Upload queued changes and refresh the local mirror
    Sync,

    /// Show connectivity, queue and current period state
    Status,

    /// List pay periods and agreement years
    Periods,

    /// Keep syncing in the background and print the current period as it changes
    Watch,

    /// Payroll reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,

        /// Read straight from the remote store instead of the local mirror
        #[arg(global = true, long)]
        remote: bool,
    },
}

#[derive(Subcommand)]
pub enum WorkersAction {
    /// Replace the roster
    Set { names: Vec<String> },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AgreementArg {
    Current,
    New,
}

impl From<AgreementArg> for AgreementName {
    fn from(arg: AgreementArg) -> Self {
        match arg {
            AgreementArg::Current => AgreementName::Current,
            AgreementArg::New => AgreementName::New,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AllowanceArg {
    Normal,
    ProRata,
}

impl From<AllowanceArg> for AllowanceType {
    fn from(arg: AllowanceArg) -> Self {
        match arg {
            AllowanceArg::Normal => AllowanceType::Normal,
            AllowanceArg::ProRata => AllowanceType::ProRata,
        }
    }
}

#[derive(Args)]
pub struct AgreementRates {
    #[arg(long = "ton-rate")]
    pub ton_rate: f64,
    #[arg(long = "rest-rate")]
    pub rest_rate: f64,
    #[arg(long = "layoff-rate")]
    pub layoff_rate: f64,
    #[arg(long = "wagon-rate", default_value_t = 0.0)]
    pub wagon_rate: f64,
    #[arg(long = "monthly-allowance", default_value_t = 0.0)]
    pub monthly_allowance: f64,
    #[arg(long, value_enum, default_value = "normal")]
    pub allowance: AllowanceArg,
    #[arg(long = "paid-leaves", default_value_t = 0)]
    pub paid_leaves: i64,
    #[arg(long = "unpaid-leaves", default_value_t = 0)]
    pub without_paid_leaves: i64,
    #[arg(long = "paid-leave-rate", default_value_t = 0.0)]
    pub paid_leave_rate: f64,
}

#[derive(Subcommand)]
pub enum AgreementAction {
    Set {
        #[arg(value_enum)]
        name: AgreementArg,
        #[command(flatten)]
        rates: AgreementRates,
    },
    Show {
        #[arg(value_enum)]
        name: AgreementArg,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    Set {
        /// First day of the first agreement year (YYYY-MM-DD)
        #[arg(long = "start-date")]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        wagons: Option<bool>,
        #[arg(long)]
        penalty: Option<bool>,
        #[arg(long = "penalty-amount")]
        penalty_amount: Option<f64>,
    },
    Show,
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// Salary for one pay period
    Salary {
        /// Pay period, 0 being the current one
        #[arg(long, default_value_t = 0)]
        period: usize,
    },
    /// Leave balances for one agreement year
    Leaves {
        /// Agreement year, 0 being the current one
        #[arg(long, default_value_t = 0)]
        year: usize,
    },
    /// Annual bonus package for one agreement year
    Bonus {
        #[arg(long, default_value_t = 0)]
        year: usize,
    },
    /// Difference between the new and current agreements
    Arrears {
        /// Defaults to today
        #[arg(long = "as-of")]
        as_of: Option<NaiveDate>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_arguments() {
        let cli = Cli::try_parse_from([
            "tonnage-ledger",
            "entry",
            "2024-03-01",
            "--day-type",
            "overtime",
            "--tonnage",
            "4.5",
            "--absent",
            "Ali",
            "--absent",
            "Bilal",
        ])
        .unwrap();

        match cli.command {
            Commands::Entry {
                date,
                day_type,
                tonnage,
                absent,
                ..
            } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
                assert_eq!(day_type, DayType::SpecialOvertime);
                assert_eq!(tonnage, Some(4.5));
                assert_eq!(absent, vec!["Ali", "Bilal"]);
            }
            _ => panic!("expected entry command"),
        }
        assert_eq!(cli.data_dir, PathBuf::from(".tonnage-ledger"));
    }

    #[test]
    fn test_report_remote_flag() {
        let cli = Cli::try_parse_from(["tonnage-ledger", "--offline", "report", "salary", "--remote"])
            .unwrap();

        assert!(cli.offline);
        assert!(matches!(
            cli.command,
            Commands::Report {
                kind: ReportKind::Salary { period: 0 },
                remote: true
            }
        ));
    }
}
