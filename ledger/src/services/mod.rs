//! Services module
//!
//! Business logic services that coordinate between the CLI, the local
//! mirror and the sync engine.

pub mod client_config;
pub mod entries;
pub mod live;
pub mod reports;
pub mod roster;

pub use client_config::{ClientConfig, ClientConfigService, RemoteSettings, SyncSettings};
pub use entries::{DailyEntryService, EntrySubmission, SubmitEntry};
pub use live::{current_period_summaries, CurrentPeriodView, EntrySummary};
pub use reports::{ReportSource, ReportsService};
pub use roster::RosterService;
