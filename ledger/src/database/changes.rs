//! Table change notifications
//!
//! Committed transactions publish one [`TableChange`] per table they wrote.
//! Derived views subscribe and recompute instead of polling.

use std::fmt;

/// Local tables that can be written inside a store transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    DailyEntries,
    DailyEarnings,
    SyncQueue,
    Agreements,
    Workers,
    Settings,
    Profiles,
    OfflineSession,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::DailyEntries => "daily_entries",
            Table::DailyEarnings => "daily_earnings",
            Table::SyncQueue => "sync_queue",
            Table::Agreements => "agreements",
            Table::Workers => "workers",
            Table::Settings => "settings",
            Table::Profiles => "profiles",
            Table::OfflineSession => "offline_session",
        }
    }

    /// Every table mirrored from the remote store
    pub const MIRRORED: [Table; 6] = [
        Table::DailyEntries,
        Table::DailyEarnings,
        Table::Agreements,
        Table::Workers,
        Table::Settings,
        Table::Profiles,
    ];
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Published after a commit that wrote to `table`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    pub table: Table,
}
