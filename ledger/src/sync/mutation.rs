//! Queued mutation kinds
//!
//! Each kind carries its own typed payload so the sync engine can dispatch
//! exhaustively. The serialized form is `{"type": ..., "data": {...}}`.

use crate::config::{
    MUTATION_CREATE_DAILY_ENTRY, MUTATION_REPLACE_WORKERS, MUTATION_UPSERT_AGREEMENT,
    MUTATION_UPSERT_SETTINGS,
};
use crate::database::{Agreement, EarningDraft, EntryDraft, UserSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Mutation {
    /// A daily entry and its earnings, saved locally as `entry_local_id`
    CreateDailyEntry {
        entry_local_id: i64,
        entry: EntryDraft,
        earnings: Vec<EarningDraft>,
    },
    ReplaceWorkers {
        user_id: String,
        workers: Vec<String>,
    },
    UpsertAgreement {
        agreement: Agreement,
    },
    UpsertSettings {
        settings: UserSettings,
    },
}

impl Mutation {
    /// Value of the queue's `type` column
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::CreateDailyEntry { .. } => MUTATION_CREATE_DAILY_ENTRY,
            Mutation::ReplaceWorkers { .. } => MUTATION_REPLACE_WORKERS,
            Mutation::UpsertAgreement { .. } => MUTATION_UPSERT_AGREEMENT,
            Mutation::UpsertSettings { .. } => MUTATION_UPSERT_SETTINGS,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Mutation::CreateDailyEntry { entry, .. } => &entry.user_id,
            Mutation::ReplaceWorkers { user_id, .. } => user_id,
            Mutation::UpsertAgreement { agreement } => &agreement.user_id,
            Mutation::UpsertSettings { settings } => &settings.user_id,
        }
    }

    /// Short human description used in notices
    pub fn describe(&self) -> String {
        match self {
            Mutation::CreateDailyEntry { entry, .. } => format!("entry for {}", entry.entry_date),
            Mutation::ReplaceWorkers { workers, .. } => format!("worker list ({} workers)", workers.len()),
            Mutation::UpsertAgreement { agreement } => format!("'{}'", agreement.agreement_name),
            Mutation::UpsertSettings { .. } => "settings".to_string(),
        }
    }
}
