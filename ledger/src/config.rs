//! Application configuration constants
//!
//! Central location for the constants used by the store, the sync engine
//! and the payroll rules.

// ===== Agreements =====

/// Agreement in force since the agreement start date
pub const CURRENT_AGREEMENT: &str = "Current Agreement";
/// Agreement used for later agreement years and for arrears
pub const NEW_AGREEMENT: &str = "New Agreement";

// ===== Payroll Rules =====

/// Divisor used to turn a monthly allowance into a daily one for pro-rata periods
pub const PRO_RATA_DAYS_PER_MONTH: f64 = 30.0;

/// Last day of the first half-month pay period
pub const HALF_MONTH_LAST_DAY: u32 = 15;

/// Multiplier applied to the layoff rate to get the special overtime guarantee
pub const SPECIAL_OVERTIME_GUARANTEE_FACTOR: f64 = 3.0;

// ===== Sync =====

/// Default delay between going online and the automatic sync pass.
/// Absorbs flapping connectivity.
pub const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 1_000;

/// Rows requested per remote select page
pub const REMOTE_PAGE_SIZE: usize = 1_000;

/// Default interval for the reachability probe in seconds
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Mutation type tag for daily entry submissions
pub const MUTATION_CREATE_DAILY_ENTRY: &str = "create_daily_entry";
/// Mutation type tag for roster replacement
pub const MUTATION_REPLACE_WORKERS: &str = "replace_workers";
/// Mutation type tag for agreement saves
pub const MUTATION_UPSERT_AGREEMENT: &str = "upsert_agreement";
/// Mutation type tag for settings saves
pub const MUTATION_UPSERT_SETTINGS: &str = "upsert_settings";

// ===== Channels =====

/// Capacity of the table change broadcast channel
pub const CHANGE_FEED_CAPACITY: usize = 64;

/// Capacity of the user notification broadcast channel
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

// ===== Storage =====

/// Connections in the application pool; the sync engine and the live view
/// read while a service write is open
pub const DATABASE_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database
pub const DATABASE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Local database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "ledger.db";

/// Client configuration file name inside the data directory
pub const CLIENT_CONFIG_FILE_NAME: &str = "client.json";

/// Default tracing filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "tonnage_ledger=debug,info";
