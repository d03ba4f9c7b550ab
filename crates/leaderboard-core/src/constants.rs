//! Labels and markers shared across the engine

/// Office label used when neither the contract nor the manager carries an office
pub const NO_OFFICE_LABEL: &str = "No office";

/// Manager name used for the current user when nothing better is known
pub const DEFAULT_USER_NAME: &str = "User";

/// Prefix reserved for manager ids in the month-rollover demo dataset
pub const PLACEHOLDER_PREFIX: &str = "mock-";

/// Number of days after the start of a month during which an empty
/// leaderboard is replaced with demo data
pub const ROLLOVER_DAYS: u32 = 3;

/// Size of the podium shown above the full table
pub const PODIUM_SIZE: usize = 3;
