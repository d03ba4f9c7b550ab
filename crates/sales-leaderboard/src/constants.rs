//! Centralized constants for the sales leaderboard
//!
//! Deployment-specific values (record store URL, rate API token) are loaded
//! from config.toml.

// =============================================================================
// Record Store (PocketBase)
// =============================================================================

/// Collection holding sales contracts
pub const CONTRACTS_COLLECTION: &str = "contracts";

/// Collection holding managers
pub const USERS_COLLECTION: &str = "users";

/// Relations expanded on every contract fetch
pub const CONTRACT_EXPAND: &str = "office,created_by,created_by.office";

/// Relations expanded on per-user contract fetches
pub const USER_CONTRACT_EXPAND: &str = "created_by,created_by.office";

/// Page size for contract listings
pub const CONTRACTS_PER_PAGE: u32 = 1000;

/// Page size for nickname lookups
pub const USER_SEARCH_PER_PAGE: u32 = 50;

/// Retries after the first failed contract fetch
pub const CONTRACT_FETCH_RETRIES: u32 = 1;

// =============================================================================
// Exchange Rates
// =============================================================================

/// Retries after the first failed rate fetch
pub const RATE_FETCH_RETRIES: u32 = 2;

/// A cached rate snapshot younger than this is reused (30 minutes)
pub const RATE_STALE_AFTER_SECS: i64 = 30 * 60;

// =============================================================================
// Shared Network Settings
// =============================================================================

/// Delay between retries (ms)
pub const RETRY_DELAY_MS: u64 = 2000;

/// Per-request timeout (s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Identity
// =============================================================================

/// Prefix for guest identities created when a nickname is not found
pub const GUEST_ID_PREFIX: &str = "temp-";

// =============================================================================
// File Names
// =============================================================================

/// Cache database filename
pub const CACHE_FILENAME: &str = "cache.sqlite";

/// Default config file path
pub const CONFIG_FILENAME: &str = "config.toml";

/// Leaderboard export filename stem (month key and extension appended)
pub const EXPORT_FILENAME_STEM: &str = "leaderboard";
