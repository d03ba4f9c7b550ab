//! Configuration for the sales leaderboard

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub pocketbase: PocketBaseConfig,
    pub rates: RatesConfig,
    #[serde(default)]
    pub leaderboard: Option<LeaderboardConfig>,
}

/// Record store connection
#[derive(Debug, Deserialize)]
pub struct PocketBaseConfig {
    /// Base URL, e.g. "https://crm.example.com"
    pub url: String,
    /// Service account login (optional - anonymous access otherwise)
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Exchange-rate provider
#[derive(Debug, Deserialize)]
pub struct RatesConfig {
    pub url: String,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
}

/// Leaderboard defaults
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardConfig {
    /// Restrict the leaderboard to one office id
    #[serde(default)]
    pub office: Option<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| {
            "Failed to parse config.toml. Check for:\n\
             - Missing required fields (pocketbase.url, rates.url)\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - Incorrect data types (strings vs numbers)\n\n\
             See config.toml.example for the expected format."
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Values supplied on the command line or through the environment that take
/// precedence over config.toml
#[derive(Debug, Default)]
pub struct Overrides {
    pub pocketbase_url: Option<String>,
    pub pocketbase_password: Option<String>,
    pub rates_token: Option<String>,
    pub office: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Record store base URL without trailing slash
    pub pocketbase_url: String,
    /// Service account credentials, when both halves are present
    pub pocketbase_credentials: Option<(String, String)>,
    pub rates_url: String,
    pub rates_token: Option<String>,
    /// Office id filter for the main leaderboard fetch
    pub office_filter: Option<String>,
}

impl Config {
    pub fn from_file(file_config: &FileConfig, overrides: Overrides) -> Result<Self> {
        let pocketbase_url = overrides
            .pocketbase_url
            .unwrap_or_else(|| file_config.pocketbase.url.clone())
            .trim_end_matches('/')
            .to_string();

        if pocketbase_url.is_empty() {
            anyhow::bail!("pocketbase.url must not be empty");
        }
        if file_config.rates.url.is_empty() {
            anyhow::bail!("rates.url must not be empty");
        }

        let password = overrides
            .pocketbase_password
            .or_else(|| file_config.pocketbase.password.clone());
        let pocketbase_credentials = file_config.pocketbase.identity.clone().zip(password);

        let office_filter = overrides
            .office
            .or_else(|| file_config.leaderboard.as_ref().and_then(|l| l.office.clone()))
            .filter(|office| !office.is_empty());

        Ok(Self {
            pocketbase_url,
            pocketbase_credentials,
            rates_url: file_config.rates.url.clone(),
            rates_token: overrides
                .rates_token
                .or_else(|| file_config.rates.token.clone()),
            office_filter,
        })
    }
}
