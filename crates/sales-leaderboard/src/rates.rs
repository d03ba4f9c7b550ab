//! Exchange-rate fetching with a SQLite-backed snapshot cache

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use leaderboard_core::ExchangeRateTable;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::{Cache, RateSnapshot};
use crate::config::Config;
use crate::constants;

/// Where the rates for this run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Fetched,
    /// Fresh snapshot from the cache
    Cached,
    /// Old snapshot used because the API failed
    Stale,
}

impl std::fmt::Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateSource::Fetched => write!(f, "fetched"),
            RateSource::Cached => write!(f, "cached"),
            RateSource::Stale => write!(f, "stale cache"),
        }
    }
}

pub struct RatesClient {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RatesClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            url: config.rates_url.clone(),
            token: config.rates_token.clone(),
            client,
        })
    }

    /// Fetch the current rate table, retrying with a fixed delay
    pub async fn fetch(&self) -> Result<ExchangeRateTable> {
        let max_attempts = constants::RATE_FETCH_RETRIES + 1;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                sleep(Duration::from_millis(constants::RETRY_DELAY_MS)).await;
            }

            let mut request = self.client.get(&self.url).header("Accept", "application/json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ExchangeRateTable>().await {
                        Ok(rates) => return Ok(rates),
                        Err(e) => last_error = Some(anyhow::anyhow!("Parse error: {}", e)),
                    }
                }
                Ok(response) => {
                    last_error = Some(anyhow::anyhow!(
                        "Rate API returned status: {}",
                        response.status()
                    ));
                }
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Request failed: {}", e));
                }
            }

            if let Some(e) = &last_error {
                warn!(attempt = attempt + 1, max_attempts, "rate fetch failed: {}", e);
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed after {} attempts", max_attempts)))
    }
}

/// Whether a snapshot taken at `fetched_at` can still be reused at `now`
pub fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - fetched_at < ChronoDuration::seconds(constants::RATE_STALE_AFTER_SECS)
}

/// Rates for this run: a fresh cached snapshot if there is one, otherwise a
/// new fetch (stored back into the cache), otherwise the last snapshot no
/// matter how old. Fails only when nothing is available at all.
pub async fn load_rates(
    client: &RatesClient,
    cache: &Cache,
    use_cache: bool,
    now: DateTime<Utc>,
) -> Result<(ExchangeRateTable, RateSource)> {
    let cached = cache.latest_rates().await?;

    if use_cache {
        if let Some(snapshot) = &cached {
            if is_fresh(snapshot.fetched_at, now) {
                debug!(fetched_at = %snapshot.fetched_at, "using cached rates");
                return Ok((snapshot.rates.clone(), RateSource::Cached));
            }
        }
    }

    match client.fetch().await {
        Ok(rates) => {
            info!(currencies = rates.len(), "fetched exchange rates");
            cache
                .store_rates(&RateSnapshot {
                    rates: rates.clone(),
                    fetched_at: now,
                })
                .await?;
            Ok((rates, RateSource::Fetched))
        }
        Err(e) => match cached {
            Some(snapshot) => {
                warn!(
                    fetched_at = %snapshot.fetched_at,
                    "rate API unavailable, using stale rates: {:#}",
                    e
                );
                Ok((snapshot.rates, RateSource::Stale))
            }
            None => Err(e.context("Failed to fetch exchange rates and no cached rates available")),
        },
    }
}
