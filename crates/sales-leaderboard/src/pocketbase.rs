//! PocketBase record store client
//!
//! Fetches contracts (with their office and creator relations expanded) and
//! looks managers up by nickname. Records are converted into the engine's
//! [`Contract`] type right at the boundary.
//!
//! API docs: https://pocketbase.io/docs/api-records/

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use leaderboard_core::{Contract, Creator, MonthWindow};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants;

#[derive(Debug, thiserror::Error)]
pub enum PocketBaseError {
    #[error("authentication failed for '{identity}': {status}")]
    Auth { identity: String, status: StatusCode },

    #[error("{collection} request returned {status}: {body}")]
    Status {
        collection: String,
        status: StatusCode,
        body: String,
    },
}

// =============================================================================
// API Types
// =============================================================================

/// Paginated list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    page: u32,
    total_pages: u32,
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfficeRecord {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserExpand {
    #[serde(default)]
    pub office: Option<OfficeRecord>,
}

/// Manager record from the `users` collection
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Office id
    #[serde(default)]
    pub office: String,
    #[serde(default)]
    pub expand: Option<UserExpand>,
}

impl UserRecord {
    pub fn office_name(&self) -> Option<&str> {
        self.expand
            .as_ref()
            .and_then(|e| e.office.as_ref())
            .map(|o| o.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContractExpand {
    #[serde(default)]
    office: Option<OfficeRecord>,
    #[serde(default)]
    created_by: Option<UserRecord>,
    /// Some PocketBase versions return nested expands flattened under the
    /// dotted key instead of inside `created_by.expand`
    #[serde(default, rename = "created_by.office")]
    created_by_office: Option<OfficeRecord>,
}

/// Record from the `contracts` collection
#[derive(Debug, Deserialize)]
struct ContractRecord {
    id: String,
    #[serde(default)]
    office: String,
    #[serde(default)]
    created_by: String,
    #[serde(default)]
    brutto_price: Option<f64>,
    #[serde(default)]
    netto_price: Option<f64>,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    created: String,
    #[serde(default)]
    expand: Option<ContractExpand>,
}

impl From<ContractRecord> for Contract {
    fn from(record: ContractRecord) -> Self {
        let expand = record.expand.unwrap_or_default();

        let creator = expand.created_by.map(|user| Creator {
            office_name: user.office_name().map(str::to_string),
            name: user.name,
        });

        Contract {
            id: record.id,
            office_id: record.office,
            office_name: expand.office.map(|o| o.name),
            creator_id: record.created_by,
            creator,
            creator_office_name: expand.created_by_office.map(|o| o.name),
            gross_price: record.brutto_price,
            net_price: record.netto_price,
            currency: record.currency,
            is_deleted: record.is_deleted,
            created_at: record.created,
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Quote a value for use inside a PocketBase filter string literal
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Filter for non-deleted contracts created inside `window`, optionally
/// restricted to one office and/or one creator. `tz` is the timezone the
/// window's wall-clock bounds are expressed in.
pub fn contracts_filter<Tz: TimeZone>(
    window: &MonthWindow,
    tz: &Tz,
    office: Option<&str>,
    creator: Option<&str>,
) -> String {
    let (start, end) = window.record_store_bounds(tz);
    let mut filter = format!(
        "created >= {} && created <= {} && is_deleted = false",
        quote(&start),
        quote(&end)
    );

    if let Some(office) = office {
        filter.push_str(&format!(" && office = {}", quote(office)));
    }
    if let Some(creator) = creator {
        filter.push_str(&format!(" && created_by = {}", quote(creator)));
    }

    filter
}

/// Pick the best match from a nickname search: case-insensitive exact name
/// match first, otherwise the first result
fn best_match(users: Vec<UserRecord>, nickname: &str) -> Option<UserRecord> {
    let wanted = nickname.to_lowercase();
    let exact = users.iter().position(|u| u.name.to_lowercase() == wanted);

    let mut users = users;
    match exact {
        Some(idx) => Some(users.swap_remove(idx)),
        None => users.into_iter().next(),
    }
}

// =============================================================================
// PocketBase Client
// =============================================================================

pub struct PocketBaseClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl PocketBaseClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    /// Create a client and log in with the service account if one is configured
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut client = Self::new(&config.pocketbase_url)?;
        if let Some((identity, password)) = &config.pocketbase_credentials {
            client.authenticate(identity, password).await?;
        }
        Ok(client)
    }

    pub async fn authenticate(&mut self, identity: &str, password: &str) -> Result<()> {
        let url = format!(
            "{}/api/collections/{}/auth-with-password",
            self.base_url,
            constants::USERS_COLLECTION
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "identity": identity, "password": password }))
            .send()
            .await
            .context("Failed to reach PocketBase")?;

        if !response.status().is_success() {
            return Err(PocketBaseError::Auth {
                identity: identity.to_string(),
                status: response.status(),
            }
            .into());
        }

        let auth: AuthResponse = response
            .json()
            .await
            .context("Failed to parse PocketBase auth response")?;
        self.token = Some(auth.token);
        debug!(identity, "authenticated with PocketBase");

        Ok(())
    }

    fn records_url(&self, collection: &str, params: &[(&str, String)]) -> Result<Url> {
        let base = format!("{}/api/collections/{}/records", self.base_url, collection);
        Url::parse_with_params(&base, params)
            .with_context(|| format!("Invalid PocketBase URL: {}", base))
    }

    /// GET a URL once, turning non-2xx responses into [`PocketBaseError::Status`]
    async fn get_json<T: DeserializeOwned>(&self, collection: &str, url: &Url) -> Result<T> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.header("Authorization", token);
        }

        let response = request.send().await.context("Request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PocketBaseError::Status {
                collection: collection.to_string(),
                status,
                body,
            }
            .into());
        }

        response.json::<T>().await.context("Failed to parse PocketBase response")
    }

    /// GET with a fixed delay between attempts
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        collection: &str,
        url: &Url,
        retries: u32,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_json(collection, url).await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!(collection, attempt, "PocketBase request failed, retrying: {:#}", e);
                    sleep(Duration::from_millis(constants::RETRY_DELAY_MS)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch every page of contracts matching `filter`
    async fn list_contracts(&self, filter: &str, expand: &str, sort: Option<&str>) -> Result<Vec<Contract>> {
        let mut contracts = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = vec![
                ("page", page.to_string()),
                ("perPage", constants::CONTRACTS_PER_PAGE.to_string()),
                ("filter", filter.to_string()),
                ("expand", expand.to_string()),
            ];
            if let Some(sort) = sort {
                params.push(("sort", sort.to_string()));
            }

            let url = self.records_url(constants::CONTRACTS_COLLECTION, &params)?;
            let data: ListResponse<ContractRecord> = self
                .get_with_retry(
                    constants::CONTRACTS_COLLECTION,
                    &url,
                    constants::CONTRACT_FETCH_RETRIES,
                )
                .await?;

            contracts.extend(data.items.into_iter().map(Contract::from));

            if data.page >= data.total_pages {
                break;
            }
            page += 1;
        }

        debug!(count = contracts.len(), pages = page, "fetched contracts");
        Ok(contracts)
    }

    /// All contracts created inside `window`, newest first
    pub async fn fetch_contracts(&self, window: &MonthWindow, office: Option<&str>) -> Result<Vec<Contract>> {
        let filter = contracts_filter(window, &Local, office, None);
        self.list_contracts(&filter, constants::CONTRACT_EXPAND, Some("-created"))
            .await
            .context("Failed to fetch contracts")
    }

    /// Contracts created by one manager inside `window`
    pub async fn fetch_user_contracts(&self, user_id: &str, window: &MonthWindow) -> Result<Vec<Contract>> {
        let filter = contracts_filter(window, &Local, None, Some(user_id));
        self.list_contracts(&filter, constants::USER_CONTRACT_EXPAND, None)
            .await
            .with_context(|| format!("Failed to fetch contracts for user {}", user_id))
    }

    /// Look a manager up by (partial) name
    pub async fn find_user_by_nickname(&self, nickname: &str) -> Result<Option<UserRecord>> {
        let params = [
            ("page", "1".to_string()),
            ("perPage", constants::USER_SEARCH_PER_PAGE.to_string()),
            ("filter", format!("name ~ {}", quote(nickname))),
            ("expand", "office".to_string()),
        ];
        let url = self.records_url(constants::USERS_COLLECTION, &params)?;

        let data: ListResponse<UserRecord> = self
            .get_json(constants::USERS_COLLECTION, &url)
            .await
            .with_context(|| format!("Failed to search for user '{}'", nickname))?;

        Ok(best_match(data.items, nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};
    use serde_json::json;

    fn window() -> MonthWindow {
        let now = NaiveDate::from_ymd_opt(2025, 3, 17)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        MonthWindow::current(now)
    }

    fn user(id: &str, name: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            name: name.to_string(),
            office: String::new(),
            expand: None,
        }
    }

    #[test]
    fn test_contracts_filter() {
        assert_eq!(
            contracts_filter(&window(), &Utc, None, None),
            r#"created >= "2025-03-01 00:00:00" && created <= "2025-03-17 14:05:00" && is_deleted = false"#
        );
        assert_eq!(
            contracts_filter(&window(), &Utc, Some("off1"), Some("u1")),
            r#"created >= "2025-03-01 00:00:00" && created <= "2025-03-17 14:05:00" && is_deleted = false && office = "off1" && created_by = "u1""#
        );
    }

    #[test]
    fn test_contracts_filter_bounds_in_utc() {
        let bishkek = FixedOffset::east_opt(6 * 3600).unwrap();
        assert_eq!(
            contracts_filter(&window(), &bishkek, None, None),
            r#"created >= "2025-02-28 18:00:00" && created <= "2025-03-17 08:05:00" && is_deleted = false"#
        );
    }

    #[test]
    fn test_quote_escapes_filter_injection() {
        assert_eq!(quote(r#"a" || name != "b"#), r#""a\" || name != \"b""#);
        assert_eq!(quote(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn test_best_match_prefers_exact_name() {
        let users = vec![user("1", "Aziza Tokonova"), user("2", "AZIZ"), user("3", "Azizbek")];
        assert_eq!(best_match(users, "aziz").map(|u| u.id), Some("2".to_string()));

        let users = vec![user("1", "Aziza Tokonova"), user("3", "Azizbek")];
        assert_eq!(best_match(users, "aziz").map(|u| u.id), Some("1".to_string()));

        assert!(best_match(Vec::new(), "aziz").is_none());
    }

    #[test]
    fn test_contract_record_with_nested_expand() {
        let record: ContractRecord = serde_json::from_value(json!({
            "id": "c1",
            "name": "Tour to Issyk-Kul",
            "office": "off1",
            "created_by": "u1",
            "brutto_price": 1500,
            "netto_price": 1200,
            "currency": "USD",
            "is_deleted": false,
            "created": "2025-03-02 08:15:00.000Z",
            "expand": {
                "office": { "id": "off1", "name": "Bishkek" },
                "created_by": {
                    "id": "u1",
                    "name": "Aziz",
                    "office": "off2",
                    "expand": { "office": { "id": "off2", "name": "Osh" } }
                }
            }
        }))
        .unwrap();

        let contract = Contract::from(record);
        assert_eq!(contract.commission(), Some(300.0));
        assert_eq!(contract.office_name.as_deref(), Some("Bishkek"));
        assert_eq!(contract.creator.as_ref().map(|c| c.name.as_str()), Some("Aziz"));
        assert_eq!(contract.manager_office_name(), "Osh");
    }

    #[test]
    fn test_contract_record_with_flat_dotted_expand() {
        let record: ContractRecord = serde_json::from_value(json!({
            "id": "c2",
            "office": "off1",
            "created_by": "u1",
            "brutto_price": null,
            "netto_price": 100,
            "currency": "KGS",
            "created": "2025-03-02 08:15:00.000Z",
            "expand": {
                "created_by": { "id": "u1", "name": "Aziz" },
                "created_by.office": { "id": "off3", "name": "Karakol" }
            }
        }))
        .unwrap();

        let contract = Contract::from(record);
        assert_eq!(contract.gross_price, None);
        assert_eq!(contract.manager_office_name(), "Karakol");
        assert!(!contract.is_deleted);
    }

    #[test]
    fn test_contract_record_without_expand_is_unattributed() {
        let record: ContractRecord = serde_json::from_value(json!({
            "id": "c3",
            "created_by": "u9",
            "netto_price": 10,
            "brutto_price": 20,
            "currency": "USD"
        }))
        .unwrap();

        let contract = Contract::from(record);
        assert!(contract.creator.is_none());
        assert_eq!(contract.creator_id, "u9");
    }

    #[test]
    fn test_list_response_shape() {
        let data: ListResponse<UserRecord> = serde_json::from_value(json!({
            "page": 1,
            "perPage": 50,
            "totalItems": 1,
            "totalPages": 1,
            "items": [{
                "id": "u1",
                "name": "Aziz",
                "office": "off1",
                "expand": { "office": { "id": "off1", "name": "Bishkek" } }
            }]
        }))
        .unwrap();

        assert_eq!(data.total_pages, 1);
        assert_eq!(data.items[0].office_name(), Some("Bishkek"));
    }
}
