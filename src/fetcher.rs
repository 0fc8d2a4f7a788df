//! Explorer API Fetcher
//!
//! Issues one HTTP GET per poll cycle against the blockchain explorer's
//! `/api/v2/transactions` endpoint and decodes the `items` page into
//! transaction records (newest-first, per API convention).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Default explorer base URL
pub const DEFAULT_BASE_URL: &str = "https://ledger.sidrachain.com";

/// Default page size requested from the API
pub const DEFAULT_LIMIT: usize = 10;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent header sent with every request
pub const USER_AGENT: &str = "LedgerAnalysis/1.0";

/// Smallest-unit scaling factor (18-decimal token precision)
pub const WEI_PER_UNIT: f64 = 1e18;

/// Errors that can occur while fetching a transaction page
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Configuration for the explorer API fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Explorer base URL, without trailing slash
    pub base_url: String,
    /// Page size passed as the `limit` query parameter
    pub limit: usize,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl FetchConfig {
    /// Create a config for the given base URL, keeping the other defaults
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full transactions endpoint URL including the `limit` query parameter
    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/v2/transactions?limit={}",
            self.base_url.trim_end_matches('/'),
            self.limit
        )
    }
}

/// A single transaction as fetched from the explorer
///
/// Immutable once fetched. `value` is in the chain's smallest unit; use
/// [`LedgerTransaction::scaled_value`] for display units. Fields the monitor
/// does not interpret are kept opaquely in `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    /// Transaction hash with 0x prefix
    pub hash: String,
    /// Sender address with 0x prefix
    pub from_address: String,
    /// Transferred value in the smallest unit
    pub value: u128,
    /// Remaining response fields, untouched
    pub raw: serde_json::Map<String, Value>,
}

impl LedgerTransaction {
    /// Create a record from the interpreted fields only (used by tests and mocks)
    pub fn new(hash: impl Into<String>, from_address: impl Into<String>, value: u128) -> Self {
        Self {
            hash: hash.into(),
            from_address: from_address.into(),
            value,
            raw: serde_json::Map::new(),
        }
    }

    /// Value in display units (smallest unit divided by 1e18)
    pub fn scaled_value(&self) -> f64 {
        self.value as f64 / WEI_PER_UNIT
    }
}

/// Wire shape of the transactions page
#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    items: Vec<ApiTransaction>,
}

/// Wire shape of one transaction; everything we don't read lands in `rest`
#[derive(Debug, Deserialize)]
struct ApiTransaction {
    hash: String,
    from: ApiAddress,
    value: String,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ApiAddress {
    hash: String,
}

impl ApiTransaction {
    fn into_record(self) -> Result<LedgerTransaction, FetchError> {
        let value = self.value.parse::<u128>().map_err(|_| {
            FetchError::Decode(format!(
                "invalid value '{}' for transaction {}",
                self.value, self.hash
            ))
        })?;

        Ok(LedgerTransaction {
            hash: self.hash,
            from_address: self.from.hash,
            value,
            raw: self.rest,
        })
    }
}

/// Decode a transactions page body into records, in page order
fn decode_page(body: &str) -> Result<Vec<LedgerTransaction>, FetchError> {
    let page: ApiPage =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    page.items
        .into_iter()
        .map(ApiTransaction::into_record)
        .collect()
}

/// Source of transaction batches, one batch per poll cycle
///
/// The monitor loop is written against this trait so tests can script
/// batches without a network.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch the latest transactions page, newest-first
    async fn fetch_latest(&self) -> Result<Vec<LedgerTransaction>, FetchError>;
}

/// HTTP fetcher backed by the explorer REST API
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Build a fetcher with a client carrying the configured timeout and
    /// the fixed User-Agent header
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configured endpoint URL
    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }

    fn map_request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.config.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl TransactionSource for HttpFetcher {
    async fn fetch_latest(&self) -> Result<Vec<LedgerTransaction>, FetchError> {
        let response = self
            .client
            .get(self.endpoint())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        decode_page(&body)
    }
}
