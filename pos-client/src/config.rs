//! Client configuration

use std::time::Duration;

/// Configuration for connecting to the POS cloud API.
///
/// Credentials are account-scoped basic auth and must come from the
/// deployment environment; there are no fallbacks for them.
///
/// | Environment variable | Required | Default |
/// |----------------------|----------|---------|
/// | POS_BASE_URL         | yes      | -       |
/// | POS_ACCOUNT_ID       | yes      | -       |
/// | POS_USER             | yes      | -       |
/// | POS_PASSWORD         | yes      | -       |
#[derive(Debug, Clone)]
pub struct PosConfig {
    /// API base URL (e.g. "https://pos.example.com/api/v3")
    pub base_url: String,
    /// External account id all endpoints are scoped under
    pub account_id: String,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Read timeout for catalog/store/stock requests
    pub read_timeout: Duration,
    /// Read timeout for receipt pages (larger payloads)
    pub receipt_read_timeout: Duration,
    /// Retries after the first attempt for retryable statuses
    pub max_retries: u32,
    /// Base delay for exponential backoff (0.5s, 1s, 2s)
    pub retry_base_delay: Duration,
    /// Safety cap for generic paginated fetches
    pub page_cap: u32,
    /// Wall-clock budget for one whole receipt scan
    pub scan_budget: Duration,
}

impl PosConfig {
    /// Create a configuration with default timeouts and retry policy
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
            receipt_read_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            page_cap: 100,
            scan_budget: Duration::from_secs(300),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Fails when any of the required variables is unset.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self::new(
            std::env::var("POS_BASE_URL")?,
            std::env::var("POS_ACCOUNT_ID")?,
            std::env::var("POS_USER")?,
            std::env::var("POS_PASSWORD")?,
        ))
    }

    /// Set the whole-scan time budget for receipt scans
    pub fn with_scan_budget(mut self, budget: Duration) -> Self {
        self.scan_budget = budget;
        self
    }

    /// Set the retry backoff base delay (useful to shorten tests)
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Build a full URL for an account-scoped path (leading slashes allowed)
    pub fn account_url(&self, path: &str) -> String {
        format!(
            "{}/accounts/{}/{}",
            self.base_url,
            self.account_id,
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_url_joins_and_trims() {
        let config = PosConfig::new("https://pos.example.com/api/", "acc-1", "u", "p");
        assert_eq!(
            config.account_url("/products"),
            "https://pos.example.com/api/accounts/acc-1/products"
        );
        assert_eq!(
            config.account_url("receipts"),
            "https://pos.example.com/api/accounts/acc-1/receipts"
        );
    }
}
