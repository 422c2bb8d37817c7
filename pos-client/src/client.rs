//! POS API client — authenticated, retrying, breaker-protected requests
//! plus the generic paginated fetcher for list endpoints.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::config::PosConfig;
use crate::error::{ClientError, ClientResult};
use crate::types::{PageEnvelope, StockLevelRecord};

/// Page size for catalog/store list endpoints
const LIST_PAGE_SIZE: u32 = 200;

/// Statuses retried with exponential backoff (read-only requests only)
const RETRYABLE: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Result of a generic paginated fetch.
///
/// `truncated` is set when the hard page cap stopped the walk before the
/// server reported the end, so callers can tell a capped result from a
/// complete one.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub truncated: bool,
}

/// Client for the POS cloud API.
///
/// Holds a pooled HTTP connection with fixed basic-auth credentials and a
/// shared circuit breaker; constructed once at process start and passed to
/// the components that need it.
#[derive(Debug)]
pub struct PosClient {
    http: reqwest::Client,
    config: PosConfig,
    breaker: CircuitBreaker,
}

impl PosClient {
    pub fn new(config: PosConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            breaker: CircuitBreaker::default(),
        })
    }

    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    /// Breaker state is exposed for observability and tests
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// GET an account-scoped path with retry, backoff and circuit breaker.
    ///
    /// Retries {429, 500, 502, 503, 504} and network errors up to
    /// `max_retries` times with exponential backoff. Other non-success
    /// statuses are definitive: no retry, no breaker penalty for 4xx.
    async fn send_get(
        &self,
        path: &str,
        params: &[(String, String)],
        read_timeout: Duration,
    ) -> ClientResult<reqwest::Response> {
        let url = self.config.account_url(path);
        let mut attempt: u32 = 0;

        loop {
            if !self.breaker.allow() {
                tracing::warn!(path, "circuit breaker open, request not sent");
                return Err(ClientError::BreakerOpen);
            }

            let result = self
                .http
                .get(&url)
                .basic_auth(&self.config.username, Some(&self.config.password))
                .header("Accept", "application/json")
                .query(params)
                .timeout(read_timeout)
                .send()
                .await;

            let failure = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.breaker.record_success();
                        return Ok(response);
                    }
                    if RETRYABLE.contains(&status) {
                        self.breaker.record_failure();
                        ClientError::Status {
                            status,
                            path: path.to_string(),
                        }
                    } else {
                        // Client errors are legitimate responses, not
                        // infrastructure failures.
                        self.breaker.record_success();
                        tracing::error!(path, query = ?params, %status, "POS request rejected");
                        return Err(ClientError::Status {
                            status,
                            path: path.to_string(),
                        });
                    }
                }
                Err(err) => {
                    self.breaker.record_failure();
                    ClientError::Http(err)
                }
            };

            if attempt >= self.config.max_retries {
                tracing::error!(path, query = ?params, "POS request failed: {failure}");
                return Err(failure);
            }

            let delay = self.config.retry_base_delay * 2u32.pow(attempt);
            tracing::warn!(
                path,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "POS request failed, retrying: {failure}"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET and deserialize a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        read_timeout: Duration,
    ) -> ClientResult<T> {
        let response = self.send_get(path, params, read_timeout).await?;
        Ok(response.json::<T>().await?)
    }

    /// Fetch every record of a paginated list endpoint.
    ///
    /// Pages are 1-indexed, 200 records per page. The walk stops on an
    /// empty page, when the server-reported page total is reached, or at
    /// the hard safety cap (`page_cap`), in which case the result is
    /// marked truncated.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_params: &[(&str, &str)],
    ) -> ClientResult<Paginated<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut params: Vec<(String, String)> = vec![
                ("page".into(), page.to_string()),
                ("size".into(), LIST_PAGE_SIZE.to_string()),
                ("omitPageCounts".into(), "true".into()),
            ];
            for (key, value) in extra_params {
                params.push(((*key).into(), (*value).into()));
            }

            let envelope: PageEnvelope<T> = self
                .get_json(path, &params, self.config.read_timeout)
                .await?;

            if envelope.results.is_empty() {
                return Ok(Paginated {
                    items,
                    truncated: false,
                });
            }
            items.extend(envelope.results);

            if let Some(total) = envelope.pages_total
                && page >= total
            {
                return Ok(Paginated {
                    items,
                    truncated: false,
                });
            }

            page += 1;
            if page > self.config.page_cap {
                tracing::warn!(path, cap = self.config.page_cap, "pagination cap reached");
                return Ok(Paginated {
                    items,
                    truncated: true,
                });
            }
        }
    }

    /// Current per-warehouse stock for one product.
    ///
    /// `204 No Content` is a valid "no stock data" answer and maps to
    /// `None`, distinct from an error.
    pub async fn product_stocks(
        &self,
        product_id: Uuid,
    ) -> ClientResult<Option<Vec<StockLevelRecord>>> {
        let path = format!("products/{product_id}/stocks");
        let response = self
            .send_get(&path, &[], self.config.read_timeout)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let envelope: PageEnvelope<StockLevelRecord> = response.json().await?;
        Ok(Some(envelope.results))
    }
}
