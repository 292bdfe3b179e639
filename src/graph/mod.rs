pub mod auth;
pub mod exchange;
pub mod mail_rules;
pub mod users;

use crate::config::ConfigManager;
use crate::error::{DirbulkError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30000;
const JITTER_FACTOR: f64 = 0.3; // +/- 30%

/// Exponential backoff with jitter
fn calculate_backoff_with_jitter(attempt: u32) -> Duration {
    use std::hash::{Hash, Hasher};

    let capped_backoff = (INITIAL_BACKOFF_MS * 2u64.pow(attempt)).min(MAX_BACKOFF_MS);

    let jitter_range = (capped_backoff as f64 * JITTER_FACTOR) as u64;
    let jitter = if jitter_range > 0 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::time::SystemTime::now().hash(&mut hasher);
        (hasher.finish() % (jitter_range * 2)) as i64 - jitter_range as i64
    } else {
        0
    };

    Duration::from_millis((capped_backoff as i64 + jitter).max(100) as u64)
}

/// OData REST client with retry support, used for Graph and the Exchange admin API
pub struct GraphClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl GraphClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, GRAPH_API_BASE)
    }

    /// Client against a non-default Graph root (national clouds, mock servers)
    pub fn with_base_url(access_token: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client for a configured tenant, using its cached token
    pub async fn from_config(config: &ConfigManager, tenant_name: &str) -> Result<Self> {
        let graph_auth = auth::GraphAuth::new(config.clone());
        let access_token = graph_auth.get_access_token(tenant_name).await?;

        Ok(Self::with_base_url(access_token, &config.graph_endpoint()?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// GET and decode a JSON body
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        let resp = self
            .send_with_retry("GET", &url, || self.client.get(&url))
            .await?;
        Ok(error_for_status(resp).await?.json::<T>().await?)
    }

    /// GET that maps HTTP 404 to `None`
    pub async fn get_optional<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Option<T>> {
        let url = self.url(endpoint);
        let resp = self
            .send_with_retry("GET", &url, || self.client.get(&url))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(error_for_status(resp).await?.json::<T>().await?))
    }

    /// GET with `ConsistencyLevel: eventual`, required by advanced directory queries
    /// such as filtering on `onPremisesSamAccountName`
    pub async fn get_eventual<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        let resp = self
            .send_with_retry("GET", &url, || {
                self.client.get(&url).header("ConsistencyLevel", "eventual")
            })
            .await?;
        Ok(error_for_status(resp).await?.json::<T>().await?)
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(endpoint);
        let resp = self
            .send_with_retry("POST", &url, || self.client.post(&url).json(body))
            .await?;
        Ok(error_for_status(resp).await?.json::<T>().await?)
    }

    /// PATCH where Graph answers `204 No Content`
    pub async fn patch_no_content<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<()> {
        let url = self.url(endpoint);
        let resp = self
            .send_with_retry("PATCH", &url, || self.client.patch(&url).json(body))
            .await?;
        error_for_status(resp).await?;
        Ok(())
    }

    /// Fetch all pages of a paginated endpoint by following `@odata.nextLink`
    pub async fn get_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        let mut all_items: Vec<T> = Vec::new();
        let mut current_url = self.url(endpoint);

        loop {
            let resp = self
                .send_with_retry("GET", &current_url, || self.client.get(&current_url))
                .await?;
            let page: PaginatedResponse<T> = error_for_status(resp).await?.json().await?;
            all_items.extend(page.value);

            match page.next_link {
                Some(next) => current_url = next,
                None => break,
            }
        }

        Ok(all_items)
    }

    /// Send a request, retrying on 429, 5xx and connection errors.
    ///
    /// The final response is returned whatever its status; callers decide what
    /// a non-success status means.
    async fn send_with_retry<F>(&self, method: &str, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            debug!(method, url, attempt, "graph request");
            let last_attempt = attempt + 1 >= MAX_RETRIES;

            match build().bearer_auth(&self.access_token).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS && !last_attempt {
                        let retry_after = resp
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(INITIAL_BACKOFF_MS / 1000);

                        eprintln!(
                            "Rate limited (429). Retrying in {} seconds... (attempt {}/{})",
                            retry_after,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    } else if status.is_server_error() && !last_attempt {
                        let wait_time = calculate_backoff_with_jitter(attempt);
                        eprintln!(
                            "Server error ({}). Retrying in {:?}... (attempt {}/{})",
                            status,
                            wait_time,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(wait_time).await;
                    } else {
                        return Ok(resp);
                    }
                }
                Err(e) if !last_attempt => {
                    let wait_time = calculate_backoff_with_jitter(attempt);
                    eprintln!(
                        "Connection error: {}. Retrying in {:?}... (attempt {}/{})",
                        e,
                        wait_time,
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(wait_time).await;
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
        }
    }
}

/// Turn a non-success response into a `GraphApiError` carrying the decoded body
async fn error_for_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let error_text = resp.text().await.unwrap_or_default();
    Err(DirbulkError::GraphApiError(format!(
        "HTTP {}: {}",
        status,
        crate::error::enhance_graph_error(&error_text)
    )))
}

/// Standard OData page with `value` and `@odata.nextLink`
#[derive(Debug, Deserialize)]
pub struct PaginatedResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_capped_and_positive() {
        for attempt in 0..10 {
            let wait = calculate_backoff_with_jitter(attempt);
            assert!(wait >= Duration::from_millis(100));
            assert!(wait <= Duration::from_millis((MAX_BACKOFF_MS as f64 * 1.3) as u64));
        }
    }

    #[test]
    fn test_base_url_joining() {
        let client = GraphClient::with_base_url("t".into(), "http://localhost:1234/v1.0/");
        assert_eq!(client.url("/users/a"), "http://localhost:1234/v1.0/users/a");
        assert_eq!(client.url("users"), "http://localhost:1234/v1.0/users");
    }
}
