use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};

use super::types::{DEFAULT_PAGE_SIZE, RuleGroupList, RuleGroupPayload};
use super::{ApiError, Region, RulesGroupsApi};
use crate::rules_group::RuleGroup;

const RULE_SET_PATH: &str = "/api/v1/external/rule/rule-set";

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_attempts: 4,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct RulesClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl RulesClient {
    pub fn new(api_key: String, region: Region) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, region.api_url().to_string())
    }

    /// NOTE: Also used for testing with mock servers.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut header_value = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(
            |_| ApiError::Auth {
                message: "Invalid API key format".to_string(),
            },
        )?;
        header_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, header_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.base_url
    }

    fn rule_set_url(&self) -> String {
        format!("{}{}", self.base_url, RULE_SET_PATH)
    }

    fn group_url(&self, id: &str) -> String {
        format!("{}/{}", self.rule_set_url(), urlencoding::encode(id))
    }

    /// Sends the request built by `build`, retrying rate limits and server errors.
    async fn send<F>(&self, build: F, id: Option<&str>) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1u32;

        loop {
            let result = match build().send().await {
                Ok(response) => check_status(response, id).await,
                Err(e) => Err(ApiError::Network(e)),
            };

            match result {
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let wait = match &err {
                        ApiError::RateLimited { retry_after } => {
                            Duration::from_secs(*retry_after).min(self.retry.max_backoff)
                        }
                        _ => backoff,
                    };
                    tracing::warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "retrying rules API request"
                    );
                    tokio::time::sleep(wait).await;
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn read_group(response: Response) -> Result<RuleGroup, ApiError> {
        let payload: RuleGroupPayload =
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse {
                    message: format!("Failed to parse rules group: {}", e),
                })?;
        RuleGroup::try_from(payload)
    }
}

async fn check_status(response: Response, id: Option<&str>) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound {
            id: id.unwrap_or("unknown").to_string(),
        }),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(1);
            Err(ApiError::RateLimited { retry_after })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Auth {
            message: error_message(response).await,
        }),
        _ => Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(response).await,
        }),
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();

    let Ok(text) = response.text().await else {
        return fallback;
    };

    let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) else {
        let text = text.trim();
        return if text.is_empty() {
            fallback
        } else {
            text.chars().take(200).collect()
        };
    };

    body.get("message")
        .and_then(|m| m.as_str())
        .or_else(|| {
            body.get("errors")
                .and_then(|e| e.as_array())
                .and_then(|arr| arr.first())
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(|m| m.to_string())
        .unwrap_or(fallback)
}

#[async_trait]
impl RulesGroupsApi for RulesClient {
    async fn create(&self, group: &RuleGroup) -> Result<RuleGroup, ApiError> {
        let url = self.rule_set_url();
        let payload = RuleGroupPayload::from(&group.without_ids());

        let response = self
            .send(|| self.client.post(&url).json(&payload), None)
            .await?;
        let created = Self::read_group(response).await?;

        tracing::info!(id = ?created.id, name = %created.name, "rules group created");
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<RuleGroup, ApiError> {
        let url = self.group_url(id);
        let response = self.send(|| self.client.get(&url), Some(id)).await?;
        Self::read_group(response).await
    }

    async fn update(&self, id: &str, group: &RuleGroup) -> Result<RuleGroup, ApiError> {
        let url = self.group_url(id);
        let mut payload = RuleGroupPayload::from(group);
        payload.id = Some(id.to_string());

        let response = self
            .send(|| self.client.put(&url).json(&payload), Some(id))
            .await?;
        let updated = Self::read_group(response).await?;

        tracing::info!(id = %id, name = %updated.name, "rules group updated");
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.group_url(id);
        self.send(|| self.client.delete(&url), Some(id)).await?;
        tracing::info!(id = %id, "rules group deleted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RuleGroup>, ApiError> {
        let base = self.rule_set_url();
        let mut all_groups = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = match &page_token {
                Some(token) => format!(
                    "{}?pageSize={}&pageToken={}",
                    base,
                    DEFAULT_PAGE_SIZE,
                    urlencoding::encode(token)
                ),
                None => format!("{}?pageSize={}", base, DEFAULT_PAGE_SIZE),
            };

            let response = self.send(|| self.client.get(&url), None).await?;
            let page: RuleGroupList =
                response
                    .json()
                    .await
                    .map_err(|e| ApiError::InvalidResponse {
                        message: format!("Failed to parse rules group list: {}", e),
                    })?;

            for payload in page.rule_groups {
                all_groups.push(RuleGroup::try_from(payload)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = all_groups.len(), "rules groups listed");
        Ok(all_groups)
    }
}

impl std::fmt::Debug for RulesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}
