mod client;
mod error;
mod memory;
mod region;
pub mod types;

pub use client::{RetryConfig, RulesClient};
pub use error::ApiError;
pub use memory::MemoryRulesApi;
pub use region::Region;

use async_trait::async_trait;

use crate::rules_group::RuleGroup;

/// Remote operations on rules groups. Every call returns the group as the
/// platform stores it, with ids and orders filled in.
#[async_trait]
pub trait RulesGroupsApi: Send + Sync {
    async fn create(&self, group: &RuleGroup) -> Result<RuleGroup, ApiError>;
    async fn get(&self, id: &str) -> Result<RuleGroup, ApiError>;
    async fn update(&self, id: &str, group: &RuleGroup) -> Result<RuleGroup, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
    async fn list(&self) -> Result<Vec<RuleGroup>, ApiError>;
}

/// Builds the backend the CLI talks to: the in-memory one for dry runs,
/// the REST client otherwise.
pub fn get_backend(
    api_key: Option<String>,
    base_url: String,
    dry_run: bool,
) -> Result<Box<dyn RulesGroupsApi>, ApiError> {
    if dry_run {
        return Ok(Box::new(MemoryRulesApi::new()));
    }

    let api_key = api_key.ok_or_else(|| ApiError::Auth {
        message: "No API key provided. Set CORALOGIX_API_KEY or use --api-key flag".to_string(),
    })?;

    Ok(Box::new(RulesClient::with_base_url(api_key, base_url)?))
}
