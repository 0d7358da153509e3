use crate::api::{self, ApiError, Region, RulesGroupsApi};

/// Resolved connection settings. An explicit URL wins over the region, and the
/// region defaults to EU1.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub dry_run: bool,
}

impl ProviderConfig {
    pub fn resolve(
        api_key: Option<String>,
        region: Option<Region>,
        url: Option<String>,
        dry_run: bool,
    ) -> Self {
        let base_url = url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| region.unwrap_or_default().api_url().to_string());

        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url,
            dry_run,
        }
    }

    pub fn backend(&self) -> Result<Box<dyn RulesGroupsApi>, ApiError> {
        api::get_backend(self.api_key.clone(), self.base_url.clone(), self.dry_run)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
