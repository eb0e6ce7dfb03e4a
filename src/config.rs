use std::env;

use tracing::debug;

use crate::sentinel::error::SentinelApiError;

pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2022-11-01";
pub const DEFAULT_HUNTS_API_VERSION: &str = "2025-01-01-preview";
pub const DEFAULT_LOG_ANALYTICS_API_VERSION: &str = "2021-12-01-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Coordinates of the Sentinel workspace plus the API versions used per
/// collection. Saved searches and hunts have historically been served by
/// different versions, so each is configured on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SentinelConfig {
    pub management_url: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
    pub api_version: String,
    pub hunts_api_version: String,
    pub log_analytics_api_version: String,
    pub verify_ssl: bool,
    pub timeout_secs: u64,
}

impl SentinelConfig {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            workspace_name: workspace_name.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            hunts_api_version: DEFAULT_HUNTS_API_VERSION.to_string(),
            log_analytics_api_version: DEFAULT_LOG_ANALYTICS_API_VERSION.to_string(),
            verify_ssl: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_management_url(mut self, url: impl Into<String>) -> Self {
        self.management_url = url.into();
        self
    }

    /// Reads the configuration from process environment variables.
    /// Call `dotenv().ok()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, SentinelApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SentinelApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                SentinelApiError::ConfigurationError(format!(
                    "{} environment variable is required",
                    key
                ))
            })
        };

        let mut config = Self::new(
            required("SUBSCRIPTION_ID")?,
            required("WORKSPACE_RESOURCE_GROUP")?,
            required("WORKSPACE_NAME")?,
        );

        if let Some(url) = get("SENTINEL_MANAGEMENT_URL") {
            config.management_url = url;
        }
        if let Some(v) = get("API_VERSION") {
            config.api_version = v;
        }
        if let Some(v) = get("HUNTS_API_VERSION") {
            config.hunts_api_version = v;
        }
        if let Some(v) = get("LOG_ANALYTICS_API_VERSION") {
            config.log_analytics_api_version = v;
        }
        if let Some(v) = get("VERIFY_SSL") {
            config.verify_ssl = v.to_lowercase() != "false";
        }
        if let Some(v) = get("SENTINEL_TIMEOUT_SECS") {
            config.timeout_secs = v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    SentinelApiError::ConfigurationError(format!(
                        "SENTINEL_TIMEOUT_SECS must be a positive integer, got '{}'",
                        v
                    ))
                })?;
        }

        debug!(
            workspace = %config.workspace_name,
            management_url = %config.management_url,
            "Loaded Sentinel configuration"
        );

        Ok(config)
    }

    /// URL prefix of the Log Analytics workspace every collection hangs off.
    pub fn workspace_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.OperationalInsights/workspaces/{}",
            self.management_url.trim_end_matches('/'),
            self.subscription_id,
            self.resource_group,
            self.workspace_name
        )
    }

    pub fn security_insights_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.SecurityInsights",
            self.workspace_url()
        )
    }
}
