//! Cloud connection settings
//!
//! Values are resolved once at startup with the precedence
//! explicit value > environment variable > built-in default, and then passed
//! around by reference. The process environment is only ever read.

use crate::error::{ConfigError, Result};
use rdsflow_cloud::Password;

pub const ENV_AUTH_URL: &str = "OS_AUTH_URL";
pub const ENV_IDENTITY_API_VERSION: &str = "OS_IDENTITY_API_VERSION";
pub const ENV_REGION_NAME: &str = "OS_REGION_NAME";
pub const ENV_PROJECT_NAME: &str = "OS_PROJECT_NAME";
pub const ENV_USER_DOMAIN_NAME: &str = "OS_USER_DOMAIN_NAME";
pub const ENV_DOMAIN_NAME: &str = "OS_DOMAIN_NAME";
pub const ENV_USERNAME: &str = "OS_USERNAME";
pub const ENV_PASSWORD: &str = "OS_PASSWORD";
pub const ENV_DEBUG: &str = "OS_DEBUG";

pub const DEFAULT_AUTH_URL: &str = "https://iam.eu-de.otc.t-systems.com:443/v3";
pub const DEFAULT_IDENTITY_API_VERSION: &str = "3";
pub const DEFAULT_REGION: &str = "eu-de";
pub const DEFAULT_PROJECT_NAME: &str = "eu-de";

/// Values given explicitly, typically from command-line flags
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub auth_url: Option<String>,
    pub region: Option<String>,
    pub project_name: Option<String>,
    pub user_domain_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub debug: bool,
}

/// Resolved connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSettings {
    pub auth_url: String,
    pub identity_api_version: String,
    pub region: String,
    pub project_name: String,
    pub user_domain_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<Password>,
    /// HTTP request/response logging
    pub debug: bool,
}

impl CloudSettings {
    /// Resolve against the process environment
    pub fn from_env(overrides: SettingsOverrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup
    ///
    /// Empty values count as unset, at every level.
    pub fn resolve<F>(overrides: SettingsOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());
        let pick = |explicit: Option<String>, key: &str| {
            explicit.filter(|v| !v.is_empty()).or_else(|| env(key))
        };

        let identity_api_version = env(ENV_IDENTITY_API_VERSION)
            .unwrap_or_else(|| DEFAULT_IDENTITY_API_VERSION.to_string());
        if identity_api_version != "3" {
            return Err(ConfigError::UnsupportedIdentityVersion(identity_api_version));
        }

        let settings = Self {
            auth_url: pick(overrides.auth_url, ENV_AUTH_URL)
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            identity_api_version,
            region: pick(overrides.region, ENV_REGION_NAME)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            project_name: pick(overrides.project_name, ENV_PROJECT_NAME)
                .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            user_domain_name: pick(overrides.user_domain_name, ENV_USER_DOMAIN_NAME)
                .or_else(|| env(ENV_DOMAIN_NAME)),
            username: pick(overrides.username, ENV_USERNAME),
            password: pick(overrides.password, ENV_PASSWORD).map(Password::new),
            debug: overrides.debug || env(ENV_DEBUG).is_some(),
        };

        tracing::debug!(
            auth_url = %settings.auth_url,
            region = %settings.region,
            project = %settings.project_name,
            "Resolved cloud settings"
        );
        Ok(settings)
    }
}
