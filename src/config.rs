//! User settings: `settings.toml` plus environment overrides.
//!
//! ```toml
//! endpoint = "https://management.azure.com"
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//! http_timeout_secs = 60
//!
//! [poll]
//! interval_secs = 5
//! backoff_factor = 1.5
//! max_interval_secs = 30
//! timeout_secs = 1800
//! ```

use crate::paths;
use anyhow::{Context, Result};
use armkit::{ClientConfig, DEFAULT_ENDPOINT};
use reconcile::PollConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Subscription used when the arguments do not name one
pub const ENV_SUBSCRIPTION: &str = "AZURE_SUBSCRIPTION_ID";

/// Management endpoint override (sovereign clouds, test servers)
pub const ENV_ENDPOINT: &str = "ARMSYNC_ENDPOINT";

/// Bearer token for the management API
pub const ENV_TOKEN: &str = "AZURE_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub subscription_id: Option<String>,
    /// Prefer the environment; tokens in files are easy to leak.
    pub token: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub interval_secs: Option<f64>,
    pub backoff_factor: Option<f64>,
    pub max_interval_secs: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Load settings and apply environment overrides.
    ///
    /// An explicit path must exist. The default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let path = paths::settings_file()?;
                if path.exists() {
                    Self::load_file(&path)?
                } else {
                    log::debug!("No settings file at {}", path.display());
                    Self::default()
                }
            }
        };
        Ok(settings.with_env(|key| std::env::var(key).ok()))
    }

    /// Parse a settings file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Environment values win over the file.
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = set(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        if let Some(subscription) = set(ENV_SUBSCRIPTION) {
            self.subscription_id = Some(subscription);
        }
        if let Some(token) = set(ENV_TOKEN) {
            self.token = Some(token);
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint
            && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
        {
            anyhow::bail!("endpoint must be an http(s) URL, got '{endpoint}'");
        }
        let poll = &self.poll;
        for (name, value) in [
            ("poll.interval_secs", poll.interval_secs),
            ("poll.max_interval_secs", poll.max_interval_secs),
        ] {
            if value.is_some() && seconds(value).is_none() {
                anyhow::bail!("{name} must be a non-negative number of seconds");
            }
        }
        if poll.backoff_factor.is_some_and(|f| !f.is_finite() || f < 1.0) {
            anyhow::bail!("poll.backoff_factor must be at least 1.0");
        }
        Ok(())
    }

    /// HTTP client configuration.
    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token: self.token.clone(),
            timeout: self
                .http_timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            user_agent: concat!("armsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Long-running operation polling configuration.
    pub fn poll_config(&self) -> PollConfig {
        let defaults = PollConfig::default();
        PollConfig {
            interval: seconds(self.poll.interval_secs).unwrap_or(defaults.interval),
            backoff_factor: self.poll.backoff_factor.unwrap_or(defaults.backoff_factor),
            max_interval: seconds(self.poll.max_interval_secs).unwrap_or(defaults.max_interval),
            timeout: self
                .poll
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }
}

fn seconds(value: Option<f64>) -> Option<Duration> {
    value.and_then(|v| Duration::try_from_secs_f64(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.client_config().endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.poll_config(), PollConfig::default());
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_toml(
            r#"
endpoint = "https://management.usgovcloudapi.net"
subscription_id = "sub1"
http_timeout_secs = 10

[poll]
interval_secs = 0.5
backoff_factor = 2.0
max_interval_secs = 4
timeout_secs = 60
"#,
        )
        .unwrap();
        let client = settings.client_config();
        assert_eq!(client.endpoint, "https://management.usgovcloudapi.net");
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert!(client.token.is_none());

        let poll = settings.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(500));
        assert_eq!(poll.backoff_factor, 2.0);
        assert_eq!(poll.max_interval, Duration::from_secs(4));
        assert_eq!(poll.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Settings::from_toml("endpiont = \"https://x\"").is_err());
        assert!(Settings::from_toml("[poll]\nintervall = 3").is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Settings::from_toml("endpoint = \"management.azure.com\"").is_err());
        assert!(Settings::from_toml("[poll]\nbackoff_factor = 0.5").is_err());
        assert!(Settings::from_toml("[poll]\ninterval_secs = -1").is_err());
        assert!(Settings::from_toml("[poll]\ninterval_secs = 1e30").is_err());
        assert!(Settings::from_toml("[poll]\nmax_interval_secs = 1e300").is_err());
        assert!(Settings::from_toml("[poll]\ninterval_secs = nan").is_err());
    }

    #[test]
    fn test_out_of_range_interval_falls_back() {
        let settings = Settings {
            poll: PollSettings {
                interval_secs: Some(1e30),
                ..PollSettings::default()
            },
            ..Settings::default()
        };
        assert_eq!(settings.poll_config().interval, PollConfig::default().interval);
    }

    #[test]
    fn test_env_overrides_file() {
        let settings = Settings::from_toml("subscription_id = \"from-file\"")
            .unwrap()
            .with_env(|key| match key {
                ENV_SUBSCRIPTION => Some("from-env".to_string()),
                ENV_TOKEN => Some("secret".to_string()),
                ENV_ENDPOINT => Some("   ".to_string()),
                _ => None,
            });
        assert_eq!(settings.subscription_id.as_deref(), Some("from-env"));
        assert_eq!(settings.client_config().token.as_deref(), Some("secret"));
        assert_eq!(settings.client_config().endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_with_env_without_values_keeps_file() {
        let settings = Settings::from_toml("subscription_id = \"keep\"")
            .unwrap()
            .with_env(no_env);
        assert_eq!(settings.subscription_id.as_deref(), Some("keep"));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "http_timeout_secs = 5").unwrap();
        let settings = Settings::load_file(file.path()).unwrap();
        assert_eq!(settings.http_timeout_secs, Some(5));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }
}
