//! Job settings
//!
//! The parameters a build step passes to the client factory, read from JSON.
//! Default location is the platform-specific app config folder:
//! - Linux: ~/.config/codedeploy-clients/settings.json
//! - Windows: %APPDATA%/codedeploy-clients/settings.json
//! - macOS: ~/Library/Application Support/codedeploy-clients/settings.json
//!
//! Blank strings count as unset.

use crate::aws::credentials::{
    CredentialMode, SessionPolicy, DEFAULT_POLLING_FREQUENCY_SECONDS, DEFAULT_ROLE_SESSION_NAME,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::aws::{ClientFactory, ProxyConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one deployment target
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub proxy_host: Option<String>,

    /// Zero or negative disables the proxy
    #[serde(default)]
    pub proxy_port: i32,

    /// Named profile from ~/.aws
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub iam_role_arn: Option<String>,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    /// Bucket the connectivity probe writes to
    #[serde(default)]
    pub bucket: Option<String>,

    /// CodeDeploy application the connectivity probe reads
    #[serde(default)]
    pub application: Option<String>,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub polling_frequency_seconds: Option<u64>,

    #[serde(default)]
    pub role_session_name: Option<String>,

    /// Override for S3-compatible stores or local emulators
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Settings {
    /// Load settings from the default location, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::settings_path()?;

        if !path.exists() {
            tracing::debug!("Settings file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        tracing::info!(
            "Loaded settings: region={:?}, profile={:?}, role={:?}, bucket={:?}, application={:?}",
            settings.region,
            settings.profile,
            settings.iam_role_arn,
            settings.bucket,
            settings.application
        );

        Ok(settings)
    }

    /// Get the path to the default settings file
    pub fn settings_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "codedeploy-clients", "codedeploy-clients")
            .context("Failed to determine settings directory")?;

        Ok(proj_dirs.config_dir().join("settings.json"))
    }

    /// Credential mode implied by which fields are filled in
    pub fn credential_mode(&self) -> Result<CredentialMode> {
        CredentialMode::from_parameters(
            self.profile.as_deref(),
            self.iam_role_arn.as_deref(),
            self.external_id.as_deref(),
            self.access_key.as_deref(),
            self.secret_key.as_deref(),
        )
        .context("Invalid credential settings")
    }

    pub fn proxy(&self) -> Result<Option<ProxyConfig>> {
        ProxyConfig::from_parts(self.proxy_host.as_deref(), self.proxy_port)
            .context("Invalid proxy settings")
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            timeout_seconds: self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            polling_frequency_seconds: self
                .polling_frequency_seconds
                .unwrap_or(DEFAULT_POLLING_FREQUENCY_SECONDS),
            role_session_name: non_blank(&self.role_session_name)
                .unwrap_or(DEFAULT_ROLE_SESSION_NAME)
                .to_string(),
        }
    }

    /// Client factory for these settings
    pub fn factory(&self) -> Result<ClientFactory> {
        let region = non_blank(&self.region).context("No region configured")?;

        let mut factory = ClientFactory::new(region, self.proxy()?)
            .with_context(|| format!("Invalid client configuration for region {}", region))?
            .with_session_policy(self.session_policy());

        if let Some(endpoint_url) = non_blank(&self.endpoint_url) {
            factory = factory.with_endpoint_url(endpoint_url)?;
        }

        Ok(factory)
    }

    pub fn bucket(&self) -> Result<&str> {
        non_blank(&self.bucket).context("No probe bucket configured")
    }

    pub fn application(&self) -> Result<&str> {
        non_blank(&self.application).context("No CodeDeploy application configured")
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
