//! Local AWS profile catalog
//!
//! Reads `~/.aws/config` and `~/.aws/credentials` (or the files named by
//! `AWS_CONFIG_FILE` / `AWS_SHARED_CREDENTIALS_FILE`) so profile mode can
//! reject a missing or half-configured profile before any client is built.
//! Actual credential resolution is left to the SDK.

use crate::aws::error::CredentialError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How a profile obtains its credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// `aws_access_key_id` + `aws_secret_access_key` in the credentials file
    StaticKeys,
    /// `role_arn` with a `source_profile` or `credential_source`
    AssumeRole,
    /// IAM Identity Center
    Sso,
    /// `credential_source` only (instance or container role)
    CredentialSource,
    /// Section exists but names no credential source
    Unspecified,
}

/// One `[profile ...]` entry merged from both files
#[derive(Debug, Clone)]
pub struct LocalProfile {
    pub name: String,
    pub kind: ProfileKind,
    role_arn: Option<String>,
    source_profile: Option<String>,
    credential_source: Option<String>,
    sso_session: Option<String>,
    sso_start_url: Option<String>,
    sso_region: Option<String>,
    sso_account_id: Option<String>,
    sso_role_name: Option<String>,
    has_access_key: bool,
    has_secret_key: bool,
}

impl LocalProfile {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ProfileKind::Unspecified,
            role_arn: None,
            source_profile: None,
            credential_source: None,
            sso_session: None,
            sso_start_url: None,
            sso_region: None,
            sso_account_id: None,
            sso_role_name: None,
            has_access_key: false,
            has_secret_key: false,
        }
    }

    fn has_static_keys(&self) -> bool {
        self.has_access_key && self.has_secret_key
    }

    fn classify(&self) -> ProfileKind {
        if self.sso_session.is_some()
            || self.sso_start_url.is_some()
            || (self.sso_account_id.is_some() && self.sso_role_name.is_some())
        {
            ProfileKind::Sso
        } else if self.role_arn.is_some() {
            ProfileKind::AssumeRole
        } else if self.has_static_keys() {
            ProfileKind::StaticKeys
        } else if self.credential_source.is_some() {
            ProfileKind::CredentialSource
        } else {
            ProfileKind::Unspecified
        }
    }
}

/// Profiles found in the local AWS configuration files
#[derive(Debug, Default)]
pub struct ProfileCatalog {
    profiles: HashMap<String, LocalProfile>,
}

impl ProfileCatalog {
    /// Load from the standard locations. Missing files are not an error.
    pub fn load() -> Result<Self, CredentialError> {
        let aws_dir = dirs::home_dir()
            .map(|h| h.join(".aws"))
            .unwrap_or_else(|| PathBuf::from(".aws"));

        let config = std::env::var_os("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("config"));
        let credentials = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("credentials"));

        Self::load_from(&config, &credentials)
    }

    /// Load from explicit file paths
    pub fn load_from(config: &Path, credentials: &Path) -> Result<Self, CredentialError> {
        let read = |path: &Path| -> Result<Option<String>, CredentialError> {
            if !path.exists() {
                return Ok(None);
            }
            std::fs::read_to_string(path)
                .map(Some)
                .map_err(CredentialError::ProfileFiles)
        };

        let config = read(config)?;
        let credentials = read(credentials)?;

        Ok(Self::parse(config.as_deref(), credentials.as_deref()))
    }

    /// Build a catalog from file contents
    pub fn parse(config: Option<&str>, credentials: Option<&str>) -> Self {
        let mut catalog = Self::default();

        if let Some(content) = credentials {
            catalog.merge(content, |section| Some(section.to_string()));
        }
        if let Some(content) = config {
            // Config file sections are `[default]` or `[profile name]`
            catalog.merge(content, |section| {
                if section == "default" {
                    Some("default".to_string())
                } else {
                    section.strip_prefix("profile ").map(|n| n.trim().to_string())
                }
            });
        }

        for profile in catalog.profiles.values_mut() {
            profile.kind = profile.classify();
        }

        catalog
    }

    fn merge(&mut self, content: &str, section_name: impl Fn(&str) -> Option<String>) {
        let mut current: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current = section_name(line[1..line.len() - 1].trim());
                if let Some(name) = &current {
                    self.profiles
                        .entry(name.clone())
                        .or_insert_with(|| LocalProfile::named(name));
                }
                continue;
            }

            let (Some(name), Some((key, value))) = (&current, line.split_once('=')) else {
                continue;
            };
            let Some(profile) = self.profiles.get_mut(name) else {
                continue;
            };
            let value = Some(value.trim().to_string());

            match key.trim() {
                "aws_access_key_id" => profile.has_access_key = true,
                "aws_secret_access_key" => profile.has_secret_key = true,
                "role_arn" => profile.role_arn = value,
                "source_profile" => profile.source_profile = value,
                "credential_source" => profile.credential_source = value,
                "sso_session" => profile.sso_session = value,
                "sso_start_url" => profile.sso_start_url = value,
                "sso_region" => profile.sso_region = value,
                "sso_account_id" => profile.sso_account_id = value,
                "sso_role_name" => profile.sso_role_name = value,
                _ => {}
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&LocalProfile> {
        self.profiles.get(name)
    }

    /// Look up a profile and check it can produce credentials.
    pub fn require_usable(&self, name: &str) -> Result<&LocalProfile, CredentialError> {
        let profile = self
            .get(name)
            .ok_or_else(|| CredentialError::ProfileNotFound(name.to_string()))?;

        let problem = match profile.kind {
            ProfileKind::Sso => sso_problem(profile),
            ProfileKind::AssumeRole => self.assume_role_problem(profile),
            ProfileKind::StaticKeys | ProfileKind::CredentialSource => None,
            ProfileKind::Unspecified if profile.has_access_key != profile.has_secret_key => {
                Some("credentials file has only one of aws_access_key_id / aws_secret_access_key".to_string())
            }
            // May still resolve through environment variables
            ProfileKind::Unspecified => None,
        };

        match problem {
            Some(reason) => Err(CredentialError::InvalidProfile {
                name: name.to_string(),
                reason,
            }),
            None => Ok(profile),
        }
    }

    fn assume_role_problem(&self, profile: &LocalProfile) -> Option<String> {
        if profile.credential_source.is_some() {
            return None;
        }
        let Some(source) = &profile.source_profile else {
            return Some("role_arn requires source_profile or credential_source".to_string());
        };

        let mut chain = vec![profile.name.as_str()];
        let mut current = source.as_str();

        loop {
            if chain.contains(&current) {
                return Some(format!(
                    "circular source_profile chain: {} -> {}",
                    chain.join(" -> "),
                    current
                ));
            }

            let Some(next) = self.profiles.get(current) else {
                return Some(format!("source profile '{}' not found", current));
            };

            if next.role_arn.is_none() || next.has_static_keys() || next.credential_source.is_some() {
                return None;
            }

            match &next.source_profile {
                Some(source) => {
                    chain.push(current);
                    current = source.as_str();
                }
                None => return None,
            }
        }
    }
}

fn sso_problem(profile: &LocalProfile) -> Option<String> {
    let mut missing = Vec::new();

    if profile.sso_session.is_none() {
        if profile.sso_start_url.is_none() {
            missing.push("sso_start_url");
        }
        if profile.sso_region.is_none() {
            missing.push("sso_region");
        }
    }
    if profile.sso_account_id.is_none() {
        missing.push("sso_account_id");
    }
    if profile.sso_role_name.is_none() {
        missing.push("sso_role_name");
    }

    if missing.is_empty() {
        None
    } else {
        Some(format!("SSO profile missing: {}", missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[default]
region = us-east-1

[profile deploy]
role_arn = arn:aws:iam::123456789012:role/Deployer
source_profile = default
external_id = jenkins

[profile ci]
region = eu-west-1

; comment
[profile instance]
role_arn = arn:aws:iam::123456789012:role/Instance
credential_source = Ec2InstanceMetadata

[profile sso-dev]
sso_start_url = https://example.awsapps.com/start
sso_region = us-east-1
sso_account_id = 123456789012
sso_role_name = ReadOnly

[sso-session corp]
sso_start_url = https://example.awsapps.com/start
"#;

    const CREDENTIALS: &str = r#"
[default]
aws_access_key_id = AKIAEXAMPLE
aws_secret_access_key = secret

[ci]
aws_access_key_id = AKIAEXAMPLE2
aws_secret_access_key = secret2

[half]
aws_access_key_id = AKIAEXAMPLE3
"#;

    fn catalog() -> ProfileCatalog {
        ProfileCatalog::parse(Some(CONFIG), Some(CREDENTIALS))
    }

    #[test]
    fn test_profiles_merged_from_both_files() {
        let catalog = catalog();
        let ci = catalog.get("ci").unwrap();
        assert_eq!(ci.kind, ProfileKind::StaticKeys);
        assert!(ci.has_static_keys());
        assert!(catalog.get("corp").is_none());
    }

    #[test]
    fn test_profile_kinds() {
        let catalog = catalog();
        assert_eq!(catalog.get("default").unwrap().kind, ProfileKind::StaticKeys);
        assert_eq!(catalog.get("deploy").unwrap().kind, ProfileKind::AssumeRole);
        assert_eq!(catalog.get("instance").unwrap().kind, ProfileKind::AssumeRole);
        assert_eq!(catalog.get("sso-dev").unwrap().kind, ProfileKind::Sso);
        assert_eq!(catalog.get("half").unwrap().kind, ProfileKind::Unspecified);
    }

    #[test]
    fn test_require_usable() {
        let catalog = catalog();
        assert!(catalog.require_usable("default").is_ok());
        assert!(catalog.require_usable("deploy").is_ok());
        assert!(catalog.require_usable("instance").is_ok());
        assert!(catalog.require_usable("sso-dev").is_ok());
    }

    #[test]
    fn test_missing_profile() {
        let err = catalog().require_usable("nope").unwrap_err();
        assert!(matches!(err, CredentialError::ProfileNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_half_key_pair_rejected() {
        let err = catalog().require_usable("half").unwrap_err();
        assert!(matches!(err, CredentialError::InvalidProfile { .. }));
    }

    #[test]
    fn test_incomplete_sso_profile() {
        let catalog = ProfileCatalog::parse(
            Some("[profile sso]\nsso_start_url = https://example.awsapps.com/start\n"),
            None,
        );
        let err = catalog.require_usable("sso").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sso_region"));
        assert!(message.contains("sso_account_id"));
        assert!(message.contains("sso_role_name"));
    }

    #[test]
    fn test_sso_session_profile() {
        let catalog = ProfileCatalog::parse(
            Some("[profile sso]\nsso_session = corp\nsso_account_id = 1\nsso_role_name = R\n"),
            None,
        );
        assert!(catalog.require_usable("sso").is_ok());
    }

    #[test]
    fn test_role_without_source() {
        let catalog = ProfileCatalog::parse(
            Some("[profile r]\nrole_arn = arn:aws:iam::1:role/R\n"),
            None,
        );
        assert!(catalog.require_usable("r").is_err());
    }

    #[test]
    fn test_role_with_missing_source_profile() {
        let catalog = ProfileCatalog::parse(
            Some("[profile r]\nrole_arn = arn:aws:iam::1:role/R\nsource_profile = ghost\n"),
            None,
        );
        let err = catalog.require_usable("r").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_circular_role_chain() {
        let config = r#"
[profile a]
role_arn = arn:aws:iam::111:role/A
source_profile = b
[profile b]
role_arn = arn:aws:iam::222:role/B
source_profile = c
[profile c]
role_arn = arn:aws:iam::333:role/C
source_profile = a
"#;
        let catalog = ProfileCatalog::parse(Some(config), None);
        let err = catalog.require_usable("a").unwrap_err();
        assert!(err.to_string().contains("circular"), "got: {}", err);
    }

    #[test]
    fn test_multi_level_role_chain() {
        let config = r#"
[profile r1]
role_arn = arn:aws:iam::111:role/R1
source_profile = base
[profile r2]
role_arn = arn:aws:iam::222:role/R2
source_profile = r1
"#;
        let credentials = "[base]\naws_access_key_id = A\naws_secret_access_key = S\n";
        let catalog = ProfileCatalog::parse(Some(config), Some(credentials));
        assert!(catalog.require_usable("r2").is_ok());
    }

    #[test]
    fn test_load_from_files() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config");
        let credentials = dir.path().join("credentials");
        std::fs::write(&config, CONFIG).unwrap();
        std::fs::write(&credentials, CREDENTIALS).unwrap();

        let catalog = ProfileCatalog::load_from(&config, &credentials).unwrap();
        assert!(catalog.get("deploy").is_some());
    }

    #[test]
    fn test_load_from_missing_files() {
        let dir = TempDir::new().unwrap();
        let catalog =
            ProfileCatalog::load_from(&dir.path().join("config"), &dir.path().join("credentials"))
                .unwrap();
        assert!(catalog.get("default").is_none());
    }
}
