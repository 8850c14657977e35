//! Credential modes and their resolution
//!
//! A [`CredentialMode`] is chosen once by the caller. Resolving it yields
//! [`ResolvedCredentials`], which the client factory feeds into the shared
//! SDK configuration:
//! - Profile: checked against the local profile files, then left to the SDK
//! - IAM role: exchanged for session credentials via STS AssumeRole
//! - Static keys: wrapped as-is
//! - Default chain: nothing explicit, the SDK searches env/profile/instance role

use crate::aws::error::CredentialError;
use crate::aws::profiles::ProfileCatalog;
use aws_sdk_sts::config::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Upper bound STS accepts for a role-chained session
pub const MAX_SESSION_SECONDS: u64 = 3600;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 900;
pub const DEFAULT_POLLING_FREQUENCY_SECONDS: u64 = 15;
pub const DEFAULT_ROLE_SESSION_NAME: &str = "jenkins-codedeploy-plugin";

const STATIC_PROVIDER_NAME: &str = "StaticKeys";
const ASSUME_ROLE_PROVIDER_NAME: &str = "AssumeRole";

/// How the clients authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialMode {
    /// Named profile from the local AWS config files
    Profile(String),
    /// Assume this role via STS
    IamRole {
        role_arn: String,
        external_id: Option<String>,
    },
    /// Explicit access key / secret key
    StaticKeys {
        access_key: String,
        secret_key: String,
    },
    /// SDK default provider chain
    DefaultChain,
}

impl CredentialMode {
    /// Pick a mode from raw job parameters, where blank means absent.
    ///
    /// Precedence is profile, role, key pair, then the default chain.
    pub fn from_parameters(
        profile: Option<&str>,
        role_arn: Option<&str>,
        external_id: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Result<Self, CredentialError> {
        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(profile) = present(profile) {
            return Ok(CredentialMode::Profile(profile));
        }
        if let Some(role_arn) = present(role_arn) {
            return Ok(CredentialMode::IamRole {
                role_arn,
                external_id: present(external_id),
            });
        }
        match (present(access_key), present(secret_key)) {
            (Some(access_key), Some(secret_key)) => Ok(CredentialMode::StaticKeys {
                access_key,
                secret_key,
            }),
            (None, None) => Ok(CredentialMode::DefaultChain),
            _ => Err(CredentialError::MalformedKeyPair(
                "access key and secret key must both be provided, or neither",
            )),
        }
    }

    /// Short label for logs; never includes secrets
    pub fn describe(&self) -> String {
        match self {
            CredentialMode::Profile(name) => format!("profile '{}'", name),
            CredentialMode::IamRole { role_arn, .. } => format!("IAM role {}", role_arn),
            CredentialMode::StaticKeys { access_key, .. } => format!("access key {}", access_key),
            CredentialMode::DefaultChain => "default credential chain".to_string(),
        }
    }
}

/// Role session parameters owned by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    pub timeout_seconds: u64,
    pub polling_frequency_seconds: u64,
    pub role_session_name: String,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            polling_frequency_seconds: DEFAULT_POLLING_FREQUENCY_SECONDS,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
        }
    }
}

impl SessionPolicy {
    /// Requested AssumeRole duration: `min(3600, timeout × polling frequency)`
    pub fn duration_seconds(&self) -> u64 {
        self.timeout_seconds
            .saturating_mul(self.polling_frequency_seconds)
            .min(MAX_SESSION_SECONDS)
    }
}

/// Outcome of resolving a [`CredentialMode`]
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    /// Let the SDK load this profile
    Profile(String),
    Static(Credentials),
    Session {
        credentials: Credentials,
        expires_at: Option<DateTime<Utc>>,
    },
    DefaultChain,
}

impl ResolvedCredentials {
    /// Explicit credentials to install on the SDK config, if any
    pub fn provider(&self) -> Option<&Credentials> {
        match self {
            ResolvedCredentials::Static(c) => Some(c),
            ResolvedCredentials::Session { credentials, .. } => Some(credentials),
            ResolvedCredentials::Profile(_) | ResolvedCredentials::DefaultChain => None,
        }
    }

    pub fn profile_name(&self) -> Option<&str> {
        match self {
            ResolvedCredentials::Profile(name) => Some(name),
            _ => None,
        }
    }
}

/// Wrap a key pair as static credentials
pub fn static_credentials(access_key: &str, secret_key: &str) -> Result<Credentials, CredentialError> {
    if access_key.trim().is_empty() {
        return Err(CredentialError::MalformedKeyPair("access key is empty"));
    }
    if secret_key.trim().is_empty() {
        return Err(CredentialError::MalformedKeyPair("secret key is empty"));
    }
    Ok(Credentials::new(
        access_key.trim(),
        secret_key.trim(),
        None,
        None,
        STATIC_PROVIDER_NAME,
    ))
}

/// Check a profile exists and is usable in the local profile files
pub fn check_profile(name: &str) -> Result<(), CredentialError> {
    let catalog = ProfileCatalog::load()?;
    let profile = catalog.require_usable(name)?;
    tracing::debug!("Using AWS profile '{}' ({:?})", profile.name, profile.kind);
    Ok(())
}

/// Exchange a role ARN for session credentials.
pub async fn assume_role(
    sts: &aws_sdk_sts::Client,
    role_arn: &str,
    external_id: Option<&str>,
    policy: &SessionPolicy,
) -> Result<ResolvedCredentials, CredentialError> {
    let duration = policy.duration_seconds();
    tracing::info!(
        "Assuming role {} (session '{}', {}s)",
        role_arn,
        policy.role_session_name,
        duration
    );

    let response = sts
        .assume_role()
        .role_arn(role_arn)
        .set_external_id(external_id.map(str::to_string))
        .role_session_name(&policy.role_session_name)
        // duration_seconds() is capped at 3600
        .duration_seconds(duration as i32)
        .send()
        .await
        .map_err(|source| CredentialError::AssumeRole {
            role_arn: role_arn.to_string(),
            source,
        })?;

    let sts_credentials = response
        .credentials()
        .ok_or_else(|| CredentialError::MissingSessionCredentials(role_arn.to_string()))?;

    let expiration = sts_credentials.expiration();
    let expires_at = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos());
    if let Some(at) = expires_at {
        tracing::debug!("Session credentials for {} expire at {}", role_arn, at);
    }

    let credentials = Credentials::new(
        sts_credentials.access_key_id(),
        sts_credentials.secret_access_key(),
        Some(sts_credentials.session_token().to_string()),
        expires_at.map(SystemTime::from),
        ASSUME_ROLE_PROVIDER_NAME,
    );

    Ok(ResolvedCredentials::Session {
        credentials,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_capped_at_one_hour() {
        let policy = SessionPolicy {
            timeout_seconds: 1200,
            polling_frequency_seconds: 5,
            ..Default::default()
        };
        assert_eq!(policy.duration_seconds(), 3600);
    }

    #[test]
    fn test_duration_below_cap() {
        let policy = SessionPolicy {
            timeout_seconds: 10,
            polling_frequency_seconds: 2,
            ..Default::default()
        };
        assert_eq!(policy.duration_seconds(), 20);
    }

    #[test]
    fn test_duration_does_not_overflow() {
        let policy = SessionPolicy {
            timeout_seconds: u64::MAX,
            polling_frequency_seconds: u64::MAX,
            ..Default::default()
        };
        assert_eq!(policy.duration_seconds(), MAX_SESSION_SECONDS);
    }

    #[test]
    fn test_default_policy() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.role_session_name, "jenkins-codedeploy-plugin");
        assert_eq!(policy.duration_seconds(), 3600);
    }

    #[test]
    fn test_mode_from_profile() {
        let mode = CredentialMode::from_parameters(Some("ci"), Some("arn:aws:iam::1:role/R"), None, Some("A"), Some("S"))
            .unwrap();
        assert_eq!(mode, CredentialMode::Profile("ci".to_string()));
    }

    #[test]
    fn test_mode_from_role() {
        let mode = CredentialMode::from_parameters(
            Some(""),
            Some("arn:aws:iam::123456789012:role/Deployer"),
            Some("ext-1"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            mode,
            CredentialMode::IamRole {
                role_arn: "arn:aws:iam::123456789012:role/Deployer".to_string(),
                external_id: Some("ext-1".to_string()),
            }
        );
    }

    #[test]
    fn test_mode_from_role_blank_external_id() {
        let mode = CredentialMode::from_parameters(None, Some("arn:aws:iam::1:role/R"), Some("  "), None, None)
            .unwrap();
        assert!(matches!(mode, CredentialMode::IamRole { external_id: None, .. }));
    }

    #[test]
    fn test_mode_from_keys() {
        let mode = CredentialMode::from_parameters(None, None, None, Some("AKIA"), Some("secret")).unwrap();
        assert_eq!(
            mode,
            CredentialMode::StaticKeys {
                access_key: "AKIA".to_string(),
                secret_key: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_mode_default_chain() {
        let mode = CredentialMode::from_parameters(None, Some(""), None, Some(""), None).unwrap();
        assert_eq!(mode, CredentialMode::DefaultChain);
    }

    #[test]
    fn test_mode_half_key_pair() {
        let err = CredentialMode::from_parameters(None, None, None, Some("AKIA"), None).unwrap_err();
        assert!(matches!(err, CredentialError::MalformedKeyPair(_)));
    }

    #[test]
    fn test_describe_hides_secret() {
        let mode = CredentialMode::StaticKeys {
            access_key: "AKIA".to_string(),
            secret_key: "top-secret".to_string(),
        };
        assert!(!mode.describe().contains("top-secret"));
    }

    #[test]
    fn test_static_credentials() {
        let creds = static_credentials("AKIA", "secret").unwrap();
        assert_eq!(creds.access_key_id(), "AKIA");
        assert_eq!(creds.secret_access_key(), "secret");
        assert!(creds.session_token().is_none());
    }

    #[test]
    fn test_static_credentials_empty() {
        assert!(matches!(
            static_credentials("", "secret"),
            Err(CredentialError::MalformedKeyPair(_))
        ));
        assert!(matches!(
            static_credentials("AKIA", " "),
            Err(CredentialError::MalformedKeyPair(_))
        ));
    }

    #[test]
    fn test_resolved_provider() {
        let creds = static_credentials("AKIA", "secret").unwrap();
        assert!(ResolvedCredentials::Static(creds).provider().is_some());
        assert!(ResolvedCredentials::DefaultChain.provider().is_none());

        let profile = ResolvedCredentials::Profile("ci".to_string());
        assert!(profile.provider().is_none());
        assert_eq!(profile.profile_name(), Some("ci"));
    }
}
