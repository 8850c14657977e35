//! Client factory for S3 and CodeDeploy
//!
//! Both clients are built from one [`SdkConfig`], so they always agree on
//! region, proxy and credentials.

use crate::aws::credentials::{self, CredentialMode, ResolvedCredentials, SessionPolicy};
use crate::aws::error::{ConfigurationError, ProbeError, Result};
use crate::aws::proxy::{self, ProxyConfig};
use crate::aws::region::AwsRegion;
use aws_config::{BehaviorVersion, ConfigLoader, SdkConfig};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sts::config::Credentials;
use aws_smithy_runtime_api::client::http::SharedHttpClient;

/// Builds [`ClientBundle`]s for one region and proxy
#[derive(Debug, Clone)]
pub struct ClientFactory {
    region: AwsRegion,
    proxy: Option<ProxyConfig>,
    session: SessionPolicy,
    endpoint_url: Option<String>,
    source_credentials: Option<Credentials>,
    http_client: Option<SharedHttpClient>,
}

impl ClientFactory {
    /// Validate the region and prepare a factory
    pub fn new(region: &str, proxy: Option<ProxyConfig>) -> Result<Self> {
        let region = AwsRegion::parse(region)?;
        let http_client = proxy::http_client(proxy.as_ref())?;

        Ok(Self {
            region,
            proxy,
            session: SessionPolicy::default(),
            endpoint_url: None,
            source_credentials: None,
            http_client,
        })
    }

    /// Session duration and name used for role assumption
    pub fn with_session_policy(mut self, session: SessionPolicy) -> Self {
        self.session = session;
        self
    }

    /// Send every request to this endpoint (S3-compatible stores, local emulators)
    pub fn with_endpoint_url(mut self, endpoint_url: &str) -> Result<Self> {
        url::Url::parse(endpoint_url).map_err(|source| ConfigurationError::InvalidEndpoint {
            url: endpoint_url.to_string(),
            source,
        })?;
        self.endpoint_url = Some(endpoint_url.to_string());
        Ok(self)
    }

    /// Identity used to call STS in IAM-role mode instead of the default chain
    pub fn with_source_credentials(mut self, credentials: Credentials) -> Self {
        self.source_credentials = Some(credentials);
        self
    }

    /// Replace the proxy-derived HTTP client.
    ///
    /// The configured proxy no longer applies, so it is dropped as well.
    pub fn with_http_client(mut self, http_client: SharedHttpClient) -> Self {
        self.http_client = Some(http_client);
        self.proxy = None;
        self
    }

    pub fn region(&self) -> &AwsRegion {
        &self.region
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    pub fn session_policy(&self) -> &SessionPolicy {
        &self.session
    }

    fn loader(&self) -> ConfigLoader {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(self.region.to_sdk());
        if let Some(http_client) = &self.http_client {
            loader = loader.http_client(http_client.clone());
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        loader
    }

    /// Turn a credential mode into something the SDK config can use.
    ///
    /// Only IAM-role mode makes a network call.
    pub async fn resolve_credentials(&self, mode: &CredentialMode) -> Result<ResolvedCredentials> {
        tracing::debug!("Resolving credentials from {}", mode.describe());

        let resolved = match mode {
            CredentialMode::Profile(name) => {
                credentials::check_profile(name)?;
                ResolvedCredentials::Profile(name.clone())
            }
            CredentialMode::IamRole {
                role_arn,
                external_id,
            } => {
                let mut loader = self.loader();
                if let Some(source) = &self.source_credentials {
                    loader = loader.credentials_provider(source.clone());
                }
                let sts = aws_sdk_sts::Client::new(&loader.load().await);
                credentials::assume_role(&sts, role_arn, external_id.as_deref(), &self.session).await?
            }
            CredentialMode::StaticKeys {
                access_key,
                secret_key,
            } => ResolvedCredentials::Static(credentials::static_credentials(access_key, secret_key)?),
            CredentialMode::DefaultChain => ResolvedCredentials::DefaultChain,
        };

        Ok(resolved)
    }

    /// Build the shared SDK configuration for resolved credentials
    pub async fn sdk_config(&self, credentials: &ResolvedCredentials) -> SdkConfig {
        let mut loader = self.loader();
        if let Some(name) = credentials.profile_name() {
            loader = loader.profile_name(name);
        }
        if let Some(provider) = credentials.provider() {
            loader = loader.credentials_provider(provider.clone());
        }
        loader.load().await
    }

    /// Resolve credentials and build both clients
    pub async fn build(&self, mode: &CredentialMode) -> Result<ClientBundle> {
        let credentials = self.resolve_credentials(mode).await?;
        let config = self.sdk_config(&credentials).await;

        let mut storage_config = aws_sdk_s3::config::Builder::from(&config);
        if self.endpoint_url.is_some() {
            storage_config = storage_config.force_path_style(true);
        }

        tracing::info!(
            "Created S3 and CodeDeploy clients in {} using {}{}",
            self.region,
            mode.describe(),
            self.proxy
                .as_ref()
                .map(|p| format!(" via proxy {}", p))
                .unwrap_or_default()
        );

        Ok(ClientBundle {
            storage: aws_sdk_s3::Client::from_conf(storage_config.build()),
            deployment: aws_sdk_codedeploy::Client::new(&config),
            region: self.region.clone(),
            proxy: self.proxy.clone(),
        })
    }
}

/// Build a client bundle in one call
pub async fn build_clients(
    region: &str,
    mode: &CredentialMode,
    proxy: Option<ProxyConfig>,
    session: SessionPolicy,
) -> Result<ClientBundle> {
    ClientFactory::new(region, proxy)?
        .with_session_policy(session)
        .build(mode)
        .await
}

/// S3 and CodeDeploy clients sharing one region and proxy
#[derive(Debug, Clone)]
pub struct ClientBundle {
    storage: aws_sdk_s3::Client,
    deployment: aws_sdk_codedeploy::Client,
    region: AwsRegion,
    proxy: Option<ProxyConfig>,
}

impl ClientBundle {
    pub fn storage(&self) -> &aws_sdk_s3::Client {
        &self.storage
    }

    pub fn deployment(&self) -> &aws_sdk_codedeploy::Client {
        &self.deployment
    }

    pub fn region(&self) -> &AwsRegion {
        &self.region
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Upload an empty object under a fresh `tmp-<uuid>.txt` key.
    ///
    /// Returns the key. The object is left in the bucket.
    pub async fn write_probe_object(&self, bucket: &str) -> Result<String, ProbeError> {
        let key = format!("tmp-{}.txt", uuid::Uuid::new_v4());

        // Removed from disk when dropped, whatever happens below
        let file = tempfile::Builder::new()
            .prefix("codedeploy-probe")
            .suffix(".txt")
            .tempfile()
            .map_err(ProbeError::TempFile)?;

        let body = ByteStream::from_path(file.path())
            .await
            .map_err(ProbeError::Body)?;

        tracing::debug!("Uploading probe object s3://{}/{}", bucket, key);
        self.storage
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|source| ProbeError::Upload {
                bucket: bucket.to_string(),
                key: key.clone(),
                source,
            })?;

        Ok(key)
    }

    /// Fetch the CodeDeploy application descriptor
    pub async fn lookup_application(&self, application: &str) -> Result<(), ProbeError> {
        tracing::debug!("Looking up CodeDeploy application '{}'", application);
        self.deployment
            .get_application()
            .application_name(application)
            .send()
            .await
            .map_err(|source| ProbeError::ApplicationLookup {
                application: application.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Check both clients work: write to the bucket, then read the application.
    pub async fn probe(&self, bucket: &str, application: &str) -> Result<(), ProbeError> {
        let key = self.write_probe_object(bucket).await?;
        self.lookup_application(application).await?;
        tracing::info!(
            "Connectivity check passed (s3://{}/{}, application '{}')",
            bucket,
            key,
            application
        );
        Ok(())
    }
}
