//! Account ID lookup
//!
//! The caller's ARN comes from IAM GetUser. When the caller lacks
//! `iam:GetUser`, IAM still names the caller in the AccessDenied message,
//! e.g. `User: arn:aws:iam::123456789012:user/bob is not authorized ...`,
//! so the ARN is recovered from there.

use crate::aws::error::AccountResolutionError;
use crate::aws::proxy::{self, ProxyConfig};
use crate::aws::region::GLOBAL_REGION;
use aws_config::BehaviorVersion;
use aws_sdk_iam::config::Credentials;
use aws_sdk_iam::error::ProvideErrorMetadata;
use aws_smithy_runtime_api::client::http::SharedHttpClient;

/// Colon-separated position of the account ID.
/// Sample ARN: `arn:aws:iam::123456789012:user/David`
const ARN_ACCOUNT_ID_INDEX: usize = 4;

const ACCESS_DENIED_CODE: &str = "AccessDenied";
const ARN_MARKER: &str = "arn:aws";

/// Extract the 12-digit account ID from an ARN
pub fn account_id_from_arn(arn: &str) -> Result<String, AccountResolutionError> {
    if arn.is_empty() {
        return Err(AccountResolutionError::ArnNotFound);
    }

    let account = arn
        .split(':')
        .nth(ARN_ACCOUNT_ID_INDEX)
        .ok_or_else(|| AccountResolutionError::MalformedArn(arn.to_string()))?;

    if account.len() != 12 || !account.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AccountResolutionError::MalformedArn(arn.to_string()));
    }

    Ok(account.to_string())
}

/// Find the caller's ARN inside an AccessDenied message.
///
/// The ARN runs from `arn:aws` to the next space, or to the end of the message.
pub fn arn_from_error_message(message: &str) -> Option<&str> {
    let start = message.find(ARN_MARKER)?;
    let rest = &message[start..];
    let end = rest.find(' ').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Resolves the account of the identity found by the default credential chain
pub struct AccountResolver {
    proxy: Option<ProxyConfig>,
    credentials: Option<Credentials>,
    http_client: Option<SharedHttpClient>,
}

impl AccountResolver {
    pub fn new(proxy: Option<ProxyConfig>) -> Self {
        Self {
            proxy,
            credentials: None,
            http_client: None,
        }
    }

    /// Look up this identity instead of the default chain's
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Send IAM traffic through this HTTP client instead of the proxy-derived one
    pub fn with_http_client(mut self, http_client: SharedHttpClient) -> Self {
        self.http_client = Some(http_client);
        self
    }

    async fn iam_client(&self) -> crate::aws::error::Result<aws_sdk_iam::Client> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::from_static(GLOBAL_REGION));

        let http_client = match &self.http_client {
            Some(client) => Some(client.clone()),
            None => proxy::http_client(self.proxy.as_ref())?,
        };
        if let Some(http_client) = http_client {
            loader = loader.http_client(http_client);
        }
        if let Some(credentials) = &self.credentials {
            loader = loader.credentials_provider(credentials.clone());
        }

        Ok(aws_sdk_iam::Client::new(&loader.load().await))
    }

    /// Return the 12-digit account ID of the current identity
    pub async fn resolve_account_id(&self) -> crate::aws::error::Result<String> {
        let iam = self.iam_client().await?;
        let arn = current_user_arn(&iam).await?;
        Ok(account_id_from_arn(&arn)?)
    }
}

/// ARN of the current IAM user, falling back to the AccessDenied message
async fn current_user_arn(iam: &aws_sdk_iam::Client) -> Result<String, AccountResolutionError> {
    match iam.get_user().send().await {
        Ok(output) => output
            .user()
            .map(|user| user.arn().to_string())
            .ok_or(AccountResolutionError::ArnNotFound),
        Err(err) => {
            let denied_arn = err.as_service_error().and_then(|service_err| {
                if service_err.code() != Some(ACCESS_DENIED_CODE) {
                    return None;
                }
                tracing::warn!("iam:GetUser denied, reading ARN from the error message");
                service_err
                    .message()
                    .and_then(arn_from_error_message)
                    .map(str::to_string)
            });

            match denied_arn {
                Some(arn) => Ok(arn),
                None if is_access_denied(&err) => Err(AccountResolutionError::ArnNotFound),
                None => Err(AccountResolutionError::IdentityLookup(err)),
            }
        }
    }
}

fn is_access_denied<E: ProvideErrorMetadata, R>(err: &aws_sdk_iam::error::SdkError<E, R>) -> bool {
    err.as_service_error()
        .map(|e| e.code() == Some(ACCESS_DENIED_CODE))
        .unwrap_or(false)
}

/// Resolve the account ID through the default chain, honouring the proxy
pub async fn resolve_account_id(proxy: Option<ProxyConfig>) -> crate::aws::error::Result<String> {
    AccountResolver::new(proxy).resolve_account_id().await
}
