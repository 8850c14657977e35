//! AWS client configuration
//!
//! - [`client::ClientFactory`] - builds the S3 + CodeDeploy [`client::ClientBundle`]
//! - [`credentials::CredentialMode`] - profile, IAM role, static keys or default chain
//! - [`account::AccountResolver`] - account ID of the current identity
//! - [`proxy::ProxyConfig`] - outbound HTTP proxy shared by all clients

pub mod account;
pub mod client;
pub mod credentials;
pub mod error;
pub mod profiles;
pub mod proxy;
pub mod region;

// Re-export commonly used types
pub use account::{resolve_account_id, AccountResolver};
pub use client::{build_clients, ClientBundle, ClientFactory};
pub use credentials::{CredentialMode, ResolvedCredentials, SessionPolicy};
pub use error::{Error, Result};
pub use proxy::ProxyConfig;
pub use region::AwsRegion;
